//! Request signing.
//!
//! Signature version 2: the authentication parameters are merged with the
//! request parameters, sorted by key and URL-encoded into a query string.
//! The payload `METHOD\nhost\npath\nquery` is signed with HMAC-SHA256 and
//! the base64 digest is appended as `Signature`.

use crate::error::{RestError, RestResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_METHOD: &str = "HmacSHA256";
pub const SIGNATURE_VERSION: &str = "2";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Clone)]
pub struct RequestSigner {
    access_key: String,
    secret_key: String,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl RequestSigner {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Build the signed query string for one request.
    pub fn signed_query(
        &self,
        method: &str,
        host: &str,
        path: &str,
        params: &[(&str, String)],
        timestamp: DateTime<Utc>,
    ) -> RestResult<String> {
        let mut sorted: BTreeMap<&str, String> = params
            .iter()
            .map(|(key, value)| (*key, value.clone()))
            .collect();
        sorted.insert("AccessKeyId", self.access_key.clone());
        sorted.insert("SignatureMethod", SIGNATURE_METHOD.to_string());
        sorted.insert("SignatureVersion", SIGNATURE_VERSION.to_string());
        sorted.insert(
            "Timestamp",
            timestamp.format(TIMESTAMP_FORMAT).to_string(),
        );

        let query = sorted
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let payload = format!("{}\n{}\n{}\n{}", method.to_uppercase(), host, path, query);
        let signature = self.sign(&payload)?;

        Ok(format!("{query}&Signature={}", urlencoding::encode(&signature)))
    }

    fn sign(&self, payload: &str) -> RestResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| RestError::Signing(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}
