//! Inbound frame decoding.
//!
//! The venue gzip-compresses most frames. Anything starting with the gzip
//! magic bytes is inflated; everything else must already be UTF-8 text.

use crate::error::{WsError, WsResult};
use flate2::read::GzDecoder;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Decode one binary frame into text.
pub fn decode_frame(bytes: &[u8]) -> WsResult<String> {
    if is_gzip(bytes) {
        let mut text = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .map_err(|e| WsError::Decode(format!("gzip: {e}")))?;
        Ok(text)
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|e| WsError::Decode(format!("utf-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gzip_frame_is_inflated() {
        let bytes = gzip(r#"{"ping":1}"#);
        assert!(is_gzip(&bytes));
        assert_eq!(decode_frame(&bytes).unwrap(), r#"{"ping":1}"#);
    }

    #[test]
    fn test_plain_frame_passes_through() {
        let text = decode_frame(br#"{"pong":2}"#).unwrap();
        assert_eq!(text, r#"{"pong":2}"#);
    }

    #[test]
    fn test_truncated_gzip_is_error() {
        let mut bytes = gzip(r#"{"ch":"market.zrxbtc.depth.step0"}"#);
        bytes.truncate(6);
        assert!(matches!(decode_frame(&bytes), Err(WsError::Decode(_))));
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        assert!(matches!(
            decode_frame(&[0xff, 0xfe, 0xfd]),
            Err(WsError::Decode(_))
        ));
    }
}
