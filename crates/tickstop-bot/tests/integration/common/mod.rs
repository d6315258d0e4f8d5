//! Shared test fixtures.

pub mod mock_ws;

use std::future::Future;
use std::time::Duration;

/// Poll `check` every 20 ms until it returns true or `limit` elapses.
pub async fn wait_until<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(limit, async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}
