//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Update handler closed: {0}")]
    HandlerClosed(String),

    #[error("Update handler backlog full: {0}")]
    Backlog(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
