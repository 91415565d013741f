//! Typed error enum for change feeds.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// No push channel is configured; callers fall back to polling.
    #[error("change feed unavailable: {0}")]
    Unavailable(String),
    #[error("invalid change feed configuration: {0}")]
    Config(String),
}
