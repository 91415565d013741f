//! Typed error enum for the service layer.
//!
//! Unifies domain validation, API and watch failures so the CLI can match on
//! specific failure modes instead of downcasting.

use shema_api::ApiError;
use shema_core::CoreError;
use shema_realtime::FeedError;
use shema_watcher::WatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Local validation of answers, form or schedule failed.
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("api: {0}")]
    Api(#[from] ApiError),

    /// Waiting for the analysis ended without a result.
    #[error("{0}")]
    Watch(#[from] WatchError),

    #[error("change feed: {0}")]
    Feed(#[from] FeedError),

    /// Caller provided invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Whether retrying the same call might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(e) => e.is_transient(),
            Self::Watch(WatchError::Timeout { .. }) => true,
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Watch(WatchError::Timeout { .. }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_classifiers() {
        let timeout = ServiceError::from(WatchError::Timeout { after: Duration::from_secs(60) });
        assert!(timeout.is_timeout());
        assert!(timeout.is_transient());

        let status = ServiceError::from(ApiError::HttpStatus { code: 503, body: String::new() });
        assert!(status.is_transient());
        assert!(!status.is_timeout());

        let rejected = ServiceError::from(ApiError::Rejected("kuota penuh".into()));
        assert!(!rejected.is_transient());
        assert!(!ServiceError::InvalidInput("x".into()).is_transient());
    }
}
