use std::time::Duration;

use thiserror::Error;

/// Why a watch ended without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WatchError {
    #[error("no analysis result after {}s", after.as_secs())]
    Timeout { after: Duration },
    #[error("watch cancelled")]
    Cancelled,
}
