use std::time::Duration;

use shema_core::{AnalysisResult, AssessmentId};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::WatchError;

/// The single outcome of a watch.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Found(AnalysisResult),
    TimedOut { after: Duration },
}

/// Handle to one running watch, owned by whoever started it.
///
/// Dropping the session cancels the watch.
#[derive(Debug)]
pub struct WatchSession {
    assessment_id: AssessmentId,
    token: CancellationToken,
    outcome: Option<oneshot::Receiver<WatchEvent>>,
}

impl WatchSession {
    pub(crate) fn new(
        assessment_id: AssessmentId,
        token: CancellationToken,
        outcome: oneshot::Receiver<WatchEvent>,
    ) -> Self {
        Self { assessment_id, token, outcome: Some(outcome) }
    }

    #[must_use]
    pub fn assessment_id(&self) -> &AssessmentId {
        &self.assessment_id
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stops the watch. No event is delivered afterwards, even one already
    /// in flight. Calling it again does nothing.
    pub fn cancel(&mut self) {
        self.token.cancel();
        self.outcome = None;
    }

    /// Waits for the outcome. Yields it once, then `None`; also `None` after
    /// [`Self::cancel`] or when the watch was superseded.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        let receiver = self.outcome.as_mut()?;
        let event = receiver.await.ok();
        self.outcome = None;
        event
    }

    /// # Errors
    /// [`WatchError::Timeout`] when the deadline passed first,
    /// [`WatchError::Cancelled`] when the watch was cancelled or superseded.
    pub async fn wait(mut self) -> Result<AnalysisResult, WatchError> {
        match self.next_event().await {
            Some(WatchEvent::Found(result)) => Ok(result),
            Some(WatchEvent::TimedOut { after }) => Err(WatchError::Timeout { after }),
            None => Err(WatchError::Cancelled),
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
