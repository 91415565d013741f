//! In-process change feed backed by a tokio broadcast channel.

use async_trait::async_trait;
use shema_core::AssessmentId;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::FeedError;
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, ChannelStatus, FeedMessage, Subscription};

const DEFAULT_CAPACITY: usize = 100;

/// Fan-out of [`ChangeEvent`]s to per-assessment subscriptions.
///
/// Useful when the process that learns about result changes (a webhook
/// receiver, a database listener) also runs the watchers.
#[derive(Debug, Clone)]
pub struct BroadcastFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for BroadcastFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastFeed {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        // Initial receiver dropped - subscriptions use tx.subscribe()
        let (tx, _initial_rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes a change. Returns how many subscriptions received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Number of live subscriptions across all assessments.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl ChangeFeed for BroadcastFeed {
    async fn subscribe(&self, id: &AssessmentId) -> Result<Subscription, FeedError> {
        let mut rx = self.tx.subscribe();
        let wanted = id.clone();
        let stream = async_stream::stream! {
            yield FeedMessage::Status(ChannelStatus::Subscribed);
            loop {
                match rx.recv().await {
                    Ok(event) if event.assessment_id == wanted => {
                        yield FeedMessage::Change(event.kind);
                    },
                    Ok(_) => {},
                    Err(RecvError::Lagged(n)) => {
                        // A skipped event may have been ours.
                        tracing::warn!(assessment_id = %wanted, skipped = n, "change feed lagged");
                        yield FeedMessage::Change(ChangeKind::Update);
                    },
                    Err(RecvError::Closed) => {
                        yield FeedMessage::Status(ChannelStatus::Closed);
                        break;
                    },
                }
            }
        };
        Ok(Subscription::new(id.clone(), Box::pin(stream)))
    }
}
