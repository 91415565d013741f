//! Change feed abstraction shared by all push channels.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use shema_core::AssessmentId;

use crate::error::FeedError;

/// Connection state reported by a push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    /// Listening has begun. Carries no information about the result itself.
    Subscribed,
    ChannelError,
    TimedOut,
    /// The server ended the stream.
    Closed,
}

impl ChannelStatus {
    /// Whether the channel can no longer be relied on to announce changes.
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        !matches!(self, Self::Subscribed)
    }
}

impl Display for ChannelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match *self {
            Self::Subscribed => write!(f, "SUBSCRIBED"),
            Self::ChannelError => write!(f, "CHANNEL_ERROR"),
            Self::TimedOut => write!(f, "TIMED_OUT"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Row change on the assessment result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A change published for one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub assessment_id: AssessmentId,
    pub kind: ChangeKind,
}

/// Item delivered by a [`Subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMessage {
    Status(ChannelStatus),
    Change(ChangeKind),
}

pub type FeedStream = Pin<Box<dyn Stream<Item = FeedMessage> + Send>>;

/// A live subscription filtered to one assessment.
///
/// Dropping it unsubscribes.
pub struct Subscription {
    assessment_id: AssessmentId,
    stream: FeedStream,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Subscription").field("assessment_id", &self.assessment_id).finish()
    }
}

impl Subscription {
    #[must_use]
    pub fn new(assessment_id: AssessmentId, stream: FeedStream) -> Self {
        Self { assessment_id, stream }
    }

    #[must_use]
    pub fn assessment_id(&self) -> &AssessmentId {
        &self.assessment_id
    }

    /// Next message; `None` once the channel has ended.
    pub async fn next(&mut self) -> Option<FeedMessage> {
        self.stream.next().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::debug!(assessment_id = %self.assessment_id, "change feed unsubscribed");
    }
}

/// Push channel announcing changes to assessment results.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Opens a subscription filtered to `id`.
    ///
    /// Connection problems after this call are reported in-band as
    /// [`FeedMessage::Status`].
    async fn subscribe(&self, id: &AssessmentId) -> Result<Subscription, FeedError>;
}

/// Feed used when no push channel is configured: every subscription fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledFeed;

#[async_trait]
impl ChangeFeed for DisabledFeed {
    async fn subscribe(&self, _id: &AssessmentId) -> Result<Subscription, FeedError> {
        Err(FeedError::Unavailable("no realtime URL configured".to_owned()))
    }
}
