//! Push channels announcing changes to assessment results.

mod broadcast;
pub mod error;
mod feed;
mod sse;

pub use broadcast::BroadcastFeed;
pub use error::FeedError;
pub use feed::{
    ChangeEvent, ChangeFeed, ChangeKind, ChannelStatus, DisabledFeed, FeedMessage, FeedStream,
    Subscription,
};
pub use sse::{SseEvent, SseFeed, SseParser};
