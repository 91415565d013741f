//! Change feed over server-sent events.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use shema_core::constants::FEED_CONNECT_TIMEOUT_SECS;
use shema_core::{AssessmentId, env_string};

use crate::error::FeedError;
use crate::feed::{ChangeFeed, ChangeKind, ChannelStatus, FeedMessage, Subscription};

/// Event name used by servers that do not set `event:`.
const DEFAULT_EVENT: &str = "message";

/// Subscribes to `GET <url>?assessment_id=<id>` as a `text/event-stream`.
///
/// The HTTP client has no overall timeout since the response body stays
/// open for the lifetime of the subscription. Only the wait for response
/// headers is bounded.
#[derive(Debug, Clone)]
pub struct SseFeed {
    client: reqwest::Client,
    url: reqwest::Url,
    connect_timeout: Duration,
}

impl SseFeed {
    /// # Errors
    /// Returns [`FeedError::Config`] for a malformed URL or if the HTTP
    /// client cannot be built.
    pub fn new(url: &str) -> Result<Self, FeedError> {
        let url = reqwest::Url::parse(url.trim())
            .map_err(|e| FeedError::Config(format!("realtime URL {url:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FeedError::Config(format!("unsupported scheme {:?}", url.scheme())));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FeedError::Config(e.to_string()))?;
        Ok(Self {
            client,
            url,
            connect_timeout: Duration::from_secs(FEED_CONNECT_TIMEOUT_SECS),
        })
    }

    /// Reads `SHEMA_REALTIME_URL`. `Ok(None)` when the variable is unset.
    ///
    /// # Errors
    /// Same as [`Self::new`].
    pub fn from_env() -> Result<Option<Self>, FeedError> {
        env_string("SHEMA_REALTIME_URL").map(|url| Self::new(&url)).transpose()
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl ChangeFeed for SseFeed {
    async fn subscribe(&self, id: &AssessmentId) -> Result<Subscription, FeedError> {
        let request = self
            .client
            .get(self.url.clone())
            .query(&[("assessment_id", id.as_str())])
            .header(ACCEPT, "text/event-stream");
        let connect_timeout = self.connect_timeout;
        let wanted = id.clone();

        let stream = async_stream::stream! {
            let response = match tokio::time::timeout(connect_timeout, request.send()).await {
                Err(_) => {
                    tracing::warn!(assessment_id = %wanted, ?connect_timeout, "change feed connect timed out");
                    yield FeedMessage::Status(ChannelStatus::TimedOut);
                    return;
                },
                Ok(Err(e)) => {
                    tracing::warn!(assessment_id = %wanted, error = %e, "change feed connect failed");
                    yield FeedMessage::Status(ChannelStatus::ChannelError);
                    return;
                },
                Ok(Ok(response)) if !response.status().is_success() => {
                    tracing::warn!(
                        assessment_id = %wanted,
                        status = response.status().as_u16(),
                        "change feed refused subscription"
                    );
                    yield FeedMessage::Status(ChannelStatus::ChannelError);
                    return;
                },
                Ok(Ok(response)) => response,
            };

            yield FeedMessage::Status(ChannelStatus::Subscribed);

            let mut body = response.bytes_stream();
            let mut parser = SseParser::default();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        for event in parser.push(&bytes) {
                            if let Some(kind) = event.change_for(&wanted) {
                                yield FeedMessage::Change(kind);
                            }
                        }
                    },
                    Err(e) => {
                        tracing::warn!(assessment_id = %wanted, error = %e, "change feed stream broken");
                        yield FeedMessage::Status(ChannelStatus::ChannelError);
                        return;
                    },
                }
            }
            yield FeedMessage::Status(ChannelStatus::Closed);
        };

        Ok(Subscription::new(id.clone(), Box::pin(stream)))
    }
}

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

impl SseEvent {
    /// Change announced by this event for `wanted`, if any.
    ///
    /// Events whose JSON data names a different assessment are skipped.
    /// Unnamed events count as updates unless the data carries an
    /// `eventType`/`type` field.
    #[must_use]
    pub fn change_for(&self, wanted: &AssessmentId) -> Option<ChangeKind> {
        let data: Option<serde_json::Value> = serde_json::from_str(&self.data).ok();

        if let Some(other) = data
            .as_ref()
            .and_then(|d| d.get("assessment_id"))
            .and_then(serde_json::Value::as_str)
            && other != wanted.as_str()
        {
            return None;
        }

        if let Some(kind) = ChangeKind::parse(&self.event) {
            return Some(kind);
        }
        if !self.event.eq_ignore_ascii_case(DEFAULT_EVENT) {
            return None;
        }
        let named = data.as_ref().and_then(|d| {
            d.get("eventType").or_else(|| d.get("type")).and_then(serde_json::Value::as_str)
        });
        Some(named.and_then(ChangeKind::parse).unwrap_or(ChangeKind::Update))
    }
}

/// Incremental `text/event-stream` parser.
///
/// Bytes may be split anywhere, including inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    /// Feeds a chunk and returns every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.line(line) {
                events.push(event);
            }
        }
        events
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => {},
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() && event.is_none() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.filter(|e| !e.is_empty()).unwrap_or_else(|| DEFAULT_EVENT.to_owned()),
            data,
        })
    }
}
