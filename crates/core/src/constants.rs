//! Shared constants for the Shema Music client.
//!
//! Timing defaults for the result watcher and limits of the registration flow.

/// Overall deadline for an assessment result to appear (seconds).
pub const WATCH_DEADLINE_SECS: u64 = 60;

/// Delay before the polling fallback starts while the push channel is healthy (seconds).
pub const POLL_START_DELAY_SECS: u64 = 25;

/// Fixed period between poll ticks once polling is active (seconds).
pub const POLL_INTERVAL_SECS: u64 = 3;

/// How long the SSE change feed waits for the subscription response (seconds).
pub const FEED_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default per-request HTTP timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default booking/assessment API base URL.
pub const DEFAULT_API_URL: &str = "https://api.shemamusic.my.id";

/// Maximum number of schedule preferences per registration.
pub const MAX_SCHEDULE_CHOICES: usize = 2;

/// Room label used when a slot carries no room name.
pub const DEFAULT_ROOM_NAME: &str = "Regular Room";

/// Class type assumed for courses without a `type_course`.
pub const DEFAULT_CLASS_TYPE: &str = "reguler";

/// Number of questionnaire sections; section `QUESTIONNAIRE_SECTIONS + 1` is the result view.
pub const QUESTIONNAIRE_SECTIONS: u8 = 11;
