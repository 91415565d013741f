//! Waits for the AI analysis of a submitted questionnaire.
//!
//! A watch listens on a push channel for changes to the assessment's result
//! and falls back to fixed-period polling, either after a grace delay or as
//! soon as the channel reports trouble. It ends with the result, a timeout,
//! or cancellation, and releases its timers and subscription in every case.

mod config;
pub mod error;
mod machine;
mod session;
mod source;
mod watcher;

pub use config::WatchConfig;
pub use error::WatchError;
pub use machine::{Directive, WatchMachine, WatchState};
pub use session::{WatchEvent, WatchSession};
pub use source::{FetchOutcome, ResultSource};
pub use watcher::ResultWatcher;
