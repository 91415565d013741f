//! Clock-free state machine deciding what a watch does next.
//!
//! The driver in [`crate::watcher`] owns the timers, the subscription and the
//! in-flight fetch; this type only decides. Every input returns a
//! [`Directive`], and once a terminal state is reached every input returns
//! [`Directive::Ignore`].

use shema_core::AnalysisResult;
use shema_realtime::{ChangeKind, ChannelStatus};

use crate::source::FetchOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Listening { polling: bool },
    Resolved,
    TimedOut,
    Cancelled,
}

impl WatchState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::TimedOut | Self::Cancelled)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening { polling: false } => "listening",
            Self::Listening { polling: true } => "polling",
            Self::Resolved => "resolved",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

/// What the driver must do in response to an input.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Ignore,
    /// Arm the fixed-period poll interval.
    StartPolling,
    /// Read the result once.
    Fetch,
    /// Deliver the result and release everything.
    Resolve(AnalysisResult),
    /// Report the timeout and release everything.
    TimeOut,
}

#[derive(Debug)]
pub struct WatchMachine {
    state: WatchState,
}

impl Default for WatchMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchMachine {
    #[must_use]
    pub const fn new() -> Self {
        Self { state: WatchState::Idle }
    }

    #[must_use]
    pub const fn state(&self) -> WatchState {
        self.state
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    #[must_use]
    pub const fn is_polling(&self) -> bool {
        matches!(self.state, WatchState::Listening { polling: true })
    }

    /// Subscription opened and timers armed.
    pub fn activate(&mut self) -> Directive {
        if self.state == WatchState::Idle {
            self.state = WatchState::Listening { polling: false };
        }
        Directive::Ignore
    }

    pub fn poll_delay_elapsed(&mut self) -> Directive {
        self.start_polling()
    }

    pub fn poll_tick(&mut self) -> Directive {
        if self.is_polling() { Directive::Fetch } else { Directive::Ignore }
    }

    /// Any row change is only a hint; the fetch decides.
    pub fn feed_change(&mut self, _kind: ChangeKind) -> Directive {
        match self.state {
            WatchState::Listening { .. } => Directive::Fetch,
            _ => Directive::Ignore,
        }
    }

    /// `Subscribed` alone triggers nothing; any degraded status starts
    /// polling right away.
    pub fn feed_status(&mut self, status: ChannelStatus) -> Directive {
        if status.is_degraded() { self.start_polling() } else { Directive::Ignore }
    }

    pub fn fetch_completed(&mut self, outcome: FetchOutcome) -> Directive {
        match (self.state, outcome) {
            (WatchState::Listening { .. }, FetchOutcome::Found(result)) => {
                self.state = WatchState::Resolved;
                Directive::Resolve(result)
            },
            _ => Directive::Ignore,
        }
    }

    pub fn deadline_elapsed(&mut self) -> Directive {
        if self.is_terminal() {
            return Directive::Ignore;
        }
        self.state = WatchState::TimedOut;
        Directive::TimeOut
    }

    /// Idempotent.
    pub fn cancel(&mut self) -> Directive {
        if !self.is_terminal() {
            self.state = WatchState::Cancelled;
        }
        Directive::Ignore
    }

    fn start_polling(&mut self) -> Directive {
        match self.state {
            WatchState::Listening { polling: false } => {
                self.state = WatchState::Listening { polling: true };
                Directive::StartPolling
            },
            _ => Directive::Ignore,
        }
    }
}
