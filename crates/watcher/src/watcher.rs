//! Drives one watch at a time: push subscription, poll fallback, deadline.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use shema_core::AssessmentId;
use shema_realtime::{ChangeFeed, ChannelStatus, FeedMessage, Subscription};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::WatchConfig;
use crate::machine::{Directive, WatchMachine};
use crate::session::{WatchEvent, WatchSession};
use crate::source::{FetchOutcome, ResultSource};

/// Floor for the poll period; a zero period would spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reads allowed to overlap; triggers beyond this are dropped.
const MAX_IN_FLIGHT_FETCHES: usize = 32;

type Fetch<'a> = Pin<Box<dyn Future<Output = FetchOutcome> + Send + 'a>>;

struct ActiveWatch {
    assessment_id: AssessmentId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Waits for analysis results, one assessment at a time.
///
/// Starting a new watch cancels the previous one and waits until its timers
/// and subscription are released.
pub struct ResultWatcher {
    source: Arc<dyn ResultSource>,
    feed: Arc<dyn ChangeFeed>,
    config: WatchConfig,
    active: Mutex<Option<ActiveWatch>>,
}

impl std::fmt::Debug for ResultWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultWatcher").field("config", &self.config).finish_non_exhaustive()
    }
}

impl ResultWatcher {
    #[must_use]
    pub fn new(source: Arc<dyn ResultSource>, feed: Arc<dyn ChangeFeed>) -> Self {
        Self { source, feed, config: WatchConfig::default(), active: Mutex::new(None) }
    }

    #[must_use]
    pub fn with_config(mut self, config: WatchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Starts watching `id`, superseding any watch still running.
    ///
    /// The same id is not special: watching it again restarts the deadline.
    pub async fn watch(&self, id: AssessmentId) -> WatchSession {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            tracing::debug!(
                previous = %previous.assessment_id,
                next = %id,
                "superseding active watch"
            );
            release(previous).await;
        }

        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let driver = Driver {
            id: id.clone(),
            source: Arc::clone(&self.source),
            feed: Arc::clone(&self.feed),
            config: self.config,
            token: token.clone(),
        };
        let task = tokio::spawn(driver.run(tx));
        *active = Some(ActiveWatch { assessment_id: id.clone(), token: token.clone(), task });

        WatchSession::new(id, token, rx)
    }

    /// Cancels the running watch, if any, and waits for its teardown.
    pub async fn cancel_active(&self) {
        if let Some(previous) = self.active.lock().await.take() {
            release(previous).await;
        }
    }
}

async fn release(watch: ActiveWatch) {
    watch.token.cancel();
    if let Err(e) = watch.task.await {
        tracing::warn!(assessment_id = %watch.assessment_id, "watch task failed: {e}");
    }
}

struct Driver {
    id: AssessmentId,
    source: Arc<dyn ResultSource>,
    feed: Arc<dyn ChangeFeed>,
    config: WatchConfig,
    token: CancellationToken,
}

impl Driver {
    async fn run(self, outcome: oneshot::Sender<WatchEvent>) {
        let started = Instant::now();
        let mut machine = WatchMachine::new();
        machine.activate();

        let deadline = tokio::time::sleep(self.config.deadline);
        tokio::pin!(deadline);
        let poll_delay = tokio::time::sleep(self.config.poll_delay);
        tokio::pin!(poll_delay);
        let mut poll_delay_armed = true;
        let mut polling: Option<Interval> = None;
        let mut in_flight: FuturesUnordered<Fetch<'_>> = FuturesUnordered::new();

        let mut subscription = tokio::select! {
            biased;
            () = self.token.cancelled() => return,
            () = &mut deadline => None,
            subscribed = self.feed.subscribe(&self.id) => match subscribed {
                Ok(subscription) => Some(subscription),
                Err(e) => {
                    tracing::info!(assessment_id = %self.id, "change feed unavailable: {e}");
                    None
                },
            },
        };
        if subscription.is_none() && !deadline.is_elapsed() {
            let directive = machine.feed_status(ChannelStatus::ChannelError);
            self.apply(directive, &mut polling, &mut in_flight);
            poll_delay_armed = false;
        }

        let event = loop {
            let directive = tokio::select! {
                biased;
                () = self.token.cancelled() => {
                    machine.cancel();
                    break None;
                },
                () = &mut deadline => machine.deadline_elapsed(),
                fetched = settle(&mut in_flight) => {
                    if let FetchOutcome::Failed(reason) = &fetched {
                        tracing::warn!(
                            assessment_id = %self.id,
                            %reason,
                            "result fetch failed, will retry"
                        );
                    }
                    machine.fetch_completed(fetched)
                },
                () = &mut poll_delay, if poll_delay_armed => {
                    poll_delay_armed = false;
                    machine.poll_delay_elapsed()
                },
                () = tick(&mut polling) => machine.poll_tick(),
                message = next_message(&mut subscription) => match message {
                    Some(FeedMessage::Status(status)) => {
                        if status.is_degraded() {
                            tracing::warn!(assessment_id = %self.id, %status, "change feed degraded");
                        } else {
                            tracing::debug!(assessment_id = %self.id, %status, "listening for result changes");
                        }
                        machine.feed_status(status)
                    },
                    Some(FeedMessage::Change(kind)) => {
                        tracing::debug!(assessment_id = %self.id, ?kind, "result change announced");
                        machine.feed_change(kind)
                    },
                    None => {
                        subscription = None;
                        machine.feed_status(ChannelStatus::Closed)
                    },
                },
            };

            match directive {
                Directive::Resolve(result) => break Some(WatchEvent::Found(result)),
                Directive::TimeOut => {
                    let after = started.elapsed();
                    tracing::error!(
                        assessment_id = %self.id,
                        after_secs = after.as_secs(),
                        "timed out waiting for analysis result"
                    );
                    break Some(WatchEvent::TimedOut { after });
                },
                Directive::StartPolling => {
                    poll_delay_armed = false;
                    self.apply(Directive::StartPolling, &mut polling, &mut in_flight);
                },
                other => self.apply(other, &mut polling, &mut in_flight),
            }
        };

        drop(in_flight);
        drop(polling);
        drop(subscription);

        if let Some(event) = event {
            if self.token.is_cancelled() {
                return;
            }
            if matches!(event, WatchEvent::Found(_)) {
                tracing::info!(
                    assessment_id = %self.id,
                    elapsed_ms = started.elapsed().as_millis(),
                    "analysis result found"
                );
            }
            // Receiver gone means the session was cancelled or dropped.
            let _ = outcome.send(event);
        }
    }

    fn apply<'a>(
        &'a self,
        directive: Directive,
        polling: &mut Option<Interval>,
        in_flight: &mut FuturesUnordered<Fetch<'a>>,
    ) {
        match directive {
            Directive::StartPolling => {
                let period = self.config.poll_interval.max(MIN_POLL_INTERVAL);
                tracing::info!(
                    assessment_id = %self.id,
                    period_secs = period.as_secs(),
                    "polling for result"
                );
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                *polling = Some(interval);
            },
            // Every trigger gets its own read: one already in flight may
            // predate the write that this trigger announces.
            Directive::Fetch => {
                if in_flight.len() < MAX_IN_FLIGHT_FETCHES {
                    in_flight.push(self.source.fetch(&self.id));
                } else {
                    tracing::debug!(
                        assessment_id = %self.id,
                        in_flight = in_flight.len(),
                        "too many reads in flight, trigger dropped"
                    );
                }
            },
            Directive::Ignore | Directive::Resolve(_) | Directive::TimeOut => {},
        }
    }
}

/// First read to complete; pends while none is running.
async fn settle(in_flight: &mut FuturesUnordered<Fetch<'_>>) -> FetchOutcome {
    match in_flight.next().await {
        Some(outcome) => outcome,
        None => std::future::pending().await,
    }
}

async fn tick(polling: &mut Option<Interval>) {
    match polling {
        Some(interval) => {
            interval.tick().await;
        },
        None => std::future::pending().await,
    }
}

async fn next_message(subscription: &mut Option<Subscription>) -> Option<FeedMessage> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
