use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use shema_core::{AnalysisResult, AssessmentId};
use shema_realtime::{
    ChangeFeed, ChangeKind, ChannelStatus, DisabledFeed, FeedError, FeedMessage, Subscription,
};
use shema_watcher::{FetchOutcome, ResultSource, ResultWatcher, WatchError, WatchEvent};
use tokio::time::Instant;

type Respond = Box<dyn Fn(&AssessmentId, Duration) -> FetchOutcome + Send + Sync>;

/// Answers every read from a function of (id, elapsed time) and counts calls.
struct ScriptedSource {
    started: Instant,
    calls: Mutex<HashMap<String, usize>>,
    respond: Respond,
}

impl ScriptedSource {
    fn new(
        respond: impl Fn(&AssessmentId, Duration) -> FetchOutcome + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            calls: Mutex::default(),
            respond: Box::new(respond),
        })
    }

    /// Data appears for every id once `at` has passed.
    fn ready_at(at: Duration) -> Arc<Self> {
        Self::new(move |_, elapsed| {
            if elapsed >= at { FetchOutcome::Found(result()) } else { FetchOutcome::NotReady }
        })
    }

    fn never_ready() -> Arc<Self> {
        Self::new(|_, _| FetchOutcome::NotReady)
    }

    fn calls(&self, id: &str) -> usize {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ResultSource for ScriptedSource {
    async fn fetch(&self, id: &AssessmentId) -> FetchOutcome {
        *self.calls.lock().unwrap().entry(id.to_string()).or_default() += 1;
        (self.respond)(id, self.started.elapsed())
    }
}

/// Checks readiness when the read starts but answers only after `latency`,
/// like a slow request racing a concurrent write.
struct LaggingSource {
    started: Instant,
    ready_at: Duration,
    latency: Duration,
    calls: AtomicUsize,
}

impl LaggingSource {
    fn new(ready_at: Duration, latency: Duration) -> Arc<Self> {
        Arc::new(Self { started: Instant::now(), ready_at, latency, calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultSource for LaggingSource {
    async fn fetch(&self, _id: &AssessmentId) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ready = self.started.elapsed() >= self.ready_at;
        tokio::time::sleep(self.latency).await;
        if ready { FetchOutcome::Found(result()) } else { FetchOutcome::NotReady }
    }
}

/// Counts live subscriptions.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Emits scripted messages at offsets from subscription time, then stays
/// silent forever.
struct ScriptedFeed {
    script: Vec<(Duration, FeedMessage)>,
    live: Arc<AtomicUsize>,
}

impl ScriptedFeed {
    fn new(script: Vec<(Duration, FeedMessage)>) -> Arc<Self> {
        Arc::new(Self { script, live: Arc::default() })
    }

    fn silent() -> Arc<Self> {
        Self::new(Vec::new())
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeFeed for ScriptedFeed {
    async fn subscribe(&self, id: &AssessmentId) -> Result<Subscription, FeedError> {
        let script = self.script.clone();
        let guard = LiveGuard::new(&self.live);
        let start = Instant::now();
        let stream = async_stream::stream! {
            let _guard = guard;
            for (at, message) in script {
                tokio::time::sleep_until(start + at).await;
                yield message;
            }
            std::future::pending::<()>().await;
        };
        Ok(Subscription::new(id.clone(), Box::pin(stream)))
    }
}

fn result() -> AnalysisResult {
    AnalysisResult::from_value(json!({
        "recommendation": {"summary": "Mulai dari piano klasik"},
        "analysis": {"strengths": ["ritme"]},
    }))
    .unwrap()
}

fn id(raw: &str) -> AssessmentId {
    AssessmentId::new(raw).unwrap()
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn assert_near(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(500),
        "expected ~{expected:?}, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_poll_finds_result_when_push_never_connects() {
    let source = ScriptedSource::ready_at(secs(28));
    let feed = ScriptedFeed::silent();
    let watcher = ResultWatcher::new(source.clone(), feed.clone());
    let started = Instant::now();

    let found = watcher.watch(id("a")).await.wait().await.unwrap();

    assert_eq!(found, result());
    assert_near(started.elapsed(), secs(28));
    assert_eq!(source.calls("a"), 1);
    assert_eq!(feed.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_times_out_at_deadline_without_data() {
    let source = ScriptedSource::never_ready();
    let feed = ScriptedFeed::silent();
    let watcher = ResultWatcher::new(source.clone(), feed.clone());

    let mut session = watcher.watch(id("a")).await;
    let event = session.next_event().await;

    match event {
        Some(WatchEvent::TimedOut { after }) => assert_near(after, secs(60)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(session.next_event().await, None);
    // Polls at 28, 31, ..., 58.
    assert_eq!(source.calls("a"), 11);
    assert_eq!(feed.live(), 0);

    tokio::time::sleep(secs(30)).await;
    assert_eq!(source.calls("a"), 11);
}

#[tokio::test(start_paused = true)]
async fn test_wait_reports_timeout_error() {
    let watcher = ResultWatcher::new(ScriptedSource::never_ready(), ScriptedFeed::silent());
    let started = Instant::now();
    let error = watcher.watch(id("a")).await.wait().await.unwrap_err();
    assert!(matches!(error, WatchError::Timeout { .. }));
    assert_near(started.elapsed(), secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_channel_error_starts_polling_immediately() {
    let source = ScriptedSource::ready_at(Duration::ZERO);
    let feed = ScriptedFeed::new(vec![(
        Duration::ZERO,
        FeedMessage::Status(ChannelStatus::ChannelError),
    )]);
    let watcher = ResultWatcher::new(source.clone(), feed);
    let started = Instant::now();

    watcher.watch(id("a")).await.wait().await.unwrap();

    assert_near(started.elapsed(), secs(3));
    assert_eq!(source.calls("a"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_feed_polls_from_the_start() {
    let source = ScriptedSource::ready_at(secs(5));
    let watcher = ResultWatcher::new(source.clone(), Arc::new(DisabledFeed));
    let started = Instant::now();

    watcher.watch(id("a")).await.wait().await.unwrap();

    assert_near(started.elapsed(), secs(6));
    assert_eq!(source.calls("a"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_subscribed_status_alone_fetches_nothing() {
    let source = ScriptedSource::ready_at(Duration::ZERO);
    let feed = ScriptedFeed::new(vec![(
        Duration::ZERO,
        FeedMessage::Status(ChannelStatus::Subscribed),
    )]);
    let watcher = ResultWatcher::new(source.clone(), feed);

    let mut session = watcher.watch(id("a")).await;
    let early = tokio::time::timeout(secs(20), session.next_event()).await;

    assert!(early.is_err());
    assert_eq!(source.calls("a"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_push_change_resolves_before_polling() {
    let source = ScriptedSource::ready_at(secs(4));
    let feed = ScriptedFeed::new(vec![
        (Duration::ZERO, FeedMessage::Status(ChannelStatus::Subscribed)),
        (secs(5), FeedMessage::Change(ChangeKind::Insert)),
    ]);
    let watcher = ResultWatcher::new(source.clone(), feed.clone());
    let started = Instant::now();

    watcher.watch(id("a")).await.wait().await.unwrap();

    assert_near(started.elapsed(), secs(5));
    assert_eq!(source.calls("a"), 1);
    assert_eq!(feed.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_change_during_slow_read_gets_its_own_read() {
    // The insert read starts before the data exists; the update read after.
    let source = LaggingSource::new(secs(2), secs(4));
    let feed = ScriptedFeed::new(vec![
        (Duration::ZERO, FeedMessage::Status(ChannelStatus::Subscribed)),
        (secs(1), FeedMessage::Change(ChangeKind::Insert)),
        (secs(2), FeedMessage::Change(ChangeKind::Update)),
    ]);
    let watcher = ResultWatcher::new(source.clone(), feed.clone());
    let started = Instant::now();

    let found = watcher.watch(id("a")).await.wait().await.unwrap();

    assert_eq!(found, result());
    assert_near(started.elapsed(), secs(6));
    assert_eq!(source.calls(), 2);
    assert_eq!(feed.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_reads_do_not_swallow_poll_ticks() {
    // Reads take 20s; the 31s tick is the first to see the data.
    let source = LaggingSource::new(secs(29), secs(20));
    let feed = ScriptedFeed::silent();
    let watcher = ResultWatcher::new(source.clone(), feed.clone());
    let started = Instant::now();

    let found = watcher.watch(id("a")).await.wait().await.unwrap();

    assert_eq!(found, result());
    assert_near(started.elapsed(), secs(51));
    // Ticks at 28, 31, ..., 49 each started a read.
    assert_eq!(source.calls(), 8);
    assert_eq!(feed.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_not_ready_at_ten_then_found_at_thirty() {
    let analysis = json!({"recommendation": {"summary": "Gitar akustik"}});
    let expected = AnalysisResult::from_value(analysis.clone()).unwrap();
    let source = ScriptedSource::new(move |_, elapsed| {
        if elapsed < secs(30) {
            FetchOutcome::NotReady
        } else {
            let wrapped = json!({"ai_analysis": analysis});
            FetchOutcome::Found(AnalysisResult::from_result_object(wrapped).unwrap())
        }
    });
    let feed = ScriptedFeed::new(vec![
        (Duration::ZERO, FeedMessage::Status(ChannelStatus::Subscribed)),
        (secs(10), FeedMessage::Change(ChangeKind::Update)),
        (secs(30), FeedMessage::Change(ChangeKind::Update)),
    ]);
    let watcher = ResultWatcher::new(source.clone(), feed);
    let started = Instant::now();

    let found = watcher.watch(id("a")).await.wait().await.unwrap();

    assert_eq!(found, expected);
    assert_near(started.elapsed(), secs(30));
    // Push at 10, poll at 28, push at 30.
    assert_eq!(source.calls("a"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetches_are_retried() {
    let source = ScriptedSource::new(|_, elapsed| {
        if elapsed < secs(31) {
            FetchOutcome::Failed("HTTP 503".to_owned())
        } else {
            FetchOutcome::Found(result())
        }
    });
    let watcher = ResultWatcher::new(source.clone(), ScriptedFeed::silent());
    let started = Instant::now();

    watcher.watch(id("a")).await.wait().await.unwrap();

    assert_near(started.elapsed(), secs(31));
    assert_eq!(source.calls("a"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_suppresses_every_outcome() {
    let source = ScriptedSource::ready_at(secs(28));
    let feed = ScriptedFeed::silent();
    let watcher = ResultWatcher::new(source.clone(), feed.clone());

    let mut session = watcher.watch(id("a")).await;
    tokio::time::sleep(secs(10)).await;
    session.cancel();
    session.cancel();
    watcher.cancel_active().await;

    assert!(session.is_cancelled());
    assert_eq!(session.next_event().await, None);
    tokio::time::sleep(secs(60)).await;
    assert_eq!(source.calls("a"), 0);
    assert_eq!(feed.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_session_cancels_watch() {
    let source = ScriptedSource::never_ready();
    let feed = ScriptedFeed::silent();
    let watcher = ResultWatcher::new(source.clone(), feed.clone());

    drop(watcher.watch(id("a")).await);
    watcher.cancel_active().await;

    assert_eq!(feed.live(), 0);
    tokio::time::sleep(secs(40)).await;
    assert_eq!(source.calls("a"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_watch_releases_previous_session() {
    let source = ScriptedSource::new(|id, elapsed| {
        if id.as_str() == "b" && elapsed >= secs(40) {
            FetchOutcome::Found(result())
        } else {
            FetchOutcome::NotReady
        }
    });
    let feed = ScriptedFeed::silent();
    let watcher = ResultWatcher::new(source.clone(), feed.clone());

    let mut first = watcher.watch(id("a")).await;
    tokio::time::sleep(secs(30)).await;
    assert_eq!(source.calls("a"), 1);

    let second = watcher.watch(id("b")).await;
    assert_eq!(first.next_event().await, None);
    tokio::task::yield_now().await;
    assert_eq!(feed.live(), 1);

    let found = second.wait().await.unwrap();
    assert_eq!(found, result());
    assert_eq!(source.calls("a"), 1);
    assert_eq!(feed.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_same_id_watch_restarts_deadline() {
    let source = ScriptedSource::never_ready();
    let watcher = ResultWatcher::new(source.clone(), ScriptedFeed::silent());

    let mut first = watcher.watch(id("a")).await;
    tokio::time::sleep(secs(40)).await;
    let second = watcher.watch(id("a")).await;
    let restarted = Instant::now();

    assert_eq!(first.next_event().await, None);
    assert!(matches!(second.wait().await, Err(WatchError::Timeout { .. })));
    assert_near(restarted.elapsed(), secs(60));
}
