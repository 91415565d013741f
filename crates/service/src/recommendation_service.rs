use std::sync::Arc;

use shema_api::{ApiClient, Submission};
use shema_core::{AnalysisResult, AssessmentId, Questionnaire};
use shema_realtime::{ChangeFeed, DisabledFeed, SseFeed};
use shema_watcher::{ResultSource, ResultWatcher, WatchConfig, WatchSession};

use crate::error::ServiceError;

/// Questionnaire submission and waiting for the AI recommendation.
#[derive(Debug)]
pub struct RecommendationService {
    api: Arc<ApiClient>,
    watcher: ResultWatcher,
}

impl RecommendationService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, feed: Arc<dyn ChangeFeed>, config: WatchConfig) -> Self {
        let source: Arc<dyn ResultSource> = api.clone();
        let watcher = ResultWatcher::new(source, feed).with_config(config);
        Self { api, watcher }
    }

    /// Wires the API client, the SSE feed (when `SHEMA_REALTIME_URL` is set)
    /// and the watch timings from the environment.
    pub fn from_env(api: Arc<ApiClient>) -> Result<Self, ServiceError> {
        let feed: Arc<dyn ChangeFeed> = match SseFeed::from_env()? {
            Some(feed) => {
                tracing::debug!(url = feed.url(), "using SSE change feed");
                Arc::new(feed)
            },
            None => Arc::new(DisabledFeed),
        };
        Ok(Self::new(api, feed, WatchConfig::from_env()))
    }

    #[must_use]
    pub const fn watch_config(&self) -> &WatchConfig {
        self.watcher.config()
    }

    /// Result already stored for `id`, or for the visitor's latest
    /// assessment when `id` is `None`.
    pub async fn check_existing(
        &self,
        id: Option<&AssessmentId>,
    ) -> Result<Option<AnalysisResult>, ServiceError> {
        Ok(self.api.results(id).await?)
    }

    /// Validates every section and submits the answers.
    pub async fn submit(&self, answers: &Questionnaire) -> Result<Submission, ServiceError> {
        let payload = answers.to_payload()?;
        let submission = self.api.submit_assessment(&payload).await?;
        if let Submission::Pending(id) = &submission {
            tracing::info!(assessment_id = %id, "assessment queued for analysis");
        }
        Ok(submission)
    }

    /// Starts watching `id`, superseding any earlier watch.
    pub async fn watch(&self, id: AssessmentId) -> WatchSession {
        self.watcher.watch(id).await
    }

    /// Stops the running watch and waits for its teardown.
    pub async fn cancel(&self) {
        self.watcher.cancel_active().await;
    }

    /// Submits the answers and, when the analysis runs in the background,
    /// waits for it.
    pub async fn recommend(&self, answers: &Questionnaire) -> Result<AnalysisResult, ServiceError> {
        match self.submit(answers).await? {
            Submission::Completed(result) => Ok(result),
            Submission::Pending(id) => Ok(self.watch(id).await.wait().await?),
        }
    }
}
