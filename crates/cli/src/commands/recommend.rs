use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use shema_api::ApiClient;
use shema_core::{AnalysisResult, AssessmentId, Questionnaire};
use shema_realtime::SseFeed;
use shema_service::{RecommendationService, ServiceError};
use shema_watcher::WatchConfig;

use crate::print_json;

fn service(api: Arc<ApiClient>, realtime_url: Option<&str>) -> Result<RecommendationService> {
    match realtime_url {
        Some(url) => {
            let feed = SseFeed::new(url)?;
            Ok(RecommendationService::new(api, Arc::new(feed), WatchConfig::from_env()))
        },
        None => Ok(RecommendationService::from_env(api)?),
    }
}

fn explain(err: ServiceError) -> anyhow::Error {
    if err.is_timeout() {
        anyhow::Error::new(err).context("timed out waiting for the AI analysis, try again later")
    } else {
        err.into()
    }
}

fn print_result(result: &AnalysisResult) -> Result<()> {
    if result.recommendation().is_none() {
        tracing::debug!("analysis has no recognised recommendation shape");
    }
    print_json(result)
}

pub(crate) async fn run_recommend(
    api: Arc<ApiClient>,
    realtime_url: Option<&str>,
    answers: &Path,
) -> Result<()> {
    let raw = std::fs::read_to_string(answers)
        .with_context(|| format!("reading answers from {}", answers.display()))?;
    let answers: Questionnaire = serde_json::from_str(&raw).context("parsing answers")?;

    let service = service(api, realtime_url)?;
    let result = service.recommend(&answers).await.map_err(explain)?;
    print_result(&result)
}

pub(crate) async fn run_watch(
    api: Arc<ApiClient>,
    realtime_url: Option<&str>,
    assessment_id: &str,
) -> Result<()> {
    let id = AssessmentId::new(assessment_id)?;
    let service = service(api, realtime_url)?;
    tracing::info!(
        assessment_id = %id,
        deadline = ?service.watch_config().deadline,
        "waiting for analysis"
    );
    let session = service.watch(id).await;

    let result = tokio::select! {
        outcome = session.wait() => outcome.map_err(|e| explain(e.into()))?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            service.cancel().await;
            bail!("watch cancelled");
        },
    };
    print_result(&result)
}

pub(crate) async fn run_result(api: Arc<ApiClient>, assessment_id: Option<&str>) -> Result<()> {
    let id = assessment_id.map(AssessmentId::new).transpose()?;
    let service = service(api, None)?;
    match service.check_existing(id.as_ref()).await? {
        Some(result) => print_result(&result),
        None => {
            println!("No analysis result found");
            Ok(())
        },
    }
}
