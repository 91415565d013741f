//! Where a watch reads the analysis from.

use async_trait::async_trait;
use shema_api::ApiClient;
use shema_core::{AnalysisResult, AssessmentId};

/// Classified result of one read.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(AnalysisResult),
    /// 404, an unsuccessful envelope or an empty result.
    NotReady,
    /// Network failure or unexpected status. Non-terminal.
    Failed(String),
}

#[async_trait]
pub trait ResultSource: Send + Sync {
    async fn fetch(&self, id: &AssessmentId) -> FetchOutcome;
}

#[async_trait]
impl ResultSource for ApiClient {
    async fn fetch(&self, id: &AssessmentId) -> FetchOutcome {
        match self.fetch_result(id).await {
            Ok(Some(result)) => FetchOutcome::Found(result),
            Ok(None) => FetchOutcome::NotReady,
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }
}
