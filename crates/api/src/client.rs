use std::time::Duration;

use serde::de::DeserializeOwned;

use shema_core::constants::{DEFAULT_API_URL, HTTP_TIMEOUT_SECS};
use shema_core::{
    AnalysisResult, AssessmentId, AssessmentPayload, BookingConfirmation, Course, Instructor,
    RegistrationRequest, Slot, env_secs_with_default, env_string,
};

use crate::api_types::{
    BookingData, CoursesData, Envelope, InstructorsData, ResultData, SlotsData,
};
use crate::error::ApiError;

/// Maximum body length echoed into error messages.
const MAX_ERROR_BODY_LEN: usize = 300;

/// Outcome of submitting a questionnaire.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The backend answered synchronously.
    Completed(AnalysisResult),
    /// The analysis runs in the background; watch this id.
    Pending(AssessmentId),
}

/// Client for the booking and assessment API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
}

impl ApiClient {
    /// Creates a client for `base_url` with the request timeout taken from
    /// `SHEMA_HTTP_TIMEOUT_SECS`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let timeout = env_secs_with_default("SHEMA_HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS);
        Self::with_timeout(base_url, timeout)
    }

    /// Creates a client from `SHEMA_API_URL`, falling back to the production API.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = env_string("SHEMA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        Self::new(&base_url)
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::ClientInit(e.to_string()))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the analysis for one assessment.
    ///
    /// `Ok(None)` means "not ready yet": a 404, an unsuccessful envelope, or an
    /// empty result object.
    ///
    /// # Errors
    /// Network failures, any other non-success status, or an unparsable body.
    pub async fn fetch_result(&self, id: &AssessmentId) -> Result<Option<AnalysisResult>, ApiError> {
        self.results(Some(id)).await
    }

    /// Fetches the visitor's most recent analysis, or the one for `id` if given.
    ///
    /// # Errors
    /// Same as [`Self::fetch_result`].
    pub async fn results(
        &self,
        id: Option<&AssessmentId>,
    ) -> Result<Option<AnalysisResult>, ApiError> {
        let mut request = self.client.get(format!("{}/api/results", self.base_url));
        if let Some(id) = id {
            request = request.query(&[("assessment_id", id.as_str())]);
        }

        let envelope: Envelope<ResultData> = match self.send(request, "results").await {
            Ok(envelope) => envelope,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        if !envelope.success {
            return Ok(None);
        }
        Ok(envelope
            .data
            .and_then(|data| data.result)
            .and_then(AnalysisResult::from_result_object))
    }

    /// Submits a questionnaire for analysis.
    ///
    /// # Errors
    /// Non-success status, `success: false`, or a response carrying neither a
    /// result nor an assessment id.
    pub async fn submit_assessment(
        &self,
        payload: &AssessmentPayload,
    ) -> Result<Submission, ApiError> {
        let request = self.client.post(format!("{}/api/assessment", self.base_url)).json(payload);
        let envelope: Envelope<ResultData> = self.send(request, "assessment submission").await?;

        if !envelope.success {
            return Err(ApiError::Rejected(
                envelope.message.unwrap_or_else(|| "Failed to process assessment".to_owned()),
            ));
        }

        if let Some(result) =
            envelope.data.and_then(|d| d.result).and_then(AnalysisResult::from_result_object)
        {
            return Ok(Submission::Completed(result));
        }

        match envelope.assessment_id {
            Some(raw) => {
                let id = AssessmentId::new(raw)
                    .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
                tracing::debug!(assessment_id = %id, "assessment accepted for background analysis");
                Ok(Submission::Pending(id))
            },
            None => Err(ApiError::InvalidResponse(
                "assessment response has neither result nor assessment_id".to_owned(),
            )),
        }
    }

    /// # Errors
    /// Network failure, non-success status or `success: false`.
    pub async fn courses(&self) -> Result<Vec<Course>, ApiError> {
        let request = self.client.get(format!("{}/api/courses", self.base_url));
        let data: CoursesData = self.send_data(request, "courses").await?;
        Ok(data.courses)
    }

    /// # Errors
    /// Network failure, non-success status or `success: false`.
    pub async fn available_instructors(&self) -> Result<Vec<Instructor>, ApiError> {
        let request =
            self.client.get(format!("{}/api/booking/available-instructors", self.base_url));
        let data: InstructorsData = self.send_data(request, "available instructors").await?;
        Ok(data.instructors)
    }

    /// All slots, booked ones included; callers filter on `status`.
    ///
    /// # Errors
    /// Network failure, non-success status or `success: false`.
    pub async fn find_slots(&self) -> Result<Vec<Slot>, ApiError> {
        let request = self
            .client
            .get(format!("{}/api/booking/availability/find-slots", self.base_url))
            .query(&[("include_all", "true")]);
        let data: SlotsData = self.send_data(request, "slots").await?;
        Ok(data.slots)
    }

    /// # Errors
    /// Network failure, non-success status or `success: false` (with the
    /// backend's message).
    pub async fn register_course(
        &self,
        registration: &RegistrationRequest,
    ) -> Result<BookingConfirmation, ApiError> {
        let request = self
            .client
            .post(format!("{}/api/booking/register-course", self.base_url))
            .json(registration);
        let data: BookingData = self.send_data(request, "course registration").await?;
        Ok(BookingConfirmation { booking_id: data.booking_id })
    }

    async fn send_data<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.send(request, context).await?;
        if !envelope.success {
            return Err(ApiError::Rejected(
                envelope.message.unwrap_or_else(|| format!("{context} request unsuccessful")),
            ));
        }
        envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse(format!("{context} response has no data")))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                code: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY_LEN).to_owned(),
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::JsonParse {
            context: format!("{context} response (body: {})", truncate(&body, 200)),
            source: e,
        })
    }
}

/// Truncates a string to the given maximum length at a char boundary.
#[must_use]
pub(crate) fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        s.get(..end).unwrap_or("")
    }
}
