use std::sync::Arc;

use chrono::Utc;
use shema_api::ApiClient;
use shema_core::{
    BookingConfirmation, CourseCatalog, Instructor, PaymentProof, RegistrationForm,
    RegistrationRequest, ScheduleFilter, ScheduleSelection, SlotBoard, matching_instructors,
};

use crate::error::ServiceError;

/// Everything the schedule step needs, fetched together.
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    pub instructors: Vec<Instructor>,
    pub slots: SlotBoard,
}

impl ScheduleOptions {
    /// Instructors offered for the chosen instrument and class type.
    #[must_use]
    pub fn instructors_for(&self, filter: &ScheduleFilter<'_>) -> Vec<&Instructor> {
        matching_instructors(&self.instructors, filter)
    }

    #[must_use]
    pub fn instructor(&self, id: &str) -> Option<&Instructor> {
        self.instructors.iter().find(|i| i.id == id)
    }
}

/// Course registration: catalog, schedules and the final booking.
#[derive(Debug, Clone)]
pub struct RegistrationService {
    api: Arc<ApiClient>,
}

impl RegistrationService {
    #[must_use]
    pub const fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn catalog(&self) -> Result<CourseCatalog, ServiceError> {
        let courses = self.api.courses().await?;
        tracing::debug!(count = courses.len(), "courses loaded");
        Ok(CourseCatalog::new(courses))
    }

    pub async fn schedule_options(&self) -> Result<ScheduleOptions, ServiceError> {
        let (instructors, slots) =
            tokio::try_join!(self.api.available_instructors(), self.api.find_slots())?;
        tracing::debug!(
            instructors = instructors.len(),
            slots = slots.len(),
            "schedule options loaded"
        );
        Ok(ScheduleOptions { instructors, slots: SlotBoard::new(slots) })
    }

    /// Builds and submits the booking. At least one schedule and a payment
    /// method are required.
    pub async fn register(
        &self,
        form: &RegistrationForm,
        schedules: &ScheduleSelection,
        payment: &PaymentProof,
    ) -> Result<BookingConfirmation, ServiceError> {
        if schedules.is_empty() {
            return Err(ServiceError::InvalidInput("choose at least one schedule".to_owned()));
        }
        if payment.method.trim().is_empty() {
            return Err(ServiceError::InvalidInput("payment method is required".to_owned()));
        }

        let request = RegistrationRequest::build(form, schedules, payment, Utc::now())?;
        let confirmation = self.api.register_course(&request).await?;
        tracing::info!(
            booking_id = %confirmation.booking_id,
            course_id = %request.course_id,
            "course registration submitted"
        );
        Ok(confirmation)
    }
}
