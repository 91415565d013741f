//! Service layer for the Shema Music client
//!
//! Centralizes the recommendation and registration flows between the CLI
//! and the API client, watcher and change feeds.

#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]

pub mod error;
mod recommendation_service;
mod registration_service;

pub use error::ServiceError;
pub use recommendation_service::RecommendationService;
pub use registration_service::{RegistrationService, ScheduleOptions};
