//! Core types for the Shema Music client
//!
//! Domain types shared across all other crates: assessments and their
//! results, the recommendation questionnaire, the course catalog and the
//! booking request.

mod assessment;
mod booking;
mod catalog;
pub mod constants;
mod env_config;
mod error;
mod questionnaire;

pub use assessment::*;
pub use booking::*;
pub use catalog::*;
pub use env_config::*;
pub use error::*;
pub use questionnaire::*;
