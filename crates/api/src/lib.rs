//! HTTP client for the Shema Music booking and assessment API.

mod api_types;
mod client;
pub mod error;


pub use client::{ApiClient, Submission};
pub use error::ApiError;
