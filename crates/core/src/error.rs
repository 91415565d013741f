use std::result::Result as StdResult;

use thiserror::Error;

/// Errors raised while building or validating domain values.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Section {section} is incomplete: {reason}")]
    IncompleteSection { section: u8, reason: &'static str },

    #[error("At most {max} schedules can be selected")]
    ScheduleLimit { max: usize },

    #[error("Schedule already selected: {0}")]
    DuplicateSchedule(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = StdResult<T, CoreError>;
