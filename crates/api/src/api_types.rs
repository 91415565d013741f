use serde::Deserialize;
use serde_json::Value;

use shema_core::{Course, Instructor, Slot};

/// `{ success, data?, message?, assessment_id? }` wrapper used by every endpoint.
#[derive(Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub assessment_id: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ResultData {
    #[serde(default)]
    pub result: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct CoursesData {
    #[serde(default)]
    pub courses: Vec<Course>,
}

#[derive(Deserialize)]
pub(crate) struct InstructorsData {
    #[serde(default)]
    pub instructors: Vec<Instructor>,
}

#[derive(Deserialize)]
pub(crate) struct SlotsData {
    #[serde(default)]
    pub slots: Vec<Slot>,
}

#[derive(Deserialize)]
pub(crate) struct BookingData {
    pub booking_id: String,
}
