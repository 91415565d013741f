//! Course registration: personal data, schedule preferences and the booking
//! request sent to `POST /api/booking/register-course`.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::Weekday;
use crate::constants::MAX_SCHEDULE_CHOICES;
use crate::error::CoreError;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static TIME_RANGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2})[.:](\d{2})(?::\d{2})?\s*(?:-\s*(\d{1,2})[.:](\d{2})(?::\d{2})?)?\s*$")
        .unwrap()
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Occupation {
    Pelajar,
    Mahasiswa,
    PekerjaSwasta,
    Pns,
    Wiraswasta,
}

impl Occupation {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pelajar => "Pelajar",
            Self::Mahasiswa => "Mahasiswa",
            Self::PekerjaSwasta => "Pekerja Swasta",
            Self::Pns => "PNS",
            Self::Wiraswasta => "Wiraswasta",
        }
    }

    /// School students must also give school, class and guardian details.
    #[must_use]
    pub const fn is_school_student(self) -> bool {
        matches!(self, Self::Pelajar)
    }
}

/// Personal data and course choice from the first registration step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: String,
    pub birth_place: String,
    pub address: String,
    pub instrument: String,
    pub class_type: String,
    pub course_id: String,
    pub price: u64,
    pub level: String,
    pub occupation: Option<Occupation>,
    pub school: String,
    pub student_class: String,
    pub guardian_name: String,
    pub guardian_phone: String,
}

impl RegistrationForm {
    /// Checks required fields in the order the form presents them.
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            (&self.full_name, "full name is required"),
            (&self.email, "email is required"),
        ];
        for (value, message) in required {
            require(value, message)?;
        }
        if !EMAIL_REGEX.is_match(self.email.trim()) {
            return Err(CoreError::InvalidInput(format!("invalid email: {}", self.email)));
        }

        let required = [
            (&self.phone, "phone / WhatsApp number is required"),
            (&self.birth_date, "birth date is required"),
            (&self.birth_place, "birth place is required"),
            (&self.address, "address is required"),
            (&self.instrument, "instrument is required"),
            (&self.class_type, "class type is required"),
            (&self.level, "level is required"),
        ];
        for (value, message) in required {
            require(value, message)?;
        }

        let occupation =
            self.occupation.ok_or_else(|| CoreError::InvalidInput("occupation is required".to_owned()))?;
        if occupation.is_school_student() {
            require(&self.school, "school name is required")?;
            require(&self.student_class, "class is required")?;
            require(&self.guardian_name, "guardian name is required")?;
            require(&self.guardian_phone, "guardian WhatsApp number is required")?;
        }
        Ok(())
    }

    /// Switching instrument invalidates every choice derived from it.
    pub fn select_instrument(&mut self, instrument: &str) {
        self.instrument = instrument.to_owned();
        self.class_type.clear();
        self.course_id.clear();
        self.level.clear();
        self.price = 0;
    }

    pub fn select_class_type(&mut self, class_type: &crate::catalog::ClassType) {
        self.class_type.clone_from(&class_type.kind);
        self.course_id.clone_from(&class_type.course_id);
        self.price = class_type.price;
    }
}

fn require(value: &str, message: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidInput(message.to_owned()));
    }
    Ok(())
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// `HH:MM - HH:MM`. Accepts `10.30` as well as `10:30`, seconds are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl FromStr for TimeRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TIME_RANGE_REGEX
            .captures(s)
            .ok_or_else(|| CoreError::InvalidInput(format!("invalid time range: {s}")))?;
        let part = |i: usize| caps.get(i).map(|m| m.as_str());
        let clock = |h: &str, m: &str| format!("{:0>2}:{m}", h);

        let start = match (part(1), part(2)) {
            (Some(h), Some(m)) => clock(h, m),
            _ => return Err(CoreError::InvalidInput(format!("invalid time range: {s}"))),
        };
        // A single time means a zero-length range.
        let end = match (part(3), part(4)) {
            (Some(h), Some(m)) => clock(h, m),
            _ => start.clone(),
        };
        Ok(Self { start, end })
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} - {}", self.start, self.end)
    }
}

impl Serialize for TimeRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One picked lesson slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleChoice {
    pub instructor_id: String,
    pub instructor_name: String,
    pub day: Weekday,
    pub time: TimeRange,
    pub room: String,
}

impl Display for ScheduleChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}, {}, {}, {}", self.instructor_name, self.day, self.time, self.room)
    }
}

impl ScheduleChoice {
    #[must_use]
    pub fn to_preference(&self, selected_at: DateTime<Utc>) -> SchedulePreferenceSlot {
        SchedulePreferenceSlot {
            day: self.day.api_name().to_owned(),
            start_time: self.time.start.clone(),
            end_time: self.time.end.clone(),
            instructor_id: self.instructor_id.clone(),
            selected_at,
        }
    }
}

/// Up to two distinct schedule choices, in preference order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleSelection(Vec<ScheduleChoice>);

impl ScheduleSelection {
    pub fn add(&mut self, choice: ScheduleChoice) -> Result<(), CoreError> {
        if self.0.contains(&choice) {
            return Err(CoreError::DuplicateSchedule(choice.to_string()));
        }
        if self.0.len() >= MAX_SCHEDULE_CHOICES {
            return Err(CoreError::ScheduleLimit { max: MAX_SCHEDULE_CHOICES });
        }
        self.0.push(choice);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<ScheduleChoice> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    #[must_use]
    pub fn choices(&self) -> &[ScheduleChoice] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Preference entry of the booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePreferenceSlot {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub instructor_id: String,
    pub selected_at: DateTime<Utc>,
}

/// Payment details collected on the last step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub method: String,
    /// Public URL of the already uploaded transfer receipt.
    pub proof_url: String,
    pub captcha_token: String,
}

/// Body of `POST /api/booking/register-course`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub full_name: String,
    pub email: String,
    pub course_id: String,
    pub address: String,
    pub birth_place: String,
    pub birth_date: String,
    pub consent: bool,
    pub captcha_token: String,
    pub idempotency_key: String,
    pub payment_proof: String,
    pub notes: String,
    pub referral_source: String,
    pub type_course: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(rename = "class", skip_serializing_if = "Option::is_none")]
    pub student_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_wa_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_preference: Option<SchedulePreferenceSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_preference: Option<SchedulePreferenceSlot>,
}

impl RegistrationRequest {
    /// Assembles the booking request with a fresh idempotency key.
    pub fn build(
        form: &RegistrationForm,
        schedules: &ScheduleSelection,
        payment: &PaymentProof,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        form.validate()?;
        require(&form.course_id, "course must be selected")?;
        require(&payment.proof_url, "payment proof is required")?;

        let mut preferences = schedules.choices().iter().map(|c| c.to_preference(now));
        Ok(Self {
            full_name: form.full_name.trim().to_owned(),
            email: form.email.trim().to_owned(),
            course_id: form.course_id.clone(),
            address: form.address.trim().to_owned(),
            birth_place: form.birth_place.trim().to_owned(),
            birth_date: form.birth_date.trim().to_owned(),
            consent: true,
            captcha_token: payment.captcha_token.clone(),
            idempotency_key: uuid::Uuid::new_v4().to_string(),
            payment_proof: payment.proof_url.clone(),
            notes: format!("Payment Method: {}", payment.method),
            referral_source: "website".to_owned(),
            type_course: form.class_type.clone(),
            school: non_blank(&form.school),
            student_class: non_blank(&form.student_class),
            guardian_name: non_blank(&form.guardian_name),
            guardian_wa_number: non_blank(&form.guardian_phone),
            first_preference: preferences.next(),
            second_preference: preferences.next(),
        })
    }
}

/// Successful booking acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub booking_id: String,
}
