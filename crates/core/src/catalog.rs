//! Course catalog and schedule availability.
//!
//! The registration flow narrows a flat list of courses and slots step by
//! step: instrument, then class type and level, then instructor, day, time
//! range and finally room. Each step only offers values that still lead to a
//! bookable slot.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CLASS_TYPE, DEFAULT_ROOM_NAME};
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub instrument: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub instructor_name: String,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub price_per_session: Option<u64>,
    #[serde(default)]
    pub type_course: Option<String>,
}

impl Course {
    /// Lower-cased class type, `reguler` when the course carries none.
    #[must_use]
    pub fn class_type_key(&self) -> String {
        self.type_course
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(|| DEFAULT_CLASS_TYPE.to_owned(), str::to_lowercase)
    }

    /// Per-session price when the course has one, otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> u64 {
        self.price_per_session.filter(|p| *p > 0).unwrap_or(self.price)
    }
}

/// One class type offered for an instrument, backed by the first course of that type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassType {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub price: u64,
    pub course_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    courses: Vec<Course>,
}

impl CourseCatalog {
    #[must_use]
    pub fn new(courses: Vec<Course>) -> Self {
        Self { courses }
    }

    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Unique instruments, sorted.
    #[must_use]
    pub fn instruments(&self) -> Vec<String> {
        self.courses
            .iter()
            .map(|c| c.instrument.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Unique levels taught for `instrument`, sorted.
    #[must_use]
    pub fn levels(&self, instrument: &str) -> Vec<String> {
        self.for_instrument(instrument)
            .map(|c| c.level.clone())
            .filter(|l| !l.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Class types for `instrument` in catalog order, one per lower-cased type.
    #[must_use]
    pub fn class_types(&self, instrument: &str) -> Vec<ClassType> {
        let mut types: Vec<ClassType> = Vec::new();
        for course in self.for_instrument(instrument) {
            let kind = course.class_type_key();
            if types.iter().any(|t| t.kind == kind) {
                continue;
            }
            types.push(ClassType {
                kind,
                label: course.title.clone(),
                price: course.effective_price(),
                course_id: course.id.clone(),
            });
        }
        types
    }

    #[must_use]
    pub fn class_type(&self, instrument: &str, kind: &str) -> Option<ClassType> {
        self.class_types(instrument).into_iter().find(|t| t.kind.eq_ignore_ascii_case(kind))
    }

    fn for_instrument<'a>(&'a self, instrument: &'a str) -> impl Iterator<Item = &'a Course> + 'a {
        self.courses.iter().filter(move |c| c.instrument == instrument)
    }
}

/// Instructor specialization: the API sends either one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Specialization {
    One(String),
    Many(Vec<String>),
}

impl Specialization {
    fn mentions(&self, instrument: &str) -> bool {
        let needle = instrument.to_lowercase();
        match self {
            Self::One(s) => s.to_lowercase().contains(&needle),
            Self::Many(list) => list.iter().any(|s| s.to_lowercase().contains(&needle)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub specialization: Option<Specialization>,
    #[serde(default)]
    pub teaching_categories: Option<Vec<String>>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Instrument and class type the student already picked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleFilter<'a> {
    pub instrument: Option<&'a str>,
    pub class_type: Option<&'a str>,
}

impl<'a> ScheduleFilter<'a> {
    #[must_use]
    pub fn new(instrument: Option<&'a str>, class_type: Option<&'a str>) -> Self {
        Self {
            instrument: instrument.filter(|s| !s.is_empty()),
            class_type: class_type.filter(|s| !s.is_empty()),
        }
    }

    fn instrument_ok(&self, specialization: Option<&Specialization>) -> bool {
        match self.instrument {
            Some(instrument) => specialization.is_some_and(|s| s.mentions(instrument)),
            None => true,
        }
    }

    fn lenient_instrument_ok(&self, specialization: Option<&[String]>) -> bool {
        match (self.instrument, specialization) {
            (Some(instrument), Some(list)) => {
                let needle = instrument.to_lowercase();
                list.iter().any(|s| s.to_lowercase().contains(&needle))
            },
            _ => true,
        }
    }

    /// Entities without categories are not excluded by class type.
    fn class_type_ok(&self, categories: Option<&[String]>) -> bool {
        match (self.class_type, categories) {
            (Some(kind), Some(categories)) => categories.iter().any(|c| c.eq_ignore_ascii_case(kind)),
            _ => true,
        }
    }
}

/// Instructors teaching the selected instrument and class type.
///
/// An instructor without any specialization never matches a selected instrument.
#[must_use]
pub fn matching_instructors<'i>(
    instructors: &'i [Instructor],
    filter: &ScheduleFilter<'_>,
) -> Vec<&'i Instructor> {
    instructors
        .iter()
        .filter(|i| filter.instrument_ok(i.specialization.as_ref()))
        .filter(|i| filter.class_type_ok(i.teaching_categories.as_deref()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Name used by the booking API.
    #[must_use]
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    /// Name shown to students.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Monday => "Senin",
            Self::Tuesday => "Selasa",
            Self::Wednesday => "Rabu",
            Self::Thursday => "Kamis",
            Self::Friday => "Jumat",
            Self::Saturday => "Sabtu",
            Self::Sunday => "Minggu",
        }
    }

    #[must_use]
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.display_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl Display for Weekday {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.display_name())
    }
}

impl FromStr for Weekday {
    type Err = CoreError;

    /// Accepts API names (`monday`) and display names (`Senin`), any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.api_name().eq_ignore_ascii_case(s))
            .or_else(|| Self::from_display_name(s))
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown day: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub schedule_id: String,
    pub instructor_id: String,
    #[serde(default)]
    pub instructor_name: String,
    #[serde(default)]
    pub instructor_specialization: Option<Vec<String>>,
    #[serde(default)]
    pub instructor_teaching_categories: Option<Vec<String>>,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub room_name: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
}

impl Slot {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == "available"
    }

    #[must_use]
    pub fn weekday(&self) -> Option<Weekday> {
        self.day_of_week.parse().ok()
    }

    /// `HH:MM - HH:MM`, seconds dropped.
    #[must_use]
    pub fn time_range(&self) -> String {
        format!("{} - {}", hh_mm(&self.start_time), hh_mm(&self.end_time))
    }

    #[must_use]
    pub fn room_label(&self) -> &str {
        if self.room_name.trim().is_empty() { DEFAULT_ROOM_NAME } else { &self.room_name }
    }
}

fn hh_mm(time: &str) -> &str {
    time.get(..5).unwrap_or(time)
}

/// Available slots, queried instructor → day → time → room.
#[derive(Debug, Clone, Default)]
pub struct SlotBoard {
    slots: Vec<Slot>,
}

impl SlotBoard {
    #[must_use]
    pub fn new(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    fn open_for<'a>(&'a self, instructor_id: &'a str) -> impl Iterator<Item = &'a Slot> + 'a {
        self.slots.iter().filter(move |s| s.instructor_id == instructor_id && s.is_available())
    }

    /// Days the instructor has an open slot, Monday first.
    #[must_use]
    pub fn days(&self, instructor_id: &str, filter: &ScheduleFilter<'_>) -> Vec<Weekday> {
        self.open_for(instructor_id)
            .filter(|s| filter.lenient_instrument_ok(s.instructor_specialization.as_deref()))
            .filter(|s| filter.class_type_ok(s.instructor_teaching_categories.as_deref()))
            .filter_map(|s| {
                let day = s.weekday();
                if day.is_none() {
                    tracing::debug!(slot = %s.schedule_id, day = %s.day_of_week, "unknown slot day");
                }
                day
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Time ranges open on `day`, sorted.
    #[must_use]
    pub fn times(&self, instructor_id: &str, day: Weekday) -> Vec<String> {
        self.open_for(instructor_id)
            .filter(|s| s.weekday() == Some(day))
            .map(Slot::time_range)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rooms open at `time_range` on `day`, sorted.
    #[must_use]
    pub fn rooms(&self, instructor_id: &str, day: Weekday, time_range: &str) -> Vec<String> {
        self.open_for(instructor_id)
            .filter(|s| s.weekday() == Some(day) && s.time_range() == time_range)
            .map(|s| s.room_label().to_owned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
