//! AI recommendation questionnaire: answers, section validation and the
//! submission payload.
//!
//! Answers are stored as codes; the payload carries the human labels the
//! backend prompt is written against.

use serde::{Deserialize, Serialize};

use crate::constants::QUESTIONNAIRE_SECTIONS;
use crate::error::CoreError;

/// Instruments offered in the questionnaire.
pub const INSTRUMENTS: &[&str] =
    &["Piano", "Keyboard", "Gitar", "Bass", "Drum", "Vokal", "Saxophone", "Biola"];

/// Genres a student can pick (any number, including none).
pub const GENRES: &[&str] = &["Pop", "Rock", "Jazz", "R&B", "Worship", "Klasik", "Lainnya"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    BeginnerZero,
    Basic,
    Fundamental,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BeginnerZero => "Belum pernah belajar sama sekali (pemula 0)",
            Self::Basic => "Bisa dasar saja",
            Self::Fundamental => "Sudah ada fundamental dan bisa memainkan beberapa lagu",
            Self::Intermediate => "Level menengah",
            Self::Advanced => "Level mahir",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LearningGoal {
    FromScratch,
    SpecificGenre,
    ChurchMinistry,
    Hobby,
    Professional,
}

impl LearningGoal {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FromScratch => "Saya ingin belajar dari dasar / pemula",
            Self::SpecificGenre => {
                "Saya ingin belajar genre atau gaya tertentu (jazz, pop, rock, worship, dll.)"
            },
            Self::ChurchMinistry => "Saya ingin meningkatkan kemampuan untuk pelayanan di gereja",
            Self::Hobby => "Saya ingin mengembangkan skill untuk hobi",
            Self::Professional => "Saya ingin upgrade skill untuk kebutuhan pekerjaan / event",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePreference {
    Fixed,
    Flexible,
    Unsure,
}

impl SchedulePreference {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fixed => "Saya bisa mengikuti jadwal tetap setiap minggu (Kelas Siswa)",
            Self::Flexible => {
                "Saya butuh jadwal fleksibel karena kerja/aktifitas padat (Kelas Karyawan)"
            },
            Self::Unsure => "Tidak yakin, ingin rekomendasi",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    Reguler,
    Hobby,
    Ministry,
    Unsure,
}

impl LearningStyle {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reguler => "Mengikuti buku dan kurikulum bertingkat (Kelas Reguler)",
            Self::Hobby => "Belajar genre/lagu sesuai minat tanpa buku (Kelas Hobby)",
            Self::Ministry => "Fokus untuk pelayanan gereja (Kelas Ministry)",
            Self::Unsure => "Belum tahu, minta rekomendasi",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourseDuration {
    Short,
    Medium,
    Long,
}

impl CourseDuration {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Short => "Jangka pendek (1–3 bulan)",
            Self::Medium => "Menengah (3–6 bulan)",
            Self::Long => "Jangka panjang (lebih dari 6 bulan)",
        }
    }
}

/// Monthly budget bracket. Codes are the rupiah amounts the site submits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Budget {
    #[serde(rename = "300000")]
    Rp300k,
    #[serde(rename = "400000")]
    Rp400k,
    #[serde(rename = "500000")]
    Rp500k,
    #[serde(rename = "flexible")]
    Flexible,
}

impl Budget {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rp300k => "Rp 300.000",
            Self::Rp400k => "Rp 400.000",
            Self::Rp500k => "Rp 500.000",
            Self::Flexible => "Tidak masalah, utamakan rekomendasi terbaik",
        }
    }
}

/// Answers collected by the recommendation questionnaire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Questionnaire {
    pub age: Option<u32>,
    pub instrument: String,
    pub skill_level: Option<SkillLevel>,
    pub learning_goal: Option<LearningGoal>,
    pub schedule_preference: Option<SchedulePreference>,
    pub flexibility_needed: Option<bool>,
    pub learning_style: Option<LearningStyle>,
    pub genre_interest: Vec<String>,
    pub duration: Option<CourseDuration>,
    pub budget: Option<Budget>,
    pub previous_experience: Option<bool>,
}

impl Questionnaire {
    /// Whether `section` (1-based) has a usable answer.
    ///
    /// Genres are optional; section numbers outside the questionnaire never validate.
    #[must_use]
    pub fn is_section_complete(&self, section: u8) -> bool {
        self.check_section(section).is_ok()
    }

    pub fn check_section(&self, section: u8) -> Result<(), CoreError> {
        let missing = |reason| Err(CoreError::IncompleteSection { section, reason });
        match section {
            1 if !self.age.is_some_and(|age| age > 0) => missing("age must be greater than zero"),
            2 if self.instrument.trim().is_empty() => missing("instrument is required"),
            3 if self.skill_level.is_none() => missing("skill level is required"),
            4 if self.learning_goal.is_none() => missing("learning goal is required"),
            5 if self.schedule_preference.is_none() => missing("schedule preference is required"),
            6 if self.flexibility_needed.is_none() => missing("flexibility answer is required"),
            7 if self.learning_style.is_none() => missing("learning style is required"),
            9 if self.duration.is_none() => missing("duration is required"),
            10 if self.budget.is_none() => missing("budget is required"),
            11 if self.previous_experience.is_none() => {
                missing("previous experience answer is required")
            },
            1..=11 => Ok(()),
            _ => missing("no such section"),
        }
    }

    /// Adds the genre if absent, removes it if present.
    pub fn toggle_genre(&mut self, genre: &str) {
        if let Some(pos) = self.genre_interest.iter().position(|g| g == genre) {
            self.genre_interest.remove(pos);
        } else {
            self.genre_interest.push(genre.to_owned());
        }
    }

    /// Builds the submission payload, failing on the first incomplete section.
    pub fn to_payload(&self) -> Result<AssessmentPayload, CoreError> {
        for section in 1..=QUESTIONNAIRE_SECTIONS {
            self.check_section(section)?;
        }
        let incomplete = |section| CoreError::IncompleteSection { section, reason: "unanswered" };

        let flexibility_needed = if self.flexibility_needed.ok_or_else(|| incomplete(6))? {
            "Ya, saya butuh fleksibilitas"
        } else {
            "Tidak, jadwal tetap tidak masalah"
        };
        let previous_experience =
            if self.previous_experience.ok_or_else(|| incomplete(11))? { "Ya" } else { "Tidak" };

        Ok(AssessmentPayload {
            assessment_data: AssessmentData {
                age: self.age.ok_or_else(|| incomplete(1))?,
                instruments: vec![self.instrument.trim().to_owned()],
                experience_level: self.skill_level.ok_or_else(|| incomplete(3))?.label().to_owned(),
                learning_goals: vec![
                    self.learning_goal.ok_or_else(|| incomplete(4))?.label().to_owned(),
                ],
                schedule_preference: self
                    .schedule_preference
                    .ok_or_else(|| incomplete(5))?
                    .label()
                    .to_owned(),
                flexibility_needed: flexibility_needed.to_owned(),
                learning_style: self.learning_style.ok_or_else(|| incomplete(7))?.label().to_owned(),
                preferred_genres: self.genre_interest.clone(),
                duration: self.duration.ok_or_else(|| incomplete(9))?.label().to_owned(),
                budget: self.budget.ok_or_else(|| incomplete(10))?.label().to_owned(),
                previous_experience: previous_experience.to_owned(),
            },
        })
    }
}

/// Position in the questionnaire. `QUESTIONNAIRE_SECTIONS + 1` is the result view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionCursor(u8);

impl Default for SectionCursor {
    fn default() -> Self {
        Self(1)
    }
}

impl SectionCursor {
    pub const RESULT_VIEW: u8 = QUESTIONNAIRE_SECTIONS + 1;

    #[must_use]
    pub const fn current(self) -> u8 {
        self.0
    }

    /// Moves forward only when the current section is complete.
    pub fn next(&mut self, answers: &Questionnaire) -> Result<u8, CoreError> {
        answers.check_section(self.0)?;
        self.0 = (self.0 + 1).min(Self::RESULT_VIEW);
        Ok(self.0)
    }

    pub fn prev(&mut self) -> u8 {
        self.0 = self.0.saturating_sub(1).max(1);
        self.0
    }

    pub fn show_result(&mut self) {
        self.0 = Self::RESULT_VIEW;
    }
}

/// Body of `POST /api/assessment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentPayload {
    pub assessment_data: AssessmentData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentData {
    pub age: u32,
    pub instruments: Vec<String>,
    pub experience_level: String,
    pub learning_goals: Vec<String>,
    pub schedule_preference: String,
    pub flexibility_needed: String,
    pub learning_style: String,
    pub preferred_genres: Vec<String>,
    pub duration: String,
    pub budget: String,
    pub previous_experience: String,
}
