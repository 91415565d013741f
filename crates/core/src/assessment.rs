//! Assessment identity and analysis result types.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Opaque identifier of one submitted questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(String);

impl AssessmentId {
    /// Wraps a backend-issued id. Blank ids are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidInput("assessment id must not be empty".to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AssessmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl FromStr for AssessmentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A computed analysis for one assessment.
///
/// Always holds at least one key: an empty map means "not ready" and is never
/// represented by this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalysisResult(Map<String, Value>);

impl AnalysisResult {
    /// Accepts a JSON object with at least one key.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) if !map.is_empty() => Some(Self(map)),
            _ => None,
        }
    }

    /// Extracts the analysis from a backend `result` object.
    ///
    /// The nested `ai_analysis` object wins when it is present and not null;
    /// otherwise the `result` object itself is the analysis.
    #[must_use]
    pub fn from_result_object(result: Value) -> Option<Self> {
        let Value::Object(mut map) = result else {
            return None;
        };
        match map.remove("ai_analysis") {
            Some(Value::Null) | None => Self::from_value(Value::Object(map)),
            Some(nested) => Self::from_value(nested),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Typed view of the recommendation, if the analysis has that shape.
    #[must_use]
    pub fn recommendation(&self) -> Option<Recommendation> {
        serde_json::from_value(Value::Object(self.0.clone())).ok()
    }
}

impl<'de> Deserialize<'de> for AnalysisResult {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value)
            .ok_or_else(|| serde::de::Error::custom("analysis result must be a non-empty object"))
    }
}

/// Structured recommendation produced by the AI analysis backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendations: RecommendedCourse,
    pub analysis: RecommendationAnalysis,
    pub practical_advice: PracticalAdvice,
    #[serde(default)]
    pub ai_metadata: Option<AiMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedCourse {
    #[serde(default)]
    pub instruments: Vec<String>,
    pub skill_level: String,
    pub class_type: String,
    pub class_style: String,
    pub learning_path: String,
    pub estimated_budget: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationAnalysis {
    pub instrument_reasoning: String,
    pub skill_level_reasoning: String,
    pub class_type_reasoning: String,
    pub class_style_reasoning: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub potential_challenges: Vec<String>,
    #[serde(default)]
    pub success_factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticalAdvice {
    pub practice_routine: String,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMetadata {
    pub model: String,
    pub prompt_version: String,
    pub confidence_score: f64,
    pub processing_time_ms: u64,
}
