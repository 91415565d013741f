//! Local registration draft: the form, picked schedules and the final
//! booking, kept between invocations.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shema_core::{RegistrationForm, ScheduleSelection, env_string};

const DRAFT_FILE: &str = "draft.json";

/// What was submitted, for display after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FinalRegistration {
    pub booking_id: String,
    pub payment_method: String,
    pub proof_url: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Draft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<RegistrationForm>,
    #[serde(default)]
    pub schedules: ScheduleSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<FinalRegistration>,
}

#[derive(Debug, Clone)]
pub(crate) struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    pub(crate) fn new(dir: &Path) -> Self {
        Self { path: dir.join(DRAFT_FILE) }
    }

    /// `SHEMA_DRAFT_DIR`, else `<data dir>/shema`.
    pub(crate) fn from_env() -> Self {
        let dir = env_string("SHEMA_DRAFT_DIR").map_or_else(
            || dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("shema"),
            PathBuf::from,
        );
        Self::new(&dir)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means an empty draft.
    pub(crate) fn load(&self) -> Result<Draft> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("corrupt draft file {}", self.path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Draft::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    /// Writes through a temporary file so a crash never leaves half a draft.
    pub(crate) fn save(&self, draft: &Draft) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(draft)?)
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    /// Returns whether there was anything to remove.
    pub(crate) fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}
