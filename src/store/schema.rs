use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::progress::UserProgress;

/// Version written by this build. Older records are migrated on load.
pub const SCHEMA_VERSION: u32 = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub schema_version: u32,
    #[serde(flatten)]
    pub progress: UserProgress,
}

impl ProgressRecord {
    pub fn new(progress: UserProgress) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            progress,
        }
    }
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self::new(UserProgress::default())
    }
}

pub const EXPORT_VERSION: u32 = 1;

/// Portable snapshot of one user's progress.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub typeladder_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub user_id: String,
    pub record: ProgressRecord,
}
