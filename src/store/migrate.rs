//! Upgrades persisted progress records to the current schema.
//!
//! Schema history:
//! - v1: browser-era record, camelCase, `bestWpm` and `testHistory` only.
//! - v2: adds `streak` and `lastTestDate`.
//! - v3: snake_case with an explicit `schema_version`, adds `completed_tasks`,
//!   `coins`, `best_streak` and `total_tests`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::engine::progress::{self, HistoryEntry, UserProgress};
use crate::error::StoreError;
use crate::store::schema::{ProgressRecord, SCHEMA_VERSION};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyRecord {
    best_wpm: Option<u32>,
    streak: Option<u32>,
    last_test_date: Option<String>,
    test_history: Option<Vec<HistoryEntry>>,
    completed_tasks: Option<Vec<u32>>,
    coins: Option<u32>,
}

pub fn detect_version(value: &Value) -> Result<u32, StoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::InvalidRecord("expected a JSON object".to_string()))?;
    match obj.get("schema_version") {
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| StoreError::InvalidRecord("schema_version is not a number".to_string())),
        None if obj.contains_key("streak") || obj.contains_key("lastTestDate") => Ok(2),
        None => Ok(1),
    }
}

/// Turn any known record shape into current [`UserProgress`].
pub fn migrate(value: Value) -> Result<UserProgress, StoreError> {
    let version = detect_version(&value)?;
    if version > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }
    if version == SCHEMA_VERSION {
        let record: ProgressRecord = serde_json::from_value(value)?;
        return Ok(record.progress);
    }

    warn!(from = version, to = SCHEMA_VERSION, "migrating legacy progress record");
    let legacy: LegacyRecord = serde_json::from_value(value)?;
    Ok(from_legacy(legacy, version))
}

fn from_legacy(legacy: LegacyRecord, version: u32) -> UserProgress {
    let test_history = legacy.test_history.unwrap_or_default();
    let total_tests = u32::try_from(test_history.len()).unwrap_or(u32::MAX);

    // v1 predates streak tracking, so derive it from history.
    let (streak, best_streak, last_test_date) = if version < 2 {
        let rebuilt = progress::rebuild_from_history(&test_history);
        (rebuilt.streak, rebuilt.best_streak, rebuilt.last_test_date)
    } else {
        let streak = legacy.streak.unwrap_or(0);
        (
            streak,
            streak,
            legacy.last_test_date.as_deref().and_then(parse_legacy_date),
        )
    };

    UserProgress {
        best_wpm: legacy.best_wpm.unwrap_or(0),
        streak,
        best_streak,
        last_test_date,
        test_history,
        total_tests,
        completed_tasks: legacy.completed_tasks.unwrap_or_default().into_iter().collect(),
        coins: legacy.coins.unwrap_or(0),
    }
}

fn parse_legacy_date(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    match raw.parse::<DateTime<Utc>>() {
        Ok(ts) => Some(ts.date_naive()),
        Err(_) => {
            warn!(raw, "unreadable lastTestDate dropped during migration");
            None
        }
    }
}
