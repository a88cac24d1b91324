use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::engine::progress::{ProgressPatch, UserProgress};
use crate::error::StoreError;
use crate::store::migrate;
use crate::store::repository::ProgressRepository;
use crate::store::schema::{EXPORT_VERSION, ExportData, ProgressRecord};

/// One JSON document per user under `<base_dir>/users/`.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self, StoreError> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typeladder");
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(base_dir.join("users"))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn user_path(&self, user_id: &str) -> PathBuf {
        self.base_dir
            .join("users")
            .join(format!("{}.json", sanitize_key(user_id)))
    }

    fn write_atomic(path: &Path, json: &str) -> Result<(), StoreError> {
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Replace the stored progress wholesale, writing the current schema.
    pub fn save_progress(&self, user_id: &str, progress: &UserProgress) -> Result<(), StoreError> {
        let record = ProgressRecord::new(progress.clone());
        let json = serde_json::to_string_pretty(&record)?;
        Self::write_atomic(&self.user_path(user_id), &json)?;
        debug!(user_id, "progress saved");
        Ok(())
    }

    pub fn export_user(&self, user_id: &str) -> Result<ExportData, StoreError> {
        let progress = self.load(user_id)?;
        Ok(ExportData {
            typeladder_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            user_id: user_id.to_string(),
            record: ProgressRecord::new(progress),
        })
    }

    /// Replace `user_id`'s progress with an exported snapshot, which may come
    /// from another user. The snapshot's record goes through the same
    /// migration as a file on disk.
    pub fn import_user(&self, user_id: &str, data: &ExportData) -> Result<(), StoreError> {
        if data.typeladder_export_version != EXPORT_VERSION {
            return Err(StoreError::UnsupportedExportVersion {
                found: data.typeladder_export_version,
                expected: EXPORT_VERSION,
            });
        }
        let progress = migrate::migrate(serde_json::to_value(&data.record)?)?;
        self.save_progress(user_id, &progress)?;
        info!(user_id, from = %data.user_id, tests = progress.total_tests, "progress imported");
        Ok(())
    }
}

impl ProgressRepository for JsonStore {
    fn load(&self, user_id: &str) -> Result<UserProgress, StoreError> {
        let path = self.user_path(user_id);
        if !path.exists() {
            return Ok(UserProgress::default());
        }
        let content = fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        migrate::migrate(value)
    }

    fn save(&mut self, user_id: &str, patch: &ProgressPatch) -> Result<(), StoreError> {
        let progress = self.load(user_id)?.applied(patch);
        self.save_progress(user_id, &progress)
    }
}

/// File stem for a user id. ASCII letters, digits, `-` and `_` pass through;
/// every other byte is percent-escaped, so distinct ids never share a file.
fn sanitize_key(key: &str) -> String {
    if key.is_empty() {
        return "%".to_string();
    }
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::SCHEMA_VERSION;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_user_is_fresh() {
        let (_dir, store) = make_test_store();
        assert_eq!(store.load("new").unwrap(), UserProgress::default());
    }

    #[test]
    fn test_save_patch_then_load() {
        let (_dir, mut store) = make_test_store();
        let patch = ProgressPatch {
            best_wpm: Some(42),
            coins: Some(10),
            ..ProgressPatch::default()
        };
        store.save("ada", &patch).unwrap();
        let loaded = store.load("ada").unwrap();
        assert_eq!(loaded.best_wpm, 42);
        assert_eq!(loaded.coins, 10);

        let raw = fs::read_to_string(store.user_path("ada")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schema_version"], SCHEMA_VERSION);
    }

    #[test]
    fn test_legacy_file_is_migrated_on_load() {
        let (_dir, store) = make_test_store();
        fs::write(
            store.user_path("old"),
            r#"{"bestWpm": 33, "streak": 2, "lastTestDate": "2024-02-01", "password": "x"}"#,
        )
        .unwrap();
        let loaded = store.load("old").unwrap();
        assert_eq!(loaded.best_wpm, 33);
        assert_eq!(loaded.streak, 2);
    }

    #[test]
    fn test_no_tmp_files_left_behind() {
        let (_dir, mut store) = make_test_store();
        store.save("ada", &ProgressPatch::default()).unwrap();
        let tmp_files: Vec<_> = fs::read_dir(store.base_dir().join("users"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }

    #[test]
    fn test_round_trip_export_import() {
        let (_dir, mut store) = make_test_store();
        store
            .save(
                "ada",
                &ProgressPatch {
                    best_wpm: Some(61),
                    streak: Some(4),
                    ..ProgressPatch::default()
                },
            )
            .unwrap();
        let export = store.export_user("ada").unwrap();
        assert_eq!(export.typeladder_export_version, EXPORT_VERSION);

        let (_dir2, store2) = make_test_store();
        store2.import_user(&export.user_id, &export).unwrap();
        let imported = store2.load("ada").unwrap();
        assert_eq!(imported.best_wpm, 61);
        assert_eq!(imported.streak, 4);
    }

    #[test]
    fn test_import_into_another_user() {
        let (_dir, mut store) = make_test_store();
        store
            .save(
                "ada",
                &ProgressPatch {
                    coins: Some(12),
                    ..ProgressPatch::default()
                },
            )
            .unwrap();
        let export = store.export_user("ada").unwrap();
        store.import_user("grace", &export).unwrap();
        assert_eq!(store.load("grace").unwrap().coins, 12);
        assert_eq!(store.load("ada").unwrap().coins, 12);
    }

    #[test]
    fn test_export_version_rejection() {
        let (_dir, store) = make_test_store();
        let mut export = store.export_user("ada").unwrap();
        export.typeladder_export_version = 99;
        let err = store.import_user("ada", &export).unwrap_err().to_string();
        assert!(err.contains("Unsupported export version"));
        assert!(err.contains("99"));
    }

    #[test]
    fn test_user_ids_are_sanitized() {
        let (_dir, store) = make_test_store();
        let path = store.user_path("../etc/passwd");
        assert_eq!(path.parent(), Some(store.base_dir().join("users").as_path()));
        assert_eq!(sanitize_key(""), "%");
        assert_eq!(sanitize_key("ada-lovelace_1"), "ada-lovelace_1");
        assert_eq!(sanitize_key("a.b"), "a%2Eb");
    }

    #[test]
    fn test_similar_user_ids_keep_separate_progress() {
        let (_dir, mut store) = make_test_store();
        let patch = ProgressPatch {
            coins: Some(7),
            ..ProgressPatch::default()
        };
        store.save("a.b", &patch).unwrap();
        assert_eq!(store.load("a.b").unwrap().coins, 7);
        assert_eq!(store.load("a_b").unwrap(), UserProgress::default());
        assert_ne!(store.user_path("a.b"), store.user_path("a_b"));
        assert_ne!(store.user_path("a%2Eb"), store.user_path("a.b"));
    }
}
