use std::collections::HashMap;

use crate::engine::progress::{ProgressPatch, UserProgress};
use crate::error::StoreError;

/// Storage seam for user progress. Unknown users load as fresh progress.
pub trait ProgressRepository {
    fn load(&self, user_id: &str) -> Result<UserProgress, StoreError>;
    fn save(&mut self, user_id: &str, patch: &ProgressPatch) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: HashMap<String, UserProgress>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user_id: &str, progress: UserProgress) {
        self.users.insert(user_id.to_string(), progress);
    }
}

impl ProgressRepository for MemoryStore {
    fn load(&self, user_id: &str) -> Result<UserProgress, StoreError> {
        Ok(self.users.get(user_id).cloned().unwrap_or_default())
    }

    fn save(&mut self, user_id: &str, patch: &ProgressPatch) -> Result<(), StoreError> {
        self.users
            .entry(user_id.to_string())
            .or_default()
            .apply(patch);
        Ok(())
    }
}
