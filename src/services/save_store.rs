//! Save Store
//!
//! Opaque 9-character codes mapping to snapshot bundles with named preset
//! slots. Records are cached in memory and written through the document
//! store; lookups are case-insensitive, storage is uppercase.

use crate::services::DocumentStore;
use crate::types::{
    PresetSlot, SaveRecord, SaveRecordSummary, SessionSnapshot, SAVE_CODE_ALPHABET, SAVE_CODE_LEN,
};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

const COLLECTION: &str = "saves";

/// Attempts before code generation gives up.
const MAX_CODE_ATTEMPTS: usize = 100;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Save code not found: {0}")]
    CodeNotFound(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Preset name must be 1..64 characters")]
    InvalidPresetName,

    #[error("Could not allocate a unique save code")]
    CollisionExhausted,
}

impl SaveError {
    pub fn code(&self) -> &'static str {
        match self {
            SaveError::CodeNotFound(_) => "SAVE_CODE_NOT_FOUND",
            SaveError::PresetNotFound(_) => "PRESET_NOT_FOUND",
            SaveError::InvalidPresetName => "INVALID_PRESET_NAME",
            SaveError::CollisionExhausted => "COLLISION_EXHAUSTED",
        }
    }
}

/// Snapshot persistence under opaque codes.
pub struct SaveStore {
    records: DashMap<String, SaveRecord>,
    store: Arc<dyn DocumentStore>,
}

impl SaveStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let saves = Self {
            records: DashMap::new(),
            store,
        };
        saves.load_persisted();
        saves
    }

    fn load_persisted(&self) {
        let mut loaded = 0usize;
        for key in self.store.keys(COLLECTION) {
            if let Some(value) = self.store.get(COLLECTION, &key) {
                match serde_json::from_str::<SaveRecord>(&value) {
                    Ok(record) => {
                        self.records.insert(record.code.clone(), record);
                        loaded += 1;
                    }
                    Err(e) => warn!("Skipping unreadable save record {}: {}", key, e),
                }
            }
        }
        if loaded > 0 {
            info!("Loaded {} save records", loaded);
        }
    }

    fn persist(&self, record: &SaveRecord) {
        if let Ok(json) = serde_json::to_string(record) {
            self.store.put(COLLECTION, &record.code, json);
        }
    }

    /// Allocate a fresh 9-character code. Retries on collision, then fails.
    pub fn create_code(&self) -> Result<String, SaveError> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code: String = (0..SAVE_CODE_LEN)
                .map(|_| SAVE_CODE_ALPHABET[rng.gen_range(0..SAVE_CODE_ALPHABET.len())] as char)
                .collect();
            if self.records.contains_key(&code) {
                continue;
            }
            let now = crate::types::timestamp::now();
            let record = SaveRecord {
                code: code.clone(),
                created_at: now,
                updated_at: now,
                active_preset: None,
                presets: Default::default(),
            };
            self.persist(&record);
            self.records.insert(code.clone(), record);
            info!(%code, "save code created");
            return Ok(code);
        }
        Err(SaveError::CollisionExhausted)
    }

    /// Upsert a preset slot and make it the active preset.
    pub fn put(
        &self,
        code: &str,
        preset: &str,
        snapshot: SessionSnapshot,
    ) -> Result<(), SaveError> {
        let preset = preset.trim();
        if preset.is_empty() || preset.len() > 64 {
            return Err(SaveError::InvalidPresetName);
        }
        let code = normalize_code(code);
        let mut record = self
            .records
            .get_mut(&code)
            .ok_or_else(|| SaveError::CodeNotFound(code.clone()))?;

        let now = crate::types::timestamp::now();
        let slot = record
            .presets
            .entry(preset.to_string())
            .or_insert_with(|| PresetSlot {
                snapshot: snapshot.clone(),
                created_at: now,
                updated_at: now,
            });
        slot.snapshot = snapshot;
        slot.updated_at = now;
        record.active_preset = Some(preset.to_string());
        record.updated_at = now;

        let persisted = record.clone();
        drop(record);
        self.persist(&persisted);
        Ok(())
    }

    /// Full record metadata: preset names and timestamps, no snapshot bodies.
    pub fn get(&self, code: &str) -> Result<SaveRecordSummary, SaveError> {
        let code = normalize_code(code);
        self.records
            .get(&code)
            .map(|r| SaveRecordSummary::from(&*r))
            .ok_or(SaveError::CodeNotFound(code))
    }

    /// One preset's snapshot body.
    pub fn get_preset(&self, code: &str, preset: &str) -> Result<SessionSnapshot, SaveError> {
        let code = normalize_code(code);
        let record = self
            .records
            .get(&code)
            .ok_or_else(|| SaveError::CodeNotFound(code.clone()))?;
        record
            .presets
            .get(preset)
            .map(|slot| slot.snapshot.clone())
            .ok_or_else(|| SaveError::PresetNotFound(preset.to_string()))
    }

    /// Delete a preset. If it was active, the lexicographically smallest
    /// remaining preset becomes active, or none.
    pub fn delete_preset(&self, code: &str, preset: &str) -> Result<(), SaveError> {
        let code = normalize_code(code);
        let mut record = self
            .records
            .get_mut(&code)
            .ok_or_else(|| SaveError::CodeNotFound(code.clone()))?;

        if record.presets.remove(preset).is_none() {
            return Err(SaveError::PresetNotFound(preset.to_string()));
        }
        if record.active_preset.as_deref() == Some(preset) {
            record.active_preset = record.presets.keys().next().cloned();
        }
        record.updated_at = crate::types::timestamp::now();

        let persisted = record.clone();
        drop(record);
        self.persist(&persisted);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    fn store() -> SaveStore {
        SaveStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_code_shape() {
        let saves = store();
        let code = saves.create_code().unwrap();
        assert_eq!(code.len(), SAVE_CODE_LEN);
        assert!(code
            .bytes()
            .all(|b| SAVE_CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_codes_are_unique() {
        let saves = store();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            assert!(seen.insert(saves.create_code().unwrap()));
        }
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let saves = store();
        let code = saves.create_code().unwrap();
        assert!(saves.get(&code.to_lowercase()).is_ok());
    }
}
