//! Save & Snapshot Types
//!
//! The closed snapshot schema persisted under save codes. Unknown fields are
//! rejected on load so drifted documents fail fast instead of silently
//! losing state.

use crate::types::{DailyStat, ModeState, Portfolio, SessionConfig, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length of a save code.
pub const SAVE_CODE_LEN: usize = 9;

/// Alphabet save codes are drawn from.
pub const SAVE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Per-symbol simulation state inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct StockSnapshot {
    pub price: f64,
    pub prev_delta: f64,
}

/// The complete, self-contained state of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub config: SessionConfig,
    pub simulator: SimulatorSnapshot,
}

/// Simulator body of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SimulatorSnapshot {
    pub config: SessionConfig,
    pub portfolio: Portfolio,
    pub stocks: BTreeMap<String, StockSnapshot>,
    pub price_history: BTreeMap<String, Vec<f64>>,
    /// Simulated clock position, ISO-8601 UTC
    #[serde(with = "crate::types::timestamp")]
    pub simulated_time: DateTime<Utc>,
    pub trades: Vec<Trade>,
    pub mode_state: ModeState,
    /// Simulated date the session started at
    #[serde(with = "crate::types::timestamp")]
    pub start_time: DateTime<Utc>,
    pub initial_capital: f64,
    pub daily_stats: Vec<DailyStat>,
}

/// A named slot holding one snapshot within a save record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetSlot {
    pub snapshot: SessionSnapshot,
    #[serde(with = "crate::types::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::types::timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Everything stored under one save code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub code: String,
    #[serde(with = "crate::types::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::types::timestamp")]
    pub updated_at: DateTime<Utc>,
    pub active_preset: Option<String>,
    pub presets: BTreeMap<String, PresetSlot>,
}

/// Preset metadata without the snapshot body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetMeta {
    #[serde(with = "crate::types::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::types::timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Listing view of a save record: preset names and timestamps only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecordSummary {
    pub code: String,
    #[serde(with = "crate::types::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::types::timestamp")]
    pub updated_at: DateTime<Utc>,
    pub active_preset: Option<String>,
    pub presets: BTreeMap<String, PresetMeta>,
}

impl From<&SaveRecord> for SaveRecordSummary {
    fn from(record: &SaveRecord) -> Self {
        Self {
            code: record.code.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            active_preset: record.active_preset.clone(),
            presets: record
                .presets
                .iter()
                .map(|(name, slot)| {
                    (
                        name.clone(),
                        PresetMeta {
                            created_at: slot.created_at,
                            updated_at: slot.updated_at,
                        },
                    )
                })
                .collect(),
        }
    }
}
