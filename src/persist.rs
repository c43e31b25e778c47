//! Save payloads.
//!
//! A save captures the full resumable state: the current snapshot, the
//! scripted-sequence identity (which side's table the opening used),
//! settings, the undo history, and the elapsed chain timer. Overlay
//! state is never persisted; it is rebuilt from the snapshot on load.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::Snapshot;
use crate::types::Side;

/// Current payload format version.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize save payload: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to parse save payload: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("unsupported save version {0}")]
    Version(u32),
}

/// Player-facing settings that survive a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub local_side: Side,
    pub automated: Option<Side>,
    pub forced_opening: bool,
    pub show_coords: bool,
}

/// Everything needed to resume a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub snapshot: Snapshot,
    /// Which side's opening table the game is scripted from.
    pub opening_base: Side,
    pub settings: Settings,
    pub history: Vec<Snapshot>,
    /// Elapsed milliseconds on the chain timer at save time.
    pub chain_timer_ms: u64,
}

/// Serialize a save payload to JSON.
pub fn encode(save: &SaveData) -> Result<String, PersistError> {
    serde_json::to_string(save).map_err(PersistError::Serialize)
}

/// Parse and version-check a JSON save payload.
pub fn decode(raw: &str) -> Result<SaveData, PersistError> {
    let save: SaveData = serde_json::from_str(raw).map_err(PersistError::Parse)?;
    if save.version != SAVE_VERSION {
        return Err(PersistError::Version(save.version));
    }
    Ok(save)
}

// =============================================================================
// Tests
// =============================================================================
