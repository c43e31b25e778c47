//! # zamat-tui
//!
//! Terminal controller for 9x9 zamat (Mauritanian draughts): board
//! selection, the 10-ply scripted forced opening, mandatory multi-jump
//! capture chains, and the "soufla" missed-longer-capture penalty.
//!
//! ## Architecture
//!
//! One authoritative state lives in the [`controller::Game`]: the board,
//! the overlay-bearing 2D painter, and the raised pseudo-3D mirror view.
//! The painter composites every overlay in a fixed layer order; the
//! mirror pull-syncs off a structural hash and redirects its pointer
//! input back through the one canonical click handler. Move legality,
//! capture classification, and penalty evaluation come from the
//! [`rules::Rules`] collaborator.
//!
//! ## Modules
//!
//! - [`types`] - Core types (cells, pieces, colors, render cells)
//! - [`coords`] - Index / (row,col) / view-space / surface transforms
//! - [`board`] - Board grid and full-state snapshots
//! - [`overlay`] - Transient visual annotation store
//! - [`renderer`] - Frame buffer, draw primitives, painter, terminal diff
//! - [`mirror`] - Raised view kept consistent by hash polling
//! - [`opening`] - Scripted forced-opening tables
//! - [`rules`] - Rules-engine and automated-opponent seams
//! - [`controller`] - Turn/input state machine
//! - [`soufla`] - Penalty offender-targeting and remedy picker
//! - [`persist`] - Save payloads

pub mod board;
pub mod controller;
pub mod coords;
pub mod mirror;
pub mod opening;
pub mod overlay;
pub mod persist;
pub mod renderer;
pub mod rules;
pub mod soufla;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use board::{cell_name, Board, Snapshot};
pub use controller::{
    ChainState, ClickOutcome, Game, GameOptions, Notice, OpeningState, Phase,
};
pub use coords::{
    cell_at, cell_center, from_view_rc, index_to_rc, inside, rc_to_index, to_view_rc,
    Orientation,
};
pub use mirror::{structural_hash, Mirror, MirrorError};
pub use opening::{mover_for_ply, table, OpeningStep, OPENING_PLIES};
pub use overlay::{CrownPulse, IgnoredSegment, MovePath, OverlayState, PathFlash, FLASH_TTL};
pub use persist::{decode, encode, PersistError, SaveData, Settings, SAVE_VERSION};
pub use renderer::{DiffPresenter, FrameBuffer, Painter, PreviewPayload, ViewMode};
pub use rules::{
    OpponentDriver, PenaltyDecision, PenaltyOption, PendingPenalty, Rules, TurnReport,
};
pub use soufla::{
    force_candidates, remove_target, resolve_offender, ForceCandidate, Picker, PickerAction,
    PickerState,
};
