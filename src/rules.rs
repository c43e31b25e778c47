//! External collaborator seams.
//!
//! The controller consumes the rules engine and the automated opponent
//! through these traits; it never computes legality, capture
//! classification, or longest-chain lengths itself. Tests drive the
//! controller with scripted stub implementations.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Snapshot};
use crate::types::{CellIdx, Side};

// =============================================================================
// Rules engine
// =============================================================================

/// What the controller reports to the rules engine when a turn ends, so the
/// engine can evaluate whether a longer capture chain was ignored.
#[derive(Debug)]
pub struct TurnReport<'a> {
    pub mover: Side,
    /// Where the chain started, if the turn contained captures.
    pub started_from: Option<CellIdx>,
    /// Captures actually performed this turn.
    pub captures_done: u32,
    /// Board state at the start of the turn (penalty rollback target).
    pub turn_start: &'a Snapshot,
    pub last_moved_from: Option<CellIdx>,
    pub last_moved_to: Option<CellIdx>,
    /// Chain origin and ordered landing cells of the applied move.
    pub last_move_from: Option<CellIdx>,
    pub last_move_path: Option<&'a [CellIdx]>,
}

/// The move-legality / capture-classification collaborator.
pub trait Rules {
    /// Whether `from -> to` is a legal action for `mover` on `board`.
    fn is_legal(&self, board: &Board, mover: Side, from: CellIdx, to: CellIdx) -> bool;

    /// `Some(jumped_index)` when `from -> to` is a capture, else `None`.
    fn classify_capture(&self, board: &Board, from: CellIdx, to: CellIdx) -> Option<CellIdx>;

    /// Whether the piece on `from` has at least one further capture.
    fn has_deeper_capture(&self, board: &Board, from: CellIdx) -> bool;

    /// Whether the piece on `idx` promotes to king where it stands.
    fn promotes(&self, board: &Board, idx: CellIdx) -> bool;

    /// Finish-turn evaluation: may produce a pending penalty when the
    /// mover's chain was shorter than the longest available at turn start.
    fn finish_turn(&self, board: &Board, report: &TurnReport<'_>) -> Option<PendingPenalty>;
}

// =============================================================================
// Pending penalty descriptor
// =============================================================================

/// One remedy the penalizer may pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyOption {
    /// Eliminate the offending piece.
    Remove { offender: CellIdx },
    /// Revert to the turn-start snapshot and replay `path` as the
    /// offender's mandatory move. `jumps` lists the jumped cell per hop.
    Force {
        offender: CellIdx,
        path: Vec<CellIdx>,
        jumps: Vec<CellIdx>,
    },
}

impl PenaltyOption {
    pub fn offender(&self) -> CellIdx {
        match self {
            PenaltyOption::Remove { offender } => *offender,
            PenaltyOption::Force { offender, .. } => *offender,
        }
    }
}

/// Everything the soufla picker needs to resolve a pending penalty.
///
/// Exists only while input is in the awaiting-penalty state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPenalty {
    /// Pieces that had access to a longer chain than the one played.
    pub offenders: Vec<CellIdx>,
    /// Longest chain length available anywhere at turn start.
    pub longest_global: u32,
    /// Where the played chain started, if any.
    pub started_from: Option<CellIdx>,
    /// Where the played chain ended (the offender may have relocated here).
    pub last_piece_idx: Option<CellIdx>,
    /// All remedies, `Remove` and `Force` mixed, per offender.
    pub options: Vec<PenaltyOption>,
    /// Rollback target for `Force` commits.
    pub turn_start_snapshot: Snapshot,
    /// The applied move, for the undo arrow shown on force replay.
    pub last_move_from: Option<CellIdx>,
    pub last_move_path: Option<Vec<CellIdx>>,
    /// The side that gets to pick the remedy.
    pub penalizer: Side,
}

/// A committed remedy choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyDecision {
    Remove {
        offender: CellIdx,
    },
    Force {
        offender: CellIdx,
        path: Vec<CellIdx>,
        jumps: Vec<CellIdx>,
    },
}

// =============================================================================
// Automated opponent
// =============================================================================

/// The automated-opponent collaborator.
pub trait OpponentDriver {
    /// Ask the opponent to pick and play a move soon. Invoked only when it
    /// is the automated side's turn, the game is not over, no penalty is
    /// pending, and the forced opening is inactive.
    fn schedule_move(&mut self);

    /// Pick a remedy when the automated side is the penalizer. The default
    /// falls back to the first remove option.
    fn choose_penalty(&mut self, pending: &PendingPenalty) -> Option<PenaltyDecision> {
        pending.options.iter().find_map(|o| match o {
            PenaltyOption::Remove { offender } => {
                Some(PenaltyDecision::Remove { offender: *offender })
            }
            PenaltyOption::Force { .. } => None,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
