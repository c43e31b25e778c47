//! Soufla remedy picker.
//!
//! When a turn ends with a pending penalty, the penalizer resolves it
//! through this tagged-state machine: pick an offending piece, then pick
//! a remedy (remove the offender, or force it along one of its longest
//! chains). The picker never mutates game state itself; it turns clicks
//! into [`PickerAction`] values the controller commits.

use tracing::debug;

use crate::renderer::PreviewPayload;
use crate::rules::{PenaltyDecision, PenaltyOption, PendingPenalty};
use crate::types::CellIdx;

/// One force remedy for the selected offender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceCandidate {
    /// Ordered landing cells, offender origin excluded.
    pub path: Vec<CellIdx>,
    /// Jumped cell per hop.
    pub jumps: Vec<CellIdx>,
}

/// Picker state. `OffenderSelected.ring` is the cell the remove remedy
/// would clear, which differs from the offender when the offending piece
/// relocated during the penalized turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerState {
    Inert,
    AwaitingOffender,
    OffenderSelected {
        offender: CellIdx,
        ring: CellIdx,
        candidates: Vec<ForceCandidate>,
        active: usize,
    },
}

/// What a click resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerAction {
    /// Nothing to do (picker inert, or the click changed selection only).
    None,
    /// The clicked cell names no offender; selection was cleared.
    NotOffender,
    /// An offender was (re)selected.
    Selected(CellIdx),
    /// The penalizer committed a remedy.
    Commit(PenaltyDecision),
}

#[derive(Debug, Default)]
pub struct Picker {
    state: PickerState,
}

impl Default for PickerState {
    fn default() -> Self {
        PickerState::Inert
    }
}

impl Picker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PickerState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != PickerState::Inert
    }

    /// Arm the picker for a fresh pending penalty.
    pub fn open(&mut self) {
        self.state = PickerState::AwaitingOffender;
    }

    /// Disarm without committing. The pending penalty itself stays
    /// intact; reopening resumes from offender selection.
    pub fn dismiss(&mut self) {
        self.state = PickerState::Inert;
    }

    /// Resolve a click against the pending penalty.
    ///
    /// Offender resolution is direct (the clicked cell is an offender's
    /// origin) or indirect (the offender started the penalized chain and
    /// relocated; clicking its landing cell selects it). With an offender
    /// already selected, clicking the remove ring commits a remove and
    /// clicking the active candidate's final cell commits a force.
    pub fn click(&mut self, pending: &PendingPenalty, idx: CellIdx) -> PickerAction {
        match &self.state {
            PickerState::Inert => PickerAction::None,
            PickerState::AwaitingOffender => self.try_select(pending, idx),
            PickerState::OffenderSelected {
                offender,
                ring,
                candidates,
                active,
            } => {
                if idx == *ring {
                    let decision = PenaltyDecision::Remove {
                        offender: *offender,
                    };
                    self.state = PickerState::Inert;
                    return PickerAction::Commit(decision);
                }
                if let Some(cand) = candidates.get(*active) {
                    if cand.path.last() == Some(&idx) {
                        let decision = PenaltyDecision::Force {
                            offender: *offender,
                            path: cand.path.clone(),
                            jumps: cand.jumps.clone(),
                        };
                        self.state = PickerState::Inert;
                        return PickerAction::Commit(decision);
                    }
                }
                // Anything else re-runs offender resolution.
                self.try_select(pending, idx)
            }
        }
    }

    /// Cycle the emphasized force candidate.
    pub fn cycle(&mut self) {
        if let PickerState::OffenderSelected {
            candidates, active, ..
        } = &mut self.state
        {
            if !candidates.is_empty() {
                *active = (*active + 1) % candidates.len();
            }
        }
    }

    /// Commit a remove for the selected offender, if any.
    pub fn commit_remove(&mut self) -> Option<PenaltyDecision> {
        if let PickerState::OffenderSelected { offender, .. } = self.state {
            self.state = PickerState::Inert;
            Some(PenaltyDecision::Remove { offender })
        } else {
            None
        }
    }

    /// Commit the active force candidate. A selection without candidates
    /// is a no-op and the picker stays open.
    pub fn commit_force(&mut self) -> Option<PenaltyDecision> {
        if let PickerState::OffenderSelected {
            offender,
            candidates,
            active,
            ..
        } = &self.state
        {
            let cand = candidates.get(*active)?;
            let decision = PenaltyDecision::Force {
                offender: *offender,
                path: cand.path.clone(),
                jumps: cand.jumps.clone(),
            };
            self.state = PickerState::Inert;
            return Some(decision);
        }
        None
    }

    /// Synthetic overlay values for the current selection, rendered
    /// read-only by the painter's preview entry point.
    pub fn preview(&self) -> PreviewPayload {
        let PickerState::OffenderSelected {
            offender,
            ring,
            candidates,
            active,
        } = &self.state
        else {
            return PreviewPayload::default();
        };

        let mut payload = PreviewPayload {
            marks: vec![*ring],
            remove_ring: Some(*ring),
            ..Default::default()
        };
        for cand in candidates {
            let mut nodes = Vec::with_capacity(cand.path.len() + 1);
            nodes.push(*offender);
            nodes.extend_from_slice(&cand.path);
            payload.force_paths_all.push(nodes);
        }
        if let Some(cand) = candidates.get(*active) {
            let mut nodes = Vec::with_capacity(cand.path.len() + 1);
            nodes.push(*offender);
            nodes.extend_from_slice(&cand.path);
            payload.active_force_path = nodes;
        }
        payload
    }

    fn try_select(&mut self, pending: &PendingPenalty, idx: CellIdx) -> PickerAction {
        let Some(offender) = resolve_offender(pending, idx) else {
            self.state = PickerState::AwaitingOffender;
            return PickerAction::NotOffender;
        };
        let candidates = force_candidates(pending, offender);
        let ring = remove_target(pending, offender);
        debug!(offender, ring, n = candidates.len(), "offender selected");
        self.state = PickerState::OffenderSelected {
            offender,
            ring,
            candidates,
            active: 0,
        };
        PickerAction::Selected(offender)
    }
}

/// Map a clicked cell to an offender: directly, or through the landing
/// cell of the offender that played the penalized chain.
pub fn resolve_offender(pending: &PendingPenalty, idx: CellIdx) -> Option<CellIdx> {
    if pending.offenders.contains(&idx) {
        return Some(idx);
    }
    if let (Some(started), Some(landed)) = (pending.started_from, pending.last_piece_idx) {
        if idx == landed && pending.offenders.contains(&started) {
            return Some(started);
        }
    }
    None
}

/// The cell a remove remedy clears for this offender: its landing cell
/// when it is the piece that moved, otherwise its own cell.
pub fn remove_target(pending: &PendingPenalty, offender: CellIdx) -> CellIdx {
    if pending.started_from == Some(offender) {
        pending.last_piece_idx.unwrap_or(offender)
    } else {
        offender
    }
}

/// Force candidates for one offender, deduplicated by exact path and
/// sorted lexicographically so the active candidate is deterministic.
pub fn force_candidates(pending: &PendingPenalty, offender: CellIdx) -> Vec<ForceCandidate> {
    let mut out: Vec<ForceCandidate> = Vec::new();
    for opt in &pending.options {
        let PenaltyOption::Force {
            offender: o,
            path,
            jumps,
        } = opt
        else {
            continue;
        };
        if *o != offender || out.iter().any(|c| &c.path == path) {
            continue;
        }
        out.push(ForceCandidate {
            path: path.clone(),
            jumps: jumps.clone(),
        });
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

// =============================================================================
// Tests
// =============================================================================
