//! Overlay state store.
//!
//! Every transient visual annotation layered over the board lives here as
//! an independent, named optional slot. The store is pure presentation
//! data: reconstructible at any time, never persisted, and never consulted
//! for game decisions.
//!
//! Expiring entries (the undo flash and each crown pulse) carry an explicit
//! deadline instead of a timer; the painter prunes them at the start of
//! each paint, so clearing is idempotent and a stale entry can never
//! outlive a redraw.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::types::{palette, CellIdx, Rgba, Side};

/// How long the undo flash and each crown pulse stay visible.
pub const FLASH_TTL: Duration = Duration::from_millis(1200);

// =============================================================================
// Slot types
// =============================================================================

/// A move path overlay: origin plus the ordered landing cells, colored by
/// the mover's side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovePath {
    pub from: CellIdx,
    pub path: Vec<CellIdx>,
    pub side: Side,
}

impl MovePath {
    /// The side's path color (matches the captured-order badge color).
    pub fn color(&self) -> Rgba {
        match self.side {
            Side::Top => palette::MOVE_TOP,
            Side::Bottom => palette::MOVE_BOTTOM,
        }
    }
}

/// An ignored-capture segment shown after a soufla: origin, the ordered
/// chain that was available, and the jumped cell per step (for numbering).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IgnoredSegment {
    pub from: CellIdx,
    pub path: Vec<CellIdx>,
    pub jumps: Vec<CellIdx>,
}

/// An auto-expiring path flash.
#[derive(Debug, Clone, PartialEq)]
pub struct PathFlash {
    pub nodes: Vec<CellIdx>,
    pub deadline: Instant,
}

/// An auto-expiring crown pulse ring on a promoted piece.
#[derive(Debug, Clone, PartialEq)]
pub struct CrownPulse {
    pub idx: CellIdx,
    pub deadline: Instant,
}

// =============================================================================
// Overlay state
// =============================================================================

/// The complete transient annotation state.
///
/// Serializes for diagnostics; the deadline-bearing slots are skipped since
/// they are meaningless outside the process that created them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverlayState {
    /// Cells drawn with the selection highlight fill.
    pub highlight_cells: Vec<CellIdx>,
    /// The move that just happened.
    pub last_move: Option<MovePath>,
    /// The move before that, rendered at reduced opacity.
    pub prev_move: Option<MovePath>,
    /// Undo flash path, alert-colored, auto-expiring.
    #[serde(skip_serializing)]
    pub undo_flash: Option<PathFlash>,
    /// Forced-opening hint arrow (from, to).
    pub opening_arrow: Option<(CellIdx, CellIdx)>,
    /// Soufla ignored-capture segments with per-step jump numbering.
    pub ignored_segments: Vec<IgnoredSegment>,
    /// Every candidate force-path, rendered in bulk at reduced opacity.
    pub force_paths_all: Vec<Vec<CellIdx>>,
    /// The single emphasized candidate force-path (origin first).
    pub force_path_active: Vec<CellIdx>,
    /// Remove-target marker cells.
    pub remove_marks: Vec<CellIdx>,
    /// Soufla undo-arrow node list (end first, walking back to the start).
    pub soufla_undo_arrow: Option<Vec<CellIdx>>,
    /// Pending crown pulses, auto-expiring independently.
    #[serde(skip_serializing)]
    pub crown_pulses: Vec<CrownPulse>,
    /// Captured cells in capture order, numbered on the board.
    pub captured_order: Vec<CellIdx>,
    /// Coordinate-label toggle.
    pub show_coords: bool,
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection highlight set.
    pub fn set_highlights(&mut self, cells: Vec<CellIdx>) {
        self.highlight_cells = cells;
    }

    /// Set the last-move path. An empty path clears the slot.
    pub fn set_last_move(&mut self, from: CellIdx, path: Vec<CellIdx>, side: Side) {
        self.last_move = if path.is_empty() {
            None
        } else {
            Some(MovePath { from, path, side })
        };
    }

    pub fn clear_last_move(&mut self) {
        self.last_move = None;
    }

    /// Demote the last move to the faded previous-move slot.
    pub fn promote_last_to_prev(&mut self) {
        self.prev_move = self.last_move.take();
    }

    pub fn clear_prev_move(&mut self) {
        self.prev_move = None;
    }

    /// Arm the undo flash for `FLASH_TTL` starting at `now`.
    /// Fewer than two nodes clears the slot.
    pub fn set_undo_flash(&mut self, nodes: Vec<CellIdx>, now: Instant) {
        self.undo_flash = if nodes.len() >= 2 {
            Some(PathFlash {
                nodes,
                deadline: now + FLASH_TTL,
            })
        } else {
            None
        };
    }

    pub fn set_opening_arrow(&mut self, from: CellIdx, to: CellIdx) {
        self.opening_arrow = Some((from, to));
    }

    pub fn clear_opening_arrow(&mut self) {
        self.opening_arrow = None;
    }

    /// Queue a crown pulse expiring `FLASH_TTL` after `now`. Overlapping
    /// pulses expire independently.
    pub fn queue_crown(&mut self, idx: CellIdx, now: Instant) {
        self.crown_pulses.push(CrownPulse {
            idx,
            deadline: now + FLASH_TTL,
        });
    }

    pub fn push_captured(&mut self, idx: CellIdx) {
        self.captured_order.push(idx);
    }

    pub fn clear_captured_order(&mut self) {
        self.captured_order.clear();
    }

    /// Drop every soufla annotation (ignored segments, candidates, marks,
    /// undo arrow) in one step.
    pub fn clear_soufla_fx(&mut self) {
        self.ignored_segments.clear();
        self.force_paths_all.clear();
        self.force_path_active.clear();
        self.remove_marks.clear();
        self.soufla_undo_arrow = None;
    }

    /// Remove expired entries as of `now`. Returns true when anything was
    /// dropped, i.e. the visible state changed.
    pub fn prune_expired(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(flash) = &self.undo_flash {
            if flash.deadline <= now {
                self.undo_flash = None;
                changed = true;
            }
        }
        let before = self.crown_pulses.len();
        self.crown_pulses.retain(|p| p.deadline > now);
        changed || self.crown_pulses.len() != before
    }

    /// Whether any expiring entry is currently armed. Hosts use this to
    /// keep ticking until the last flash is gone.
    pub fn has_expiring(&self) -> bool {
        self.undo_flash.is_some() || !self.crown_pulses.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_move_empty_path_clears() {
        let mut ov = OverlayState::new();
        ov.set_last_move(3, vec![12], Side::Top);
        assert!(ov.last_move.is_some());
        ov.set_last_move(3, vec![], Side::Top);
        assert!(ov.last_move.is_none());
    }

    #[test]
    fn test_promote_last_to_prev() {
        let mut ov = OverlayState::new();
        ov.set_last_move(3, vec![12, 21], Side::Bottom);
        ov.promote_last_to_prev();
        assert!(ov.last_move.is_none());
        assert_eq!(ov.prev_move.as_ref().unwrap().path, vec![12, 21]);
    }

    #[test]
    fn test_undo_flash_needs_two_nodes() {
        let mut ov = OverlayState::new();
        ov.set_undo_flash(vec![5], Instant::now());
        assert!(ov.undo_flash.is_none());
        ov.set_undo_flash(vec![5, 14], Instant::now());
        assert!(ov.undo_flash.is_some());
    }

    #[test]
    fn test_prune_expired_flash_and_pulses() {
        let mut ov = OverlayState::new();
        let t0 = Instant::now();
        ov.set_undo_flash(vec![1, 2], t0);
        ov.queue_crown(7, t0);
        ov.queue_crown(9, t0 + Duration::from_millis(600));

        assert!(!ov.prune_expired(t0 + Duration::from_millis(100)));
        assert!(ov.has_expiring());

        // Flash and first pulse expire; the later pulse survives.
        assert!(ov.prune_expired(t0 + FLASH_TTL));
        assert!(ov.undo_flash.is_none());
        assert_eq!(ov.crown_pulses.len(), 1);
        assert_eq!(ov.crown_pulses[0].idx, 9);

        // Pruning already-cleared state is a harmless no-op.
        assert!(!ov.prune_expired(t0 + FLASH_TTL));
    }

    #[test]
    fn test_clear_soufla_fx_drops_all_slots() {
        let mut ov = OverlayState::new();
        ov.ignored_segments.push(IgnoredSegment {
            from: 5,
            path: vec![19],
            jumps: vec![12],
        });
        ov.force_paths_all.push(vec![12, 26]);
        ov.force_path_active = vec![12, 26];
        ov.remove_marks.push(12);
        ov.soufla_undo_arrow = Some(vec![20, 5]);
        ov.clear_soufla_fx();
        assert!(ov.ignored_segments.is_empty());
        assert!(ov.force_paths_all.is_empty());
        assert!(ov.force_path_active.is_empty());
        assert!(ov.remove_marks.is_empty());
        assert!(ov.soufla_undo_arrow.is_none());
    }
}
