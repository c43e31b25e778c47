//! Raised (pseudo-3D) board view.
//!
//! The raised view never receives game events of its own. It is a pull
//! consumer: once per frame the owner calls [`Mirror::sync_if_needed`]
//! with the current board, selection and highlights, and the view
//! rebuilds its sprite buffer only when a structural hash of that input
//! changes. Pointer input on the raised surface is remapped back onto
//! the flat canvas with [`Mirror::pointer_to_flat`], so a single click
//! handler serves both views.

use thiserror::Error;
use tracing::debug;

use crate::board::Board;
use crate::coords::{cell_center, from_view_rc, index_to_rc, rc_to_index, Orientation};
use crate::renderer::FrameBuffer;
use crate::types::{palette, piece_owner, piece_rank, Attr, CellIdx, Rank, Rgba, Side, BOARD_N, N_CELLS};

/// Horizontal cells spacing on the raised surface.
const STEP_X: u16 = 4;
/// Vertical cells spacing on the raised surface.
const STEP_Y: u16 = 2;
/// Horizontal shear applied per row away from the viewer.
const SHEAR: u16 = 1;
/// Outer margin around the projected board.
const MARGIN_X: u16 = 3;
const MARGIN_Y: u16 = 2;

/// Smallest surface the projection fits on.
const MIN_W: u16 = MARGIN_X * 2 + (BOARD_N as u16 - 1) * (STEP_X + SHEAR) + 1;
const MIN_H: u16 = MARGIN_Y * 2 + (BOARD_N as u16 - 1) * STEP_Y + 1;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("surface {width}x{height} too small for raised view (need {min_w}x{min_h})")]
    SurfaceTooSmall {
        width: u16,
        height: u16,
        min_w: u16,
        min_h: u16,
    },
}

/// Pull-synced raised board view.
pub struct Mirror {
    enabled: bool,
    inited: bool,
    suspended: bool,
    orientation: Orientation,
    surface: FrameBuffer,
    last_hash: Option<u32>,
    rebuilds: u64,
}

impl Mirror {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            enabled: false,
            inited: false,
            suspended: false,
            orientation,
            surface: FrameBuffer::new(0, 0),
            last_hash: None,
            rebuilds: 0,
        }
    }

    /// Allocates the surface. On failure the caller stays on the flat
    /// view only.
    pub fn init(&mut self, width: u16, height: u16) -> Result<(), MirrorError> {
        if width < MIN_W || height < MIN_H {
            return Err(MirrorError::SurfaceTooSmall {
                width,
                height,
                min_w: MIN_W,
                min_h: MIN_H,
            });
        }
        self.surface = FrameBuffer::new(width, height);
        self.inited = true;
        self.last_hash = None;
        debug!(width, height, "raised view initialized");
        Ok(())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.last_hash = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_inited(&self) -> bool {
        self.inited
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        if self.orientation != orientation {
            self.orientation = orientation;
            self.last_hash = None;
        }
    }

    /// While suspended the view keeps showing its last rebuilt frame.
    /// Lifting the suspension drops the hash so the next sync rebuilds.
    pub fn set_suspended(&mut self, suspended: bool) {
        if self.suspended && !suspended {
            self.last_hash = None;
        }
        self.suspended = suspended;
    }

    /// Forces the next sync to rebuild.
    pub fn invalidate(&mut self) {
        self.last_hash = None;
    }

    /// Rebuild count, for change-detection assertions.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn surface(&self) -> &FrameBuffer {
        &self.surface
    }

    /// Rebuilds the surface if the structural input changed since the
    /// last sync. Returns whether a rebuild happened. Nothing happens
    /// while disabled, uninitialized, suspended, or inside a simulation.
    pub fn sync_if_needed(
        &mut self,
        board: &Board,
        selection: Option<CellIdx>,
        highlights: &[CellIdx],
        sim_depth: u32,
    ) -> bool {
        if !self.enabled || !self.inited || self.suspended || sim_depth > 0 {
            return false;
        }
        let hash = structural_hash(board, selection, highlights);
        if self.last_hash == Some(hash) {
            return false;
        }
        self.last_hash = Some(hash);
        self.rebuild(board, selection, highlights);
        self.rebuilds += 1;
        debug!(hash, rebuilds = self.rebuilds, "raised view rebuilt");
        true
    }

    /// Maps a pointer position on the raised surface back to the
    /// equivalent position on a `flat_w` x `flat_h` flat canvas, so
    /// both views share one click handler. Out-of-board pointers map
    /// to nothing.
    pub fn pointer_to_flat(
        &self,
        x: u16,
        y: u16,
        flat_w: u16,
        flat_h: u16,
    ) -> Option<(u16, u16)> {
        if !self.inited {
            return None;
        }
        let vr = nearest_axis(y, MARGIN_Y, STEP_Y)?;
        if vr >= BOARD_N {
            return None;
        }
        let shear = (BOARD_N as u16 - 1 - vr as u16) * SHEAR;
        let left = MARGIN_X + shear;
        let vc = nearest_axis(x, left, STEP_X)?;
        if vc >= BOARD_N {
            return None;
        }
        let (r, c) = from_view_rc(vr, vc, self.orientation);
        let idx = rc_to_index(r, c);
        let (cx, cy, _, _) = cell_center(idx, flat_w, flat_h, self.orientation);
        Some((cx.round() as u16, cy.round() as u16))
    }

    fn rebuild(&mut self, board: &Board, selection: Option<CellIdx>, highlights: &[CellIdx]) {
        self.surface.clear();
        // Back rows first so nearer sprites overdraw them.
        for vr in 0..BOARD_N {
            for vc in 0..BOARD_N {
                let (r, c) = from_view_rc(vr, vc, self.orientation);
                let idx = rc_to_index(r, c);
                let (x, y) = self.project(vr, vc);

                let highlighted = highlights.contains(&idx);
                let piece = board.get(idx);
                if piece == 0 {
                    let tile = if highlighted { '▫' } else { '·' };
                    let tile_fg = if highlighted {
                        palette::ALERT
                    } else {
                        palette::GRID
                    };
                    self.surface.put_glyph(x, y, tile, tile_fg, Attr::empty());
                    continue;
                }

                let glyph = match piece_rank(piece) {
                    Some(Rank::King) => '◉',
                    _ => '●',
                };
                let mut fg = match piece_owner(piece) {
                    Some(Side::Top) => palette::PIECE_TOP,
                    Some(Side::Bottom) => palette::PIECE_BOTTOM,
                    None => Rgba::TERMINAL_DEFAULT,
                };
                let mut attrs = Attr::empty();
                if selection == Some(idx) {
                    fg = palette::DANGER;
                    attrs |= Attr::BOLD;
                } else if highlighted {
                    fg = palette::ALERT;
                }
                // The sprite sits one row above its tile; a shadow mark
                // stays on the tile row to anchor it visually.
                self.surface
                    .put_glyph(x, y, '▔', palette::GRID.dim(0.5), Attr::empty());
                self.surface
                    .put_glyph(x, y.saturating_sub(1), glyph, fg, attrs);
            }
        }
    }

    fn project(&self, vr: u8, vc: u8) -> (u16, u16) {
        let shear = (BOARD_N as u16 - 1 - vr as u16) * SHEAR;
        let x = MARGIN_X + shear + vc as u16 * STEP_X;
        let y = MARGIN_Y + vr as u16 * STEP_Y;
        (x, y)
    }
}

/// Nearest grid index along one projected axis, or `None` when the
/// pointer falls between cells or outside the board band.
fn nearest_axis(pos: u16, origin: u16, step: u16) -> Option<u8> {
    if pos + step / 2 < origin {
        return None;
    }
    let rel = pos + step / 2 - origin;
    let i = rel / step;
    let off = rel % step;
    if off > step / 2 + step % 2 {
        return None;
    }
    if i >= BOARD_N as u16 {
        return None;
    }
    Some(i as u8)
}

/// FNV-1a hash over the structural inputs of the raised view: cell
/// contents, the selection and the highlight set.
pub fn structural_hash(board: &Board, selection: Option<CellIdx>, highlights: &[CellIdx]) -> u32 {
    const BASIS: u32 = 2_166_136_261;
    const PRIME: u32 = 16_777_619;
    let mut h = BASIS;
    let mut mix = |v: u32| {
        h ^= v;
        h = h.wrapping_mul(PRIME);
    };
    for idx in 0..N_CELLS {
        mix((board.get(idx) as i32 as u32).wrapping_add(31));
    }
    if let Some(sel) = selection {
        mix(sel as u32 + 131);
    }
    for &cell in highlights {
        let (r, c) = index_to_rc(cell);
        mix((r as u32 * 31 + c as u32) + 503);
    }
    h
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::coords::{cell_at, to_view_rc};
    use crate::types::man;

    fn ready_mirror() -> Mirror {
        let mut m = Mirror::new(Orientation::BottomAtBottom);
        m.init(MIN_W, MIN_H).unwrap();
        m.set_enabled(true);
        m
    }

    #[test]
    fn test_init_rejects_small_surface() {
        let mut m = Mirror::new(Orientation::BottomAtBottom);
        assert!(matches!(
            m.init(10, 5),
            Err(MirrorError::SurfaceTooSmall { .. })
        ));
        assert!(!m.is_inited());
    }

    #[test]
    fn test_sync_rebuilds_only_on_change() {
        let mut m = ready_mirror();
        let board = Board::starting();

        assert!(m.sync_if_needed(&board, None, &[], 0));
        assert!(!m.sync_if_needed(&board, None, &[], 0));
        assert_eq!(m.rebuilds(), 1);

        // Selection change is structural.
        assert!(m.sync_if_needed(&board, Some(40), &[], 0));
        assert_eq!(m.rebuilds(), 2);
    }

    #[test]
    fn test_sync_gated_while_suspended_or_simulating() {
        let mut m = ready_mirror();
        let board = Board::starting();
        assert!(m.sync_if_needed(&board, None, &[], 0));

        m.set_suspended(true);
        assert!(!m.sync_if_needed(&board, Some(40), &[], 0));
        // Lifting the suspension forces a rebuild even if the hash
        // matches what was last drawn.
        m.set_suspended(false);
        assert!(m.sync_if_needed(&board, None, &[], 0));

        assert!(!m.sync_if_needed(&board, Some(40), &[], 3));
    }

    #[test]
    fn test_disabled_mirror_never_syncs() {
        let mut m = ready_mirror();
        m.set_enabled(false);
        assert!(!m.sync_if_needed(&Board::starting(), None, &[], 0));
        assert_eq!(m.rebuilds(), 0);
    }

    #[test]
    fn test_hash_sensitive_to_each_input() {
        let board = Board::starting();
        let base = structural_hash(&board, None, &[]);

        let mut moved = board.clone();
        moved.set(40, man(Side::Top));
        assert_ne!(structural_hash(&moved, None, &[]), base);

        assert_ne!(structural_hash(&board, Some(0), &[]), base);
        assert_ne!(structural_hash(&board, None, &[40]), base);
    }

    #[test]
    fn test_pointer_remap_round_trips_cells() {
        let m = ready_mirror();
        let (flat_w, flat_h) = (45, 27);
        for idx in 0..N_CELLS {
            let (r, c) = index_to_rc(idx);
            let (vr, vc) = to_view_rc(r, c, Orientation::BottomAtBottom);
            let (x, y) = m.project(vr, vc);

            let (fx, fy) = m.pointer_to_flat(x, y, flat_w, flat_h).unwrap();
            assert_eq!(
                cell_at(fx, fy, flat_w, flat_h, Orientation::BottomAtBottom),
                Some(idx)
            );
        }
    }

    #[test]
    fn test_pointer_outside_board_maps_to_nothing() {
        let m = ready_mirror();
        assert_eq!(m.pointer_to_flat(0, 0, 45, 27), None);
        assert_eq!(m.pointer_to_flat(MIN_W - 1, MIN_H - 1, 45, 27), None);
    }
}
