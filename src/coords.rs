//! Coordinate transforms.
//!
//! Pure, stateless mappings among the three coordinate spaces the crate
//! uses: linear cell index, board (row, col), and orientation-dependent
//! view (row, col). `cell_center` additionally maps into surface space
//! (character cells of a frame buffer) from the surface dimensions.
//!
//! `index_to_rc`/`rc_to_index` are mutual inverses, and composing
//! `to_view_rc` with `from_view_rc` is the identity for both orientations.

use crate::types::{CellIdx, BOARD_N};

/// Which side the local player views from.
///
/// The transform reflects the board so the local player's own ranks render
/// at the visual bottom. `BottomAtBottom` is the identity orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    BottomAtBottom,
    TopAtBottom,
}

/// Linear index to (row, col).
#[inline]
pub const fn index_to_rc(idx: CellIdx) -> (u8, u8) {
    (idx / BOARD_N, idx % BOARD_N)
}

/// (row, col) to linear index.
#[inline]
pub const fn rc_to_index(r: u8, c: u8) -> CellIdx {
    r * BOARD_N + c
}

/// Whether (row, col) lies on the board.
#[inline]
pub const fn inside(r: i16, c: i16) -> bool {
    r >= 0 && r < BOARD_N as i16 && c >= 0 && c < BOARD_N as i16
}

/// Board (row, col) to view (row, col) for the given orientation.
#[inline]
pub const fn to_view_rc(r: u8, c: u8, orientation: Orientation) -> (u8, u8) {
    match orientation {
        Orientation::BottomAtBottom => (r, c),
        Orientation::TopAtBottom => (BOARD_N - 1 - r, BOARD_N - 1 - c),
    }
}

/// View (row, col) back to board (row, col). The reflection is an involution,
/// so this is the same map as `to_view_rc`.
#[inline]
pub const fn from_view_rc(r: u8, c: u8, orientation: Orientation) -> (u8, u8) {
    to_view_rc(r, c, orientation)
}

/// Surface-space center of a cell plus the per-cell step, derived from the
/// surface dimensions and the fixed board size.
///
/// Returns `(x, y, step_x, step_y)` in fractional surface cells. Callers
/// round to integral cells when painting.
#[inline]
pub fn cell_center(
    idx: CellIdx,
    surface_w: u16,
    surface_h: u16,
    orientation: Orientation,
) -> (f32, f32, f32, f32) {
    let (r0, c0) = index_to_rc(idx);
    let (r, c) = to_view_rc(r0, c0, orientation);
    let step_x = surface_w as f32 / BOARD_N as f32;
    let step_y = surface_h as f32 / BOARD_N as f32;
    let x = c as f32 * step_x + step_x / 2.0;
    let y = r as f32 * step_y + step_y / 2.0;
    (x, y, step_x, step_y)
}

/// Surface position to cell index, or `None` when outside the board area.
#[inline]
pub fn cell_at(
    x: u16,
    y: u16,
    surface_w: u16,
    surface_h: u16,
    orientation: Orientation,
) -> Option<CellIdx> {
    if surface_w == 0 || surface_h == 0 || x >= surface_w || y >= surface_h {
        return None;
    }
    let step_x = surface_w as f32 / BOARD_N as f32;
    let step_y = surface_h as f32 / BOARD_N as f32;
    let vc = (x as f32 / step_x) as i16;
    let vr = (y as f32 / step_y) as i16;
    if !inside(vr, vc) {
        return None;
    }
    let (r, c) = from_view_rc(vr as u8, vc as u8, orientation);
    Some(rc_to_index(r, c))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::N_CELLS;

    #[test]
    fn test_index_rc_round_trip() {
        for idx in 0..N_CELLS {
            let (r, c) = index_to_rc(idx);
            assert_eq!(rc_to_index(r, c), idx);
        }
    }

    #[test]
    fn test_view_round_trip_both_orientations() {
        for orientation in [Orientation::BottomAtBottom, Orientation::TopAtBottom] {
            for r in 0..BOARD_N {
                for c in 0..BOARD_N {
                    let (vr, vc) = to_view_rc(r, c, orientation);
                    assert_eq!(from_view_rc(vr, vc, orientation), (r, c));
                }
            }
        }
    }

    #[test]
    fn test_reflection_moves_top_rank() {
        // In the flipped orientation row 0 renders at the visual bottom.
        assert_eq!(to_view_rc(0, 0, Orientation::TopAtBottom), (8, 8));
        assert_eq!(to_view_rc(8, 8, Orientation::TopAtBottom), (0, 0));
        assert_eq!(to_view_rc(4, 4, Orientation::TopAtBottom), (4, 4));
    }

    #[test]
    fn test_cell_center_is_pure_geometry() {
        let (x, y, sx, sy) = cell_center(0, 90, 45, Orientation::BottomAtBottom);
        assert_eq!((sx, sy), (10.0, 5.0));
        assert_eq!((x, y), (5.0, 2.5));

        // Same index, flipped orientation lands in the opposite corner.
        let (fx, fy, _, _) = cell_center(0, 90, 45, Orientation::TopAtBottom);
        assert_eq!((fx, fy), (85.0, 42.5));
    }

    #[test]
    fn test_cell_at_inverts_cell_center() {
        for orientation in [Orientation::BottomAtBottom, Orientation::TopAtBottom] {
            for idx in 0..N_CELLS {
                let (x, y, _, _) = cell_center(idx, 99, 54, orientation);
                assert_eq!(cell_at(x as u16, y as u16, 99, 54, orientation), Some(idx));
            }
        }
    }

    #[test]
    fn test_cell_at_rejects_outside() {
        assert_eq!(cell_at(100, 5, 99, 54, Orientation::BottomAtBottom), None);
        assert_eq!(cell_at(5, 54, 99, 54, Orientation::BottomAtBottom), None);
        assert_eq!(cell_at(5, 5, 0, 0, Orientation::BottomAtBottom), None);
    }
}
