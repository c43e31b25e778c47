//! Board grid and full-state snapshots.
//!
//! The board is read-mostly for rendering and mutated only by move
//! application and penalty remove/force commits, all of which go through
//! the controller. Snapshots capture everything needed for penalty
//! rollback, undo history, and persistence.

use serde::{Deserialize, Serialize};

use crate::coords::{index_to_rc, rc_to_index};
use crate::types::{man, piece_owner, CellIdx, Piece, Side, BOARD_N, N_CELLS};

// =============================================================================
// Board
// =============================================================================

/// N x N grid of piece values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: Vec<Piece>,
}

impl Board {
    /// An empty board.
    pub fn empty() -> Self {
        Self {
            cells: vec![0; N_CELLS as usize],
        }
    }

    /// The standard starting position: 40 men per side. Each side fills
    /// its four nearest ranks plus its half of the middle rank, leaving
    /// only the center cell empty.
    pub fn starting() -> Self {
        let mut board = Self::empty();
        for r in 0..4u8 {
            for c in 0..BOARD_N {
                board.set(rc_to_index(r, c), man(Side::Top));
                board.set(rc_to_index(BOARD_N - 1 - r, c), man(Side::Bottom));
            }
        }
        let mid = BOARD_N / 2;
        for c in 0..mid {
            board.set(rc_to_index(mid, c), man(Side::Top));
        }
        for c in mid + 1..BOARD_N {
            board.set(rc_to_index(mid, c), man(Side::Bottom));
        }
        board
    }

    /// Piece value at a linear index.
    #[inline]
    pub fn get(&self, idx: CellIdx) -> Piece {
        self.cells[idx as usize]
    }

    /// Piece value at (row, col).
    #[inline]
    pub fn get_rc(&self, r: u8, c: u8) -> Piece {
        self.get(rc_to_index(r, c))
    }

    /// Set the piece value at a linear index.
    #[inline]
    pub fn set(&mut self, idx: CellIdx, v: Piece) {
        self.cells[idx as usize] = v;
    }

    /// Iterate `(index, value)` over every cell in index order.
    pub fn iter(&self) -> impl Iterator<Item = (CellIdx, Piece)> + '_ {
        self.cells.iter().enumerate().map(|(i, &v)| (i as CellIdx, v))
    }

    /// Move a piece and clear the jumped cell if any. Does not validate;
    /// legality is the rules collaborator's concern.
    pub fn apply_move(&mut self, from: CellIdx, to: CellIdx, jumped: Option<CellIdx>) {
        let v = self.get(from);
        self.set(from, 0);
        if let Some(j) = jumped {
            self.set(j, 0);
        }
        self.set(to, v);
    }

    /// Count of pieces owned by `side`.
    pub fn count(&self, side: Side) -> usize {
        self.cells
            .iter()
            .filter(|&&v| piece_owner(v) == Some(side))
            .count()
    }
}

/// Human-readable cell name, file letter then rank digit ("a1".."i9"),
/// with rank 1 at the visual bottom row.
pub fn cell_name(idx: CellIdx) -> String {
    let (r, c) = index_to_rc(idx);
    let file = (b'a' + c) as char;
    let rank = BOARD_N - r;
    format!("{file}{rank}")
}

// =============================================================================
// Snapshot
// =============================================================================

/// A full copy of the mutable game state.
///
/// Pushed to history before every applied move, captured at turn start for
/// penalty rollback, and embedded in save payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub board: Board,
    pub mover: Side,
    pub in_chain: bool,
    pub chain_anchor: Option<CellIdx>,
    pub last_moved_from: Option<CellIdx>,
    pub last_moved_to: Option<CellIdx>,
    pub last_move_from: Option<CellIdx>,
    pub last_move_path: Option<Vec<CellIdx>>,
    pub move_count: u32,
    pub forced_enabled: bool,
    pub forced_ply: u8,
    pub game_over: bool,
    pub winner: Option<Side>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::king;

    #[test]
    fn test_starting_position_counts() {
        let board = Board::starting();
        assert_eq!(board.count(Side::Top), 40);
        assert_eq!(board.count(Side::Bottom), 40);
        assert_eq!(board.get_rc(0, 0), man(Side::Top));
        assert_eq!(board.get_rc(8, 8), man(Side::Bottom));
        // The middle rank splits between the sides; only the center is empty.
        assert_eq!(board.get_rc(4, 3), man(Side::Top));
        assert_eq!(board.get_rc(4, 4), 0);
        assert_eq!(board.get_rc(4, 5), man(Side::Bottom));
    }

    #[test]
    fn test_apply_move_clears_jumped() {
        let mut board = Board::empty();
        board.set(10, king(Side::Top));
        board.set(20, man(Side::Bottom));
        board.apply_move(10, 30, Some(20));
        assert_eq!(board.get(10), 0);
        assert_eq!(board.get(20), 0);
        assert_eq!(board.get(30), king(Side::Top));
    }

    #[test]
    fn test_cell_name() {
        assert_eq!(cell_name(rc_to_index(8, 0)), "a1");
        assert_eq!(cell_name(rc_to_index(0, 8)), "i9");
        assert_eq!(cell_name(rc_to_index(4, 4)), "e5");
    }
}
