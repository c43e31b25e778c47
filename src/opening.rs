//! The scripted forced opening.
//!
//! Both sides must play a fixed sequence for the first 10 plies of the
//! game. The table used depends on which side made the first move (the
//! "base" side); even plies belong to the base side, odd plies to its
//! opponent. Most steps are simple `(from, to)` entries; one per table is
//! a multi-hop chain opening played hop-by-hop.

use crate::coords::rc_to_index;
use crate::types::{CellIdx, Side};

/// Number of scripted plies.
pub const OPENING_PLIES: u8 = 10;

/// One scripted step: two cells for a simple move, more for a chain
/// opening (origin plus each landing cell in order).
#[derive(Debug, Clone, Copy)]
pub struct OpeningStep {
    cells: &'static [(u8, u8)],
}

impl OpeningStep {
    /// The step's origin cell.
    pub fn from(&self) -> CellIdx {
        let (r, c) = self.cells[0];
        rc_to_index(r, c)
    }

    /// The first landing cell.
    pub fn first_to(&self) -> CellIdx {
        let (r, c) = self.cells[1];
        rc_to_index(r, c)
    }

    /// The final landing cell (same as `first_to` for simple steps).
    pub fn final_to(&self) -> CellIdx {
        let (r, c) = self.cells[self.cells.len() - 1];
        rc_to_index(r, c)
    }

    /// Whether this is a multi-hop chain opening.
    pub fn is_chain(&self) -> bool {
        self.cells.len() > 2
    }

    /// Every cell of the step in order, origin first.
    pub fn nodes(&self) -> impl Iterator<Item = CellIdx> + '_ {
        self.cells.iter().map(|&(r, c)| rc_to_index(r, c))
    }

    /// The expected `(from, to)` hop given the current chain anchor.
    ///
    /// Outside a chain (or when the anchor doesn't match an intermediate
    /// node) the first hop is expected; an anchor sitting on an
    /// intermediate node expects the following hop.
    pub fn expected_hop(&self, anchor: Option<CellIdx>) -> (CellIdx, CellIdx) {
        if let Some(anchor) = anchor {
            let nodes: Vec<CellIdx> = self.nodes().collect();
            for w in nodes.windows(2).skip(1) {
                if w[0] == anchor {
                    return (w[0], w[1]);
                }
            }
        }
        (self.from(), self.first_to())
    }
}

const fn step(cells: &'static [(u8, u8)]) -> OpeningStep {
    OpeningStep { cells }
}

/// Sequence when the top side moves first.
pub const OPENING_TOP_BASE: [OpeningStep; 10] = [
    step(&[(3, 5), (4, 4)]),
    step(&[(5, 3), (3, 5)]),
    step(&[(2, 6), (4, 4)]),
    step(&[(4, 8), (2, 6)]),
    step(&[(1, 7), (3, 5)]),
    step(&[(4, 6), (2, 6)]),
    step(&[(4, 4), (4, 6), (4, 8)]),
    step(&[(2, 6), (4, 4)]),
    step(&[(4, 3), (4, 5)]),
    step(&[(5, 5), (3, 5)]),
];

/// Sequence when the bottom side moves first.
pub const OPENING_BOTTOM_BASE: [OpeningStep; 10] = [
    step(&[(5, 3), (4, 4)]),
    step(&[(3, 5), (5, 3)]),
    step(&[(6, 2), (4, 4)]),
    step(&[(4, 0), (6, 2)]),
    step(&[(7, 1), (5, 3)]),
    step(&[(4, 2), (6, 2)]),
    step(&[(4, 4), (4, 2), (4, 0)]),
    step(&[(6, 2), (4, 4)]),
    step(&[(4, 5), (4, 3)]),
    step(&[(3, 3), (5, 3)]),
];

/// The table for the given base (first-moving) side.
pub fn table(base: Side) -> &'static [OpeningStep; 10] {
    match base {
        Side::Top => &OPENING_TOP_BASE,
        Side::Bottom => &OPENING_BOTTOM_BASE,
    }
}

/// Which side plays the given scripted ply.
pub fn mover_for_ply(base: Side, ply: u8) -> Side {
    if ply % 2 == 0 {
        base
    } else {
        base.opponent()
    }
}

// =============================================================================
// Tests
// =============================================================================
