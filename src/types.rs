//! Core types for zamat-tui.
//!
//! These types define the foundation everything builds on: the render cell
//! model the frame buffer and both back-ends understand, and the piece/side
//! model the controller and rules collaborator exchange.

use serde::{Deserialize, Serialize};

// =============================================================================
// Board constants
// =============================================================================

/// Board side length. The board is BOARD_N x BOARD_N.
pub const BOARD_N: u8 = 9;

/// Total number of cells on the board.
pub const N_CELLS: u8 = BOARD_N * BOARD_N;

/// Linear cell index into the BOARD_N x BOARD_N grid.
pub type CellIdx = u8;

// =============================================================================
// Sides and pieces
// =============================================================================

/// One of the two players. `Top` owns the pieces that start on the low rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    /// The opposing side.
    #[inline]
    pub const fn opponent(self) -> Self {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }

    /// Signed encoding used in piece values: Top = +1, Bottom = -1.
    #[inline]
    pub const fn sign(self) -> i8 {
        match self {
            Side::Top => 1,
            Side::Bottom => -1,
        }
    }
}

/// Piece rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Man,
    King,
}

/// A cell's content as a signed small integer.
///
/// Magnitude is the rank (1 = man, 2 = king), sign is the owner
/// (Top positive, Bottom negative), zero is empty.
pub type Piece = i8;

/// Piece value for a man of the given side.
#[inline]
pub const fn man(side: Side) -> Piece {
    side.sign()
}

/// Piece value for a king of the given side.
#[inline]
pub const fn king(side: Side) -> Piece {
    2 * side.sign()
}

/// Owner of a piece value, or `None` for an empty cell.
#[inline]
pub fn piece_owner(v: Piece) -> Option<Side> {
    match v.signum() {
        1 => Some(Side::Top),
        -1 => Some(Side::Bottom),
        _ => None,
    }
}

/// Rank of a piece value, or `None` for an empty cell.
#[inline]
pub fn piece_rank(v: Piece) -> Option<Rank> {
    match v.abs() {
        1 => Some(Rank::Man),
        2 => Some(Rank::King),
        _ => None,
    }
}

// =============================================================================
// Color
// =============================================================================

/// RGBA color with 8-bit channels (0-255).
///
/// Using integers for exact comparison - no floating point epsilon needed.
/// Alpha 255 = fully opaque, 0 = fully transparent.
/// Special value: r=-1 means "terminal default" (let terminal pick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: i16,
    pub g: i16,
    pub b: i16,
    pub a: i16,
}

impl Rgba {
    /// Create a new RGBA color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as i16,
            g: g as i16,
            b: b as i16,
            a: a as i16,
        }
    }

    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Terminal default color (let terminal decide).
    pub const TERMINAL_DEFAULT: Self = Self {
        r: -1,
        g: -1,
        b: -1,
        a: -1,
    };

    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Check if this is the terminal default color.
    #[inline]
    pub const fn is_terminal_default(&self) -> bool {
        self.r == -1
    }

    /// Check if color is fully opaque.
    #[inline]
    pub const fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Alpha blend src over dst (Porter-Duff "over" operation).
    #[inline]
    pub fn blend(src: Self, dst: Self) -> Self {
        if src.is_opaque() || src.is_terminal_default() {
            return src;
        }
        if src.a == 0 {
            return dst;
        }

        let (dr, dg, db, da) = if dst.is_terminal_default() {
            (0i16, 0i16, 0i16, 255i16)
        } else {
            (dst.r, dst.g, dst.b, dst.a)
        };

        let sa = src.a as i32;
        let inv_sa = 255 - sa;
        let out_a = sa + (da as i32 * inv_sa) / 255;
        if out_a == 0 {
            return Self::default();
        }

        let out_r = ((src.r as i32 * sa) + (dr as i32 * da as i32 * inv_sa / 255)) / out_a;
        let out_g = ((src.g as i32 * sa) + (dg as i32 * da as i32 * inv_sa / 255)) / out_a;
        let out_b = ((src.b as i32 * sa) + (db as i32 * da as i32 * inv_sa / 255)) / out_a;

        Self {
            r: out_r.clamp(0, 255) as i16,
            g: out_g.clamp(0, 255) as i16,
            b: out_b.clamp(0, 255) as i16,
            a: out_a.clamp(0, 255) as i16,
        }
    }

    /// Reduce opacity by a factor (0.0 = invisible, 1.0 = unchanged).
    #[inline]
    pub fn fade(self, factor: f32) -> Self {
        if self.is_terminal_default() {
            return self;
        }
        Self {
            a: ((self.a as f32) * factor.clamp(0.0, 1.0)) as i16,
            ..self
        }
    }

    /// Dim the color by a factor (0.0 = black, 1.0 = unchanged).
    #[inline]
    pub fn dim(self, factor: f32) -> Self {
        if self.is_terminal_default() {
            return self;
        }
        Self {
            r: (self.r as f32 * factor).clamp(0.0, 255.0) as i16,
            g: (self.g as f32 * factor).clamp(0.0, 255.0) as i16,
            b: (self.b as f32 * factor).clamp(0.0, 255.0) as i16,
            a: self.a,
        }
    }
}

// =============================================================================
// Palette
// =============================================================================

/// Fixed overlay palette.
///
/// One color per overlay concern; the per-side move colors match the
/// captured-order badges drawn for the same mover.
pub mod palette {
    use super::Rgba;

    /// Last-move path for the top side.
    pub const MOVE_TOP: Rgba = Rgba::rgb(0x3b, 0x82, 0xf6);
    /// Last-move path for the bottom side.
    pub const MOVE_BOTTOM: Rgba = Rgba::rgb(0x22, 0xc5, 0x5e);
    /// Undo flash and soufla undo arrow.
    pub const ALERT: Rgba = Rgba::rgb(0xfa, 0xcc, 0x15);
    /// Forced-opening hint arrow, remove markers, ignored-chain segments.
    pub const DANGER: Rgba = Rgba::rgb(0xef, 0x44, 0x44);
    /// Jump-number labels on ignored-chain segments.
    pub const DANGER_TEXT: Rgba = Rgba::rgb(0xb9, 0x1c, 0x1c);
    /// Bulk candidate force-paths.
    pub const FORCE: Rgba = Rgba::rgb(0x16, 0x65, 0x34);
    /// The emphasized active force-path.
    pub const FORCE_STRONG: Rgba = Rgba::rgb(0x14, 0x53, 0x2d);
    /// Selection highlight fill.
    pub const SELECTION: Rgba = Rgba::new(0xef, 0x44, 0x44, 0x59);
    /// Crown pulse ring.
    pub const CROWN: Rgba = Rgba::rgb(0xea, 0xb3, 0x08);
    /// Board grid lines and pip dots.
    pub const GRID: Rgba = Rgba::rgb(0x6b, 0x72, 0x80);
    /// Coordinate labels.
    pub const COORDS: Rgba = Rgba::rgb(0x11, 0x18, 0x27);
    /// Piece colors per side.
    pub const PIECE_TOP: Rgba = Rgba::rgb(0x1f, 0x29, 0x37);
    pub const PIECE_BOTTOM: Rgba = Rgba::rgb(0xf8, 0xfa, 0xfc);
}

// =============================================================================
// Cell Attributes (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Text attributes as a bitfield for efficient storage and comparison.
    ///
    /// Combine with bitwise OR: `Attr::BOLD | Attr::UNDERLINE`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attr: u8 {
        const NONE = 0;
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const INVERSE = 1 << 4;
    }
}

// =============================================================================
// Render Cell
// =============================================================================

/// One character cell of a render surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Unicode codepoint (32 for space).
    pub char: u32,
    /// Foreground color.
    pub fg: Rgba,
    /// Background color.
    pub bg: Rgba,
    /// Attribute flags (bold, dim, etc.).
    pub attrs: Attr,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            char: b' ' as u32,
            fg: Rgba::TERMINAL_DEFAULT,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs: Attr::NONE,
        }
    }
}

impl Cell {
    /// A cell showing `ch` in the given foreground over an untouched background.
    pub fn glyph(ch: char, fg: Rgba) -> Self {
        Self {
            char: ch as u32,
            fg,
            ..Self::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
