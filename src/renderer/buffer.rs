//! Frame buffer: the in-memory render surface both back-ends paint into.

use crate::types::{Attr, Cell, Rgba};

/// A rectangular grid of render cells.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    /// Create a buffer filled with default (blank) cells.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    fn offset(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Cell at (x, y), or `None` out of bounds.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.offset(x, y).map(|i| &self.cells[i])
    }

    /// Overwrite the cell at (x, y). Out-of-bounds writes are ignored,
    /// which lets drawing primitives clip at the surface edge for free.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.offset(x, y) {
            self.cells[i] = cell;
        }
    }

    /// Put a glyph, keeping the existing background.
    #[inline]
    pub fn put_glyph(&mut self, x: u16, y: u16, ch: char, fg: Rgba, attrs: Attr) {
        if let Some(i) = self.offset(x, y) {
            let bg = self.cells[i].bg;
            self.cells[i] = Cell {
                char: ch as u32,
                fg: Rgba::blend(fg, self.cells[i].fg),
                bg,
                attrs,
            };
        }
    }

    /// Blend a background color over the cell at (x, y).
    #[inline]
    pub fn blend_bg(&mut self, x: u16, y: u16, bg: Rgba) {
        if let Some(i) = self.offset(x, y) {
            self.cells[i].bg = Rgba::blend(bg, self.cells[i].bg);
        }
    }

    /// Write a short string left-to-right starting at (x, y), clipped at
    /// the right edge.
    pub fn put_str(&mut self, x: u16, y: u16, s: &str, fg: Rgba, attrs: Attr) {
        for (i, ch) in s.chars().enumerate() {
            let cx = x as usize + i;
            if cx >= self.width as usize {
                break;
            }
            self.put_glyph(cx as u16, y, ch, fg, attrs);
        }
    }

    /// Reset every cell to blank.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }
}

// =============================================================================
// Tests
// =============================================================================
