//! Differential presenter.
//!
//! Compares the current frame to the previous one and only emits cells
//! that changed, wrapped in a synchronized update so the terminal applies
//! the whole frame at once. This keeps repaints flicker-free even when the
//! painter redraws the full surface every time.

use std::io::{self, Write};

use crossterm::{
    cursor,
    style::{Attribute, Color, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, BeginSynchronizedUpdate, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
    event::{DisableMouseCapture, EnableMouseCapture},
    QueueableCommand,
};

use crate::renderer::FrameBuffer;
use crate::types::{Attr, Cell, Rgba};

fn term_color(c: Rgba) -> Color {
    if c.is_terminal_default() {
        Color::Reset
    } else {
        Color::Rgb {
            r: c.r as u8,
            g: c.g as u8,
            b: c.b as u8,
        }
    }
}

/// Tracks the last emitted style so unchanged runs skip the escape codes.
#[derive(Default)]
struct StyleState {
    fg: Option<Rgba>,
    bg: Option<Rgba>,
    attrs: Option<Attr>,
}

impl StyleState {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn apply(&mut self, out: &mut impl Write, cell: &Cell) -> io::Result<()> {
        if self.attrs != Some(cell.attrs) {
            out.queue(SetAttribute(Attribute::Reset))?;
            if cell.attrs.contains(Attr::BOLD) {
                out.queue(SetAttribute(Attribute::Bold))?;
            }
            if cell.attrs.contains(Attr::DIM) {
                out.queue(SetAttribute(Attribute::Dim))?;
            }
            if cell.attrs.contains(Attr::ITALIC) {
                out.queue(SetAttribute(Attribute::Italic))?;
            }
            if cell.attrs.contains(Attr::UNDERLINE) {
                out.queue(SetAttribute(Attribute::Underlined))?;
            }
            if cell.attrs.contains(Attr::INVERSE) {
                out.queue(SetAttribute(Attribute::Reverse))?;
            }
            self.attrs = Some(cell.attrs);
            // Attribute reset clears colors too.
            self.fg = None;
            self.bg = None;
        }
        if self.fg != Some(cell.fg) {
            out.queue(SetForegroundColor(term_color(cell.fg)))?;
            self.fg = Some(cell.fg);
        }
        if self.bg != Some(cell.bg) {
            out.queue(SetBackgroundColor(term_color(cell.bg)))?;
            self.bg = Some(cell.bg);
        }
        Ok(())
    }
}

/// Differential presenter for fullscreen mode.
///
/// Keeps the previous frame to enable diff-based output; only cells that
/// changed since the last frame are written.
pub struct DiffPresenter<W: Write> {
    out: W,
    style: StyleState,
    previous: Option<FrameBuffer>,
}

impl DiffPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> DiffPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            style: StyleState::default(),
            previous: None,
        }
    }

    /// Present a frame, emitting only changed cells.
    ///
    /// Returns true if any cell was written.
    pub fn present(&mut self, buffer: &FrameBuffer) -> io::Result<bool> {
        let mut has_changes = false;

        self.out.queue(BeginSynchronizedUpdate)?;
        self.style.reset();

        let width = buffer.width();
        let height = buffer.height();
        let same_size = matches!(
            &self.previous,
            Some(prev) if prev.width() == width && prev.height() == height
        );

        for y in 0..height {
            for x in 0..width {
                let cell = match buffer.get(x, y) {
                    Some(c) => c,
                    None => continue,
                };
                let changed = match (&self.previous, same_size) {
                    (Some(prev), true) => prev.get(x, y) != Some(cell),
                    _ => true,
                };
                if changed {
                    has_changes = true;
                    self.emit(x, y, *cell)?;
                }
            }
        }

        self.out.queue(EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.previous = Some(buffer.clone());
        Ok(has_changes)
    }

    fn emit(&mut self, x: u16, y: u16, cell: Cell) -> io::Result<()> {
        self.out.queue(cursor::MoveTo(x, y))?;
        self.style.apply(&mut self.out, &cell)?;
        let ch = char::from_u32(cell.char).unwrap_or(' ');
        write!(self.out, "{ch}")?;
        Ok(())
    }

    /// Drop the previous frame; the next present is a full redraw.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    /// Whether a previous frame exists to diff against.
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    /// Enter fullscreen (alternate screen, raw mode, hidden cursor).
    pub fn enter_fullscreen(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        self.out.queue(EnterAlternateScreen)?;
        self.out.queue(cursor::Hide)?;
        self.out.flush()?;
        self.invalidate();
        Ok(())
    }

    /// Leave fullscreen and restore the terminal.
    pub fn exit_fullscreen(&mut self) -> io::Result<()> {
        self.out.queue(SetAttribute(Attribute::Reset))?;
        self.out.queue(cursor::Show)?;
        self.out.queue(LeaveAlternateScreen)?;
        self.out.flush()?;
        disable_raw_mode()
    }

    /// Enable mouse reporting.
    pub fn enable_mouse(&mut self) -> io::Result<()> {
        self.out.queue(EnableMouseCapture)?;
        self.out.flush()
    }

    /// Disable mouse reporting.
    pub fn disable_mouse(&mut self) -> io::Result<()> {
        self.out.queue(DisableMouseCapture)?;
        self.out.flush()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presenter_diffs_changed_cells_only() {
        let mut presenter = DiffPresenter::new(Vec::new());
        let mut fb = FrameBuffer::new(4, 2);

        assert!(presenter.present(&fb).unwrap());
        assert!(presenter.has_previous());

        // Identical frame: nothing to emit.
        assert!(!presenter.present(&fb).unwrap());

        fb.set(1, 1, Cell::glyph('x', Rgba::WHITE));
        assert!(presenter.present(&fb).unwrap());
    }

    #[test]
    fn test_invalidate_forces_full_redraw() {
        let mut presenter = DiffPresenter::new(Vec::new());
        let fb = FrameBuffer::new(2, 2);
        presenter.present(&fb).unwrap();
        presenter.invalidate();
        assert!(!presenter.has_previous());
        assert!(presenter.present(&fb).unwrap());
    }

    #[test]
    fn test_size_change_is_full_redraw() {
        let mut presenter = DiffPresenter::new(Vec::new());
        presenter.present(&FrameBuffer::new(2, 2)).unwrap();
        assert!(presenter.present(&FrameBuffer::new(3, 2)).unwrap());
    }
}
