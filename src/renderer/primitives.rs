//! Drawing primitives over a frame buffer.
//!
//! Everything here paints in surface space; the painter resolves cell
//! indices to surface positions through the coords module before calling
//! in. Lines clip at the surface edge via the buffer's ignore-on-OOB
//! writes.

use crate::coords::{cell_center, Orientation};
use crate::renderer::FrameBuffer;
use crate::types::{Attr, CellIdx, Rgba};

/// Integral surface center of a cell.
pub fn center_of(
    idx: CellIdx,
    fb: &FrameBuffer,
    orientation: Orientation,
) -> (i32, i32) {
    let (x, y, _, _) = cell_center(idx, fb.width(), fb.height(), orientation);
    (x as i32, y as i32)
}

/// Glyph for a line segment heading in the given direction.
fn segment_glyph(dx: i32, dy: i32) -> char {
    if dx == 0 {
        '│'
    } else if dy == 0 {
        '─'
    } else if (dx > 0) == (dy > 0) {
        '╲'
    } else {
        '╱'
    }
}

/// Arrowhead glyph pointing along (dx, dy).
fn head_glyph(dx: i32, dy: i32) -> char {
    if dy.abs() > 2 * dx.abs() {
        if dy > 0 {
            '▼'
        } else {
            '▲'
        }
    } else if dx > 0 {
        '▶'
    } else {
        '◀'
    }
}

/// Bresenham line between two surface points.
pub fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba) {
    let glyph = segment_glyph(x1 - x0, y1 - y0);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        if x >= 0 && y >= 0 {
            fb.put_glyph(x as u16, y as u16, glyph, color, Attr::BOLD);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// An arrow between two cell centers: shaft plus arrowhead at the target.
pub fn draw_arrow(
    fb: &mut FrameBuffer,
    from: CellIdx,
    to: CellIdx,
    color: Rgba,
    orientation: Orientation,
) {
    let (x0, y0) = center_of(from, fb, orientation);
    let (x1, y1) = center_of(to, fb, orientation);
    draw_line(fb, x0, y0, x1, y1, color);
    if x1 >= 0 && y1 >= 0 {
        fb.put_glyph(
            x1 as u16,
            y1 as u16,
            head_glyph(x1 - x0, y1 - y0),
            color,
            Attr::BOLD,
        );
    }
}

/// Fill the whole cell area with a highlight background.
pub fn fill_cell(fb: &mut FrameBuffer, idx: CellIdx, color: Rgba, orientation: Orientation) {
    let (cx, cy, sx, sy) = cell_center(idx, fb.width(), fb.height(), orientation);
    let x0 = (cx - sx / 2.0) as i32;
    let y0 = (cy - sy / 2.0) as i32;
    for y in y0..(y0 + sy as i32).max(y0 + 1) {
        for x in x0..(x0 + sx as i32).max(x0 + 1) {
            if x >= 0 && y >= 0 {
                fb.blend_bg(x as u16, y as u16, color);
            }
        }
    }
}

/// The X marker used for remove targets.
pub fn draw_x(fb: &mut FrameBuffer, idx: CellIdx, color: Rgba, orientation: Orientation) {
    let (x, y) = center_of(idx, fb, orientation);
    if x >= 0 && y >= 0 {
        fb.put_glyph(x as u16, y as u16, '✗', color, Attr::BOLD);
    }
}

/// A ring outline around a cell, used for crown pulses and remove rings.
pub fn draw_ring(fb: &mut FrameBuffer, idx: CellIdx, color: Rgba, orientation: Orientation) {
    let (cx, cy, sx, sy) = cell_center(idx, fb.width(), fb.height(), orientation);
    let rx = (sx / 2.0 - 0.5).max(1.0);
    let ry = (sy / 2.0 - 0.5).max(1.0);
    // Sample the ellipse outline at cell resolution.
    let steps = ((rx + ry) * 4.0) as i32;
    for i in 0..steps.max(8) {
        let t = i as f32 / steps.max(8) as f32 * std::f32::consts::TAU;
        let x = (cx + rx * t.cos()) as i32;
        let y = (cy + ry * t.sin()) as i32;
        if x >= 0 && y >= 0 {
            fb.put_glyph(x as u16, y as u16, '·', color, Attr::BOLD);
        }
    }
}

/// A small numeric badge centered on a cell (captured-order and jump
/// numbering). Numbers above 99 are clamped to "++" to keep one cell pair.
pub fn draw_badge(
    fb: &mut FrameBuffer,
    idx: CellIdx,
    n: u32,
    color: Rgba,
    orientation: Orientation,
) {
    let text = if n > 99 {
        "++".to_string()
    } else {
        n.to_string()
    };
    let (x, y) = center_of(idx, fb, orientation);
    let x = x - text.len() as i32 / 2;
    if x >= 0 && y >= 0 {
        fb.put_str(x as u16, y as u16, &text, color, Attr::BOLD);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::rc_to_index;

    fn buffer() -> FrameBuffer {
        FrameBuffer::new(90, 45)
    }

    #[test]
    fn test_arrow_paints_both_endpoints() {
        let mut fb = buffer();
        let from = rc_to_index(4, 4);
        let to = rc_to_index(2, 4);
        draw_arrow(&mut fb, from, to, Rgba::WHITE, Orientation::BottomAtBottom);

        let (x0, y0) = center_of(from, &fb, Orientation::BottomAtBottom);
        let (x1, y1) = center_of(to, &fb, Orientation::BottomAtBottom);
        assert_ne!(fb.get(x0 as u16, y0 as u16).unwrap().char, b' ' as u32);
        assert_eq!(fb.get(x1 as u16, y1 as u16).unwrap().char, '▲' as u32);
    }

    #[test]
    fn test_fill_cell_sets_background() {
        let mut fb = buffer();
        let idx = rc_to_index(0, 0);
        fill_cell(&mut fb, idx, Rgba::rgb(1, 2, 3), Orientation::BottomAtBottom);
        let (x, y) = center_of(idx, &fb, Orientation::BottomAtBottom);
        assert_eq!(fb.get(x as u16, y as u16).unwrap().bg, Rgba::rgb(1, 2, 3));
    }

    #[test]
    fn test_badge_centered_on_cell() {
        let mut fb = buffer();
        let idx = rc_to_index(4, 4);
        draw_badge(&mut fb, idx, 7, Rgba::WHITE, Orientation::BottomAtBottom);
        let (x, y) = center_of(idx, &fb, Orientation::BottomAtBottom);
        assert_eq!(fb.get(x as u16, y as u16).unwrap().char, '7' as u32);
    }

    #[test]
    fn test_line_clips_offscreen() {
        let mut fb = FrameBuffer::new(10, 10);
        // Must not panic even when most of the line is outside.
        draw_line(&mut fb, -5, -5, 20, 20, Rgba::WHITE);
    }
}
