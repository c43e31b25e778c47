//! The authoritative 2D draw pipeline.
//!
//! One `Painter` owns the overlay state and composites the board plus every
//! overlay layer into its frame buffer in a fixed order (later layers
//! dominate earlier ones at the same cell). A suspend gate defers painting
//! while a simulation is in progress or a penalty decision is being
//! applied, collapsing bursts of mutation into a single repaint.
//!
//! # Layer order
//!
//! clear → grid/pips (flat only) → coordinate labels → selection
//! highlights → pieces (flat only) → captured-order numbers →
//! previous-move path (faded) → last-move path → undo flash → opening hint
//! arrow → remove markers → ignored-capture segments with jump numbers →
//! bulk force-paths (faded) → emphasized force-path → soufla undo arrow →
//! crown pulses.

use std::time::Instant;

use tracing::trace;

use crate::board::Board;
use crate::coords::{from_view_rc, Orientation};
use crate::overlay::{IgnoredSegment, OverlayState};
use crate::renderer::primitives::{
    center_of, draw_arrow, draw_badge, draw_ring, draw_x, fill_cell,
};
use crate::renderer::FrameBuffer;
use crate::types::{palette, piece_owner, piece_rank, Attr, CellIdx, Rank, Rgba, Side, BOARD_N};

/// Which back-end currently owns the board area.
///
/// In raised mode the flat pipeline still composites every overlay but
/// skips the grid and pieces; the mirror renders those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Flat,
    Raised,
}

/// Synthetic overlay values for the read-only penalty preview.
#[derive(Debug, Clone, Default)]
pub struct PreviewPayload {
    pub ignored_segments: Vec<IgnoredSegment>,
    pub marks: Vec<CellIdx>,
    pub force_paths_all: Vec<Vec<CellIdx>>,
    /// Emphasized path, origin first.
    pub active_force_path: Vec<CellIdx>,
    /// Ring around the cell the remove action would target.
    pub remove_ring: Option<CellIdx>,
}

// =============================================================================
// Painter
// =============================================================================

/// The authoritative renderer.
pub struct Painter {
    surface: FrameBuffer,
    overlays: OverlayState,
    orientation: Orientation,
    mode: ViewMode,
    sim_depth: u32,
    penalty_applying: bool,
    pending_draw: bool,
    paints: u64,
}

impl Painter {
    pub fn new(width: u16, height: u16, orientation: Orientation) -> Self {
        Self {
            surface: FrameBuffer::new(width, height),
            overlays: OverlayState::new(),
            orientation,
            mode: ViewMode::Flat,
            sim_depth: 0,
            penalty_applying: false,
            pending_draw: false,
            paints: 0,
        }
    }

    pub fn surface(&self) -> &FrameBuffer {
        &self.surface
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    /// Number of actual paints since creation. Deferred draws don't count.
    pub fn paints(&self) -> u64 {
        self.paints
    }

    pub fn overlays(&self) -> &OverlayState {
        &self.overlays
    }

    /// Batch entry point: mutate overlays without triggering a draw.
    /// Callers follow up with one `draw` once the batch is complete.
    pub fn overlays_mut(&mut self) -> &mut OverlayState {
        &mut self.overlays
    }

    /// Mutate overlays and immediately redraw (or record a pending draw
    /// while suspended). Returns true when a paint actually happened.
    pub fn update(&mut self, board: &Board, f: impl FnOnce(&mut OverlayState)) -> bool {
        f(&mut self.overlays);
        self.draw(board)
    }

    // -------------------------------------------------------------------------
    // Suspend gate
    // -------------------------------------------------------------------------

    /// Enter a speculative board mutation. Draws are deferred until the
    /// matching `sim_exit`.
    pub fn sim_enter(&mut self) {
        self.sim_depth += 1;
    }

    /// Leave a speculative board mutation; flushes exactly one pending
    /// draw once the last level is lifted.
    pub fn sim_exit(&mut self, board: &Board) {
        self.sim_depth = self.sim_depth.saturating_sub(1);
        self.flush_if_lifted(board);
    }

    pub fn sim_depth(&self) -> u32 {
        self.sim_depth
    }

    /// Gate draws while a penalty decision is being applied.
    pub fn set_penalty_applying(&mut self, applying: bool, board: &Board) {
        self.penalty_applying = applying;
        if !applying {
            self.flush_if_lifted(board);
        }
    }

    fn gated(&self) -> bool {
        self.sim_depth > 0 || self.penalty_applying
    }

    fn flush_if_lifted(&mut self, board: &Board) {
        if !self.gated() && self.pending_draw {
            self.pending_draw = false;
            self.draw(board);
        }
    }

    // -------------------------------------------------------------------------
    // Draw
    // -------------------------------------------------------------------------

    /// Composite the board and overlays, or record a pending draw while
    /// gated. Returns true when a paint happened.
    pub fn draw(&mut self, board: &Board) -> bool {
        self.draw_at(board, Instant::now())
    }

    /// `draw` with an explicit clock, the entry point render ticks use.
    pub fn draw_at(&mut self, board: &Board, now: Instant) -> bool {
        if self.gated() {
            trace!(sim_depth = self.sim_depth, "draw deferred");
            self.pending_draw = true;
            return false;
        }
        self.overlays.prune_expired(now);
        compose(
            &mut self.surface,
            board,
            &self.overlays,
            self.mode,
            self.orientation,
        );
        self.paints += 1;
        true
    }

    /// Render candidate penalty paths onto an arbitrary detached surface.
    ///
    /// Swaps in the synthetic overlay values, forces flat mode, paints, and
    /// restores prior state exactly. The primary surface, paint counter,
    /// and gate are untouched.
    pub fn render_penalty_preview(
        &mut self,
        target: &mut FrameBuffer,
        board: &Board,
        payload: &PreviewPayload,
    ) {
        let saved = self.overlays.clone();

        self.overlays.clear_soufla_fx();
        self.overlays.ignored_segments = payload.ignored_segments.clone();
        self.overlays.remove_marks = payload.marks.clone();
        self.overlays.force_paths_all = payload.force_paths_all.clone();
        self.overlays.force_path_active = payload.active_force_path.clone();

        compose(target, board, &self.overlays, ViewMode::Flat, self.orientation);
        if let Some(ring) = payload.remove_ring {
            draw_ring(target, ring, palette::DANGER, self.orientation);
        }

        self.overlays = saved;
    }
}

// =============================================================================
// Compositing
// =============================================================================

fn draw_path(
    fb: &mut FrameBuffer,
    from: CellIdx,
    path: &[CellIdx],
    color: Rgba,
    orientation: Orientation,
) {
    let mut cur = from;
    for &next in path {
        draw_arrow(fb, cur, next, color, orientation);
        cur = next;
    }
}

fn draw_grid(fb: &mut FrameBuffer, orientation: Orientation) {
    for idx in 0..crate::types::N_CELLS {
        let (x, y) = center_of(idx, fb, orientation);
        if x >= 0 && y >= 0 {
            fb.put_glyph(x as u16, y as u16, '·', palette::GRID, Attr::DIM);
        }
    }
}

fn draw_coord_labels(fb: &mut FrameBuffer, orientation: Orientation) {
    let step_x = fb.width() as f32 / BOARD_N as f32;
    let step_y = fb.height() as f32 / BOARD_N as f32;
    for v in 0..BOARD_N {
        // File letters along the bottom edge, rank digits down the left,
        // both named in board space so flipping relabels correctly.
        let (_, file_col) = from_view_rc(BOARD_N - 1, v, orientation);
        let x = (v as f32 * step_x + step_x / 2.0) as u16;
        fb.put_glyph(
            x,
            fb.height().saturating_sub(1),
            (b'a' + file_col) as char,
            palette::COORDS,
            Attr::NONE,
        );

        let (rank_row, _) = from_view_rc(v, 0, orientation);
        let y = (v as f32 * step_y + step_y / 2.0) as u16;
        fb.put_glyph(
            0,
            y,
            (b'0' + (BOARD_N - rank_row)) as char,
            palette::COORDS,
            Attr::NONE,
        );
    }
}

fn draw_pieces(fb: &mut FrameBuffer, board: &Board, orientation: Orientation) {
    for (idx, v) in board.iter() {
        let Some(owner) = piece_owner(v) else { continue };
        let color = match owner {
            Side::Top => palette::PIECE_TOP,
            Side::Bottom => palette::PIECE_BOTTOM,
        };
        let glyph = match piece_rank(v) {
            Some(Rank::King) => '◉',
            _ => '●',
        };
        let (x, y) = center_of(idx, fb, orientation);
        if x >= 0 && y >= 0 {
            fb.put_glyph(x as u16, y as u16, glyph, color, Attr::BOLD);
        }
    }
}

/// The full layer stack, also used by the preview entry point against a
/// detached surface.
fn compose(
    fb: &mut FrameBuffer,
    board: &Board,
    ov: &OverlayState,
    mode: ViewMode,
    orientation: Orientation,
) {
    fb.clear();

    let flat = mode == ViewMode::Flat;
    if flat {
        draw_grid(fb, orientation);
    }
    if ov.show_coords {
        draw_coord_labels(fb, orientation);
    }
    for &idx in &ov.highlight_cells {
        fill_cell(fb, idx, palette::SELECTION, orientation);
    }
    if flat {
        draw_pieces(fb, board, orientation);
    }
    for (i, &idx) in ov.captured_order.iter().enumerate() {
        draw_badge(fb, idx, i as u32 + 1, palette::DANGER_TEXT, orientation);
    }
    if let Some(prev) = &ov.prev_move {
        draw_path(fb, prev.from, &prev.path, prev.color().fade(0.75), orientation);
    }
    if let Some(last) = &ov.last_move {
        draw_path(fb, last.from, &last.path, last.color(), orientation);
    }
    if let Some(flash) = &ov.undo_flash {
        // Drawn end-to-start so the arrows point back toward the origin.
        for pair in flash.nodes.windows(2).rev() {
            draw_arrow(fb, pair[1], pair[0], palette::ALERT, orientation);
        }
    }
    if let Some((from, to)) = ov.opening_arrow {
        draw_arrow(fb, from, to, palette::DANGER, orientation);
    }
    for &mark in &ov.remove_marks {
        draw_x(fb, mark, palette::DANGER, orientation);
    }
    for seg in &ov.ignored_segments {
        let mut cur = seg.from;
        for (i, &next) in seg.path.iter().enumerate() {
            draw_arrow(fb, cur, next, palette::DANGER, orientation);
            if let Some(&jumped) = seg.jumps.get(i) {
                draw_badge(fb, jumped, i as u32 + 1, palette::DANGER_TEXT, orientation);
            }
            cur = next;
        }
    }
    let bulk = palette::FORCE.fade(0.55);
    for path in &ov.force_paths_all {
        for pair in path.windows(2) {
            draw_arrow(fb, pair[0], pair[1], bulk, orientation);
        }
    }
    for pair in ov.force_path_active.windows(2) {
        draw_arrow(fb, pair[0], pair[1], palette::FORCE_STRONG, orientation);
    }
    if let Some(nodes) = &ov.soufla_undo_arrow {
        for pair in nodes.windows(2) {
            draw_arrow(fb, pair[0], pair[1], palette::ALERT, orientation);
        }
    }
    for pulse in &ov.crown_pulses {
        draw_ring(fb, pulse.idx, palette::CROWN, orientation);
    }
}

// =============================================================================
// Tests
// =============================================================================
