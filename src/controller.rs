//! Turn and input controller.
//!
//! One `Game` owns the board, the overlay-bearing painter and the raised
//! mirror view, and sequences every interaction: selection, move and
//! capture application, chain continuation, forced-opening gating,
//! penalty resolution, undo, and opponent scheduling. Legality and
//! penalty evaluation are delegated to the [`Rules`] collaborator; the
//! controller only consumes its answers.
//!
//! Each gating concern is a tagged state ([`Phase`], [`ChainState`],
//! [`OpeningState`]) rather than a set of booleans, so every compound
//! condition is a single match.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::board::{Board, Snapshot};
use crate::coords::{cell_at, Orientation};
use crate::mirror::Mirror;
use crate::opening::{table, OpeningStep, OPENING_PLIES};
use crate::persist::{SaveData, Settings, SAVE_VERSION};
use crate::renderer::{FrameBuffer, Painter, ViewMode};
use crate::rules::{OpponentDriver, PenaltyDecision, PendingPenalty, Rules, TurnReport};
use crate::soufla::{force_candidates, remove_target, Picker, PickerAction};
use crate::types::{king, piece_owner, CellIdx, Side};

// =============================================================================
// Tagged states
// =============================================================================

/// High-level game phase.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Normal turn flow.
    Playing,
    /// A penalty is pending; ordinary move input is rejected until the
    /// penalizer commits a remedy.
    AwaitingPenalty(PendingPenalty),
    Over { winner: Option<Side> },
}

/// Capture-chain progress within one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Inactive,
    Active {
        started_from: CellIdx,
        anchor: CellIdx,
        captures: u32,
    },
}

/// Scripted-opening progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningState {
    Inactive,
    Active { base: Side, ply: u8 },
}

// =============================================================================
// Notices
// =============================================================================

/// User-visible rejection and status notices. The controller is
/// locale-agnostic; hosts render `key()` through their translation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    GameOver,
    WaitTurn,
    AwaitingPenalty,
    OpeningExpected { from: CellIdx, to: CellIdx },
    OpeningStepByStep,
    OpeningChainIncomplete,
    IllegalMove,
    NotAnOffender,
    UndoUnavailable,
    UndoBlockedInOpening,
    RaisedViewUnavailable,
}

impl Notice {
    pub fn key(&self) -> &'static str {
        match self {
            Notice::GameOver => "status.game_over",
            Notice::WaitTurn => "status.wait_turn",
            Notice::AwaitingPenalty => "status.awaiting_penalty",
            Notice::OpeningExpected { .. } => "opening.expected",
            Notice::OpeningStepByStep => "opening.step_by_step",
            Notice::OpeningChainIncomplete => "opening.finish_chain",
            Notice::IllegalMove => "move.illegal",
            Notice::NotAnOffender => "soufla.not_offender",
            Notice::UndoUnavailable => "undo.empty",
            Notice::UndoBlockedInOpening => "undo.opening",
            Notice::RaisedViewUnavailable => "view.raised_unavailable",
        }
    }
}

/// What a processed click amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Click on nothing actionable.
    Ignored,
    Rejected(Notice),
    Selected(CellIdx),
    /// Selection cleared by re-clicking it.
    Cleared,
    Moved {
        from: CellIdx,
        to: CellIdx,
        capture: bool,
        chain_continues: bool,
    },
    PenaltyOffenderSelected(CellIdx),
    PenaltyCommitted,
}

// =============================================================================
// Setup
// =============================================================================

/// Initial game configuration.
#[derive(Debug, Clone, Copy)]
pub struct GameOptions {
    /// The side the local player controls.
    pub local_side: Side,
    /// The side that moves first (and anchors the opening table).
    pub first_mover: Side,
    /// Whether the scripted opening is in force.
    pub forced_opening: bool,
    /// The side played by the automated opponent, if any.
    pub automated: Option<Side>,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            local_side: Side::Bottom,
            first_mover: Side::Bottom,
            forced_opening: true,
            automated: None,
        }
    }
}

// =============================================================================
// Game
// =============================================================================

pub struct Game<R: Rules> {
    rules: R,
    board: Board,
    mover: Side,
    local_side: Side,
    automated: Option<Side>,
    first_mover: Side,
    forced_opening: bool,

    phase: Phase,
    chain: ChainState,
    opening: OpeningState,
    selection: Option<CellIdx>,
    picker: Picker,

    /// Rollback target and penalty-report baseline for the current turn.
    turn_start: Snapshot,
    /// Chain origin and ordered landing cells applied so far this turn.
    turn_from: Option<CellIdx>,
    turn_path: Vec<CellIdx>,
    /// History length when the current turn began, for turn rollback.
    turn_history_mark: usize,

    history: Vec<Snapshot>,
    move_count: u32,
    last_moved_from: Option<CellIdx>,
    last_moved_to: Option<CellIdx>,
    last_move_from: Option<CellIdx>,
    last_move_path: Option<Vec<CellIdx>>,
    /// Penalty aftermath annotations stay up until the local side's next
    /// turn ends.
    soufla_fx_armed: bool,

    painter: Painter,
    mirror: Mirror,
    opponent: Option<Box<dyn OpponentDriver>>,
    notice: Option<Notice>,
}

impl<R: Rules> Game<R> {
    pub fn new(rules: R, options: GameOptions, width: u16, height: u16) -> Self {
        let orientation = match options.local_side {
            Side::Bottom => Orientation::BottomAtBottom,
            Side::Top => Orientation::TopAtBottom,
        };
        let board = Board::starting();
        let opening = if options.forced_opening {
            OpeningState::Active {
                base: options.first_mover,
                ply: 0,
            }
        } else {
            OpeningState::Inactive
        };
        let mut game = Self {
            rules,
            board,
            mover: options.first_mover,
            local_side: options.local_side,
            automated: options.automated,
            first_mover: options.first_mover,
            forced_opening: options.forced_opening,
            phase: Phase::Playing,
            chain: ChainState::Inactive,
            opening,
            selection: None,
            picker: Picker::new(),
            turn_start: placeholder_snapshot(options.first_mover),
            turn_from: None,
            turn_path: Vec::new(),
            turn_history_mark: 0,
            history: Vec::new(),
            move_count: 0,
            last_moved_from: None,
            last_moved_to: None,
            last_move_from: None,
            last_move_path: None,
            soufla_fx_armed: false,
            painter: Painter::new(width, height, orientation),
            mirror: Mirror::new(orientation),
            opponent: None,
            notice: None,
        };
        game.turn_start = game.snapshot();
        game
    }

    pub fn set_opponent(&mut self, driver: Box<dyn OpponentDriver>) {
        self.opponent = Some(driver);
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn mover(&self) -> Side {
        self.mover
    }

    pub fn selection(&self) -> Option<CellIdx> {
        self.selection
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn chain(&self) -> ChainState {
        self.chain
    }

    pub fn opening(&self) -> OpeningState {
        self.opening
    }

    pub fn pending_penalty(&self) -> Option<&PendingPenalty> {
        match &self.phase {
            Phase::AwaitingPenalty(p) => Some(p),
            _ => None,
        }
    }

    pub fn painter(&self) -> &Painter {
        &self.painter
    }

    pub fn painter_mut(&mut self) -> &mut Painter {
        &mut self.painter
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    /// The last notice raised, consumed on read.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    fn raise(&mut self, notice: Notice) {
        debug!(key = notice.key(), "notice");
        self.notice = Some(notice);
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    /// Capture the full mutable state.
    pub fn snapshot(&self) -> Snapshot {
        let (forced_enabled, forced_ply) = match self.opening {
            OpeningState::Active { ply, .. } => (true, ply),
            OpeningState::Inactive => (false, OPENING_PLIES),
        };
        let (in_chain, chain_anchor) = match self.chain {
            ChainState::Active { anchor, .. } => (true, Some(anchor)),
            ChainState::Inactive => (false, None),
        };
        let (game_over, winner) = match self.phase {
            Phase::Over { winner } => (true, winner),
            _ => (false, None),
        };
        Snapshot {
            board: self.board.clone(),
            mover: self.mover,
            in_chain,
            chain_anchor,
            last_moved_from: self.last_moved_from,
            last_moved_to: self.last_moved_to,
            last_move_from: self.last_move_from,
            last_move_path: self.last_move_path.clone(),
            move_count: self.move_count,
            forced_enabled,
            forced_ply,
            game_over,
            winner,
        }
    }

    /// Restore from a snapshot and rebuild derived state and overlays.
    pub fn restore(&mut self, snap: Snapshot) {
        self.board = snap.board;
        self.mover = snap.mover;
        self.move_count = snap.move_count;
        self.last_moved_from = snap.last_moved_from;
        self.last_moved_to = snap.last_moved_to;
        self.last_move_from = snap.last_move_from;
        self.last_move_path = snap.last_move_path;

        self.opening = if snap.forced_enabled && snap.forced_ply < OPENING_PLIES {
            // The base side is recoverable from ply parity.
            let base = if snap.forced_ply % 2 == 0 {
                snap.mover
            } else {
                snap.mover.opponent()
            };
            OpeningState::Active {
                base,
                ply: snap.forced_ply,
            }
        } else {
            OpeningState::Inactive
        };
        self.chain = match snap.chain_anchor {
            Some(anchor) if snap.in_chain => ChainState::Active {
                // Mid-chain origin is not snapshotted; the last hop's
                // origin is the closest recoverable value.
                started_from: snap.last_moved_from.unwrap_or(anchor),
                anchor,
                captures: 0,
            },
            _ => ChainState::Inactive,
        };
        self.phase = if snap.game_over {
            Phase::Over {
                winner: snap.winner,
            }
        } else {
            Phase::Playing
        };
        self.selection = None;
        self.picker.dismiss();
        self.turn_from = None;
        self.turn_path.clear();
        self.soufla_fx_armed = false;
        self.turn_start = self.snapshot();
        self.turn_history_mark = self.history.len();

        let last_side = self.mover.opponent();
        let (lm_from, lm_path) = (self.last_move_from, self.last_move_path.clone());
        self.painter.update(&self.board, |ov| {
            ov.set_highlights(Vec::new());
            ov.clear_soufla_fx();
            ov.clear_captured_order();
            ov.clear_opening_arrow();
            match (lm_from, lm_path) {
                (Some(from), Some(path)) => ov.set_last_move(from, path, last_side),
                _ => ov.clear_last_move(),
            }
        });
        self.mirror.invalidate();
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Build a resumable save payload. `chain_timer_ms` is the elapsed
    /// chain timer the host is tracking.
    pub fn save(&self, chain_timer_ms: u64) -> SaveData {
        SaveData {
            version: SAVE_VERSION,
            snapshot: self.snapshot(),
            opening_base: self.first_mover,
            settings: Settings {
                local_side: self.local_side,
                automated: self.automated,
                forced_opening: self.forced_opening,
                show_coords: self.painter.overlays().show_coords,
            },
            history: self.history.clone(),
            chain_timer_ms,
        }
    }

    /// Resume from a save payload. Returns the saved chain-timer
    /// elapsed milliseconds for the host to restart its timer from.
    pub fn load(&mut self, save: SaveData) -> u64 {
        self.local_side = save.settings.local_side;
        self.automated = save.settings.automated;
        self.forced_opening = save.settings.forced_opening;
        self.first_mover = save.opening_base;
        self.history = save.history;

        let orientation = match self.local_side {
            Side::Bottom => Orientation::BottomAtBottom,
            Side::Top => Orientation::TopAtBottom,
        };
        self.painter.set_orientation(orientation);
        self.mirror.set_orientation(orientation);
        self.painter.overlays_mut().show_coords = save.settings.show_coords;

        self.restore(save.snapshot);
        save.chain_timer_ms
    }

    // -------------------------------------------------------------------------
    // Input entry points
    // -------------------------------------------------------------------------

    /// Click on the flat surface, in surface coordinates.
    pub fn click_at(&mut self, x: u16, y: u16) -> ClickOutcome {
        let surface = self.painter.surface();
        match cell_at(x, y, surface.width(), surface.height(), self.painter.orientation()) {
            Some(idx) => self.click_cell(idx),
            None => ClickOutcome::Ignored,
        }
    }

    /// Pointer event on the raised surface: remapped onto the flat
    /// surface and fed through the one canonical handler.
    pub fn click_raised(&mut self, x: u16, y: u16) -> ClickOutcome {
        let surface = self.painter.surface();
        let (w, h) = (surface.width(), surface.height());
        match self.mirror.pointer_to_flat(x, y, w, h) {
            Some((fx, fy)) => self.click_at(fx, fy),
            None => ClickOutcome::Ignored,
        }
    }

    /// The canonical click handler.
    pub fn click_cell(&mut self, idx: CellIdx) -> ClickOutcome {
        match &self.phase {
            Phase::Over { .. } => {
                self.raise(Notice::GameOver);
                return ClickOutcome::Rejected(Notice::GameOver);
            }
            Phase::AwaitingPenalty(_) => return self.penalty_click(idx),
            Phase::Playing => {}
        }
        if self.automated == Some(self.mover) {
            self.raise(Notice::WaitTurn);
            return ClickOutcome::Rejected(Notice::WaitTurn);
        }

        // Re-clicking the selection clears it, except mid-chain where the
        // anchor must stay selected.
        if self.selection == Some(idx) && matches!(self.chain, ChainState::Inactive) {
            self.selection = None;
            self.painter.update(&self.board, |ov| ov.set_highlights(Vec::new()));
            return ClickOutcome::Cleared;
        }
        if piece_owner(self.board.get(idx)) == Some(self.mover) {
            return self.select(idx);
        }
        match self.selection {
            Some(from) => self.try_move(from, idx),
            None => ClickOutcome::Ignored,
        }
    }

    fn select(&mut self, idx: CellIdx) -> ClickOutcome {
        // During a chain only the anchor may stay selected.
        if let ChainState::Active { anchor, .. } = self.chain {
            if idx != anchor {
                self.raise(Notice::IllegalMove);
                return ClickOutcome::Rejected(Notice::IllegalMove);
            }
        }
        // During the opening only the scripted origin is selectable.
        if let Some((ef, et)) = self.expected_opening_hop() {
            if idx != ef {
                self.show_opening_hint(ef, et);
                let notice = Notice::OpeningExpected { from: ef, to: et };
                self.raise(notice.clone());
                return ClickOutcome::Rejected(notice);
            }
        }
        self.selection = Some(idx);
        self.painter.update(&self.board, |ov| ov.set_highlights(vec![idx]));
        ClickOutcome::Selected(idx)
    }

    // -------------------------------------------------------------------------
    // Moves
    // -------------------------------------------------------------------------

    /// Apply `from -> to` for the current mover. Public so scripted and
    /// automated moves share the exact path clicks take.
    pub fn try_move(&mut self, from: CellIdx, to: CellIdx) -> ClickOutcome {
        if let Some((ef, et)) = self.expected_opening_hop() {
            if (from, to) != (ef, et) {
                let step = self.current_opening_step();
                self.show_opening_hint(ef, et);
                // Attempting the whole chain opening in one jump gets its
                // own notice; the move must be played hop by hop.
                let notice = match step {
                    Some(s) if s.is_chain() && from == s.from() && to == s.final_to() => {
                        Notice::OpeningStepByStep
                    }
                    _ => Notice::OpeningExpected { from: ef, to: et },
                };
                self.raise(notice.clone());
                return ClickOutcome::Rejected(notice);
            }
        }
        if !self.rules.is_legal(&self.board, self.mover, from, to) {
            self.raise(Notice::IllegalMove);
            return ClickOutcome::Rejected(Notice::IllegalMove);
        }
        let jumped = self.rules.classify_capture(&self.board, from, to);
        if matches!(self.chain, ChainState::Active { .. }) && jumped.is_none() {
            self.raise(Notice::IllegalMove);
            return ClickOutcome::Rejected(Notice::IllegalMove);
        }

        self.history.push(self.snapshot());
        if self.turn_path.is_empty() {
            self.turn_from = Some(from);
            self.painter.overlays_mut().clear_captured_order();
        }
        self.turn_path.push(to);
        self.board.apply_move(from, to, jumped);
        self.move_count += 1;
        self.last_moved_from = Some(from);
        self.last_moved_to = Some(to);
        if let Some(j) = jumped {
            self.painter.overlays_mut().push_captured(j);
        }
        debug!(from, to, capture = jumped.is_some(), "move applied");

        let capture = jumped.is_some();
        if capture && self.rules.has_deeper_capture(&self.board, to) {
            let (started_from, captures) = match self.chain {
                ChainState::Active {
                    started_from,
                    captures,
                    ..
                } => (started_from, captures + 1),
                ChainState::Inactive => (from, 1),
            };
            self.chain = ChainState::Active {
                started_from,
                anchor: to,
                captures,
            };
            self.selection = Some(to);
            self.redraw_move_in_progress(to);
            return ClickOutcome::Moved {
                from,
                to,
                capture,
                chain_continues: true,
            };
        }

        if capture {
            self.chain = match self.chain {
                ChainState::Active {
                    started_from,
                    captures,
                    ..
                } => ChainState::Active {
                    started_from,
                    anchor: to,
                    captures: captures + 1,
                },
                ChainState::Inactive => ChainState::Active {
                    started_from: from,
                    anchor: to,
                    captures: 1,
                },
            };
        }
        if !self.end_turn(to) {
            return ClickOutcome::Rejected(Notice::OpeningChainIncomplete);
        }
        ClickOutcome::Moved {
            from,
            to,
            capture,
            chain_continues: false,
        }
    }

    fn redraw_move_in_progress(&mut self, anchor: CellIdx) {
        let from = self.turn_from.unwrap_or(anchor);
        let path = self.turn_path.clone();
        let side = self.mover;
        self.painter.update(&self.board, |ov| {
            ov.set_highlights(vec![anchor]);
            ov.set_last_move(from, path, side);
        });
    }

    /// Explicitly stop an active capture chain at its anchor and finalize
    /// the turn, even though the chain piece could keep jumping. Stopping
    /// short is the mover's call; the rules collaborator judges it at
    /// finish-turn. No-op when no chain is active.
    pub fn end_chain(&mut self) -> Result<(), Notice> {
        match &self.phase {
            Phase::Over { .. } => {
                self.raise(Notice::GameOver);
                return Err(Notice::GameOver);
            }
            Phase::AwaitingPenalty(_) => {
                self.raise(Notice::AwaitingPenalty);
                return Err(Notice::AwaitingPenalty);
            }
            Phase::Playing => {}
        }
        if self.automated == Some(self.mover) {
            self.raise(Notice::WaitTurn);
            return Err(Notice::WaitTurn);
        }
        let ChainState::Active { anchor, .. } = self.chain else {
            return Ok(());
        };
        info!(anchor, "chain ended by mover");
        self.selection = None;
        if !self.end_turn(anchor) {
            return Err(Notice::OpeningChainIncomplete);
        }
        Ok(())
    }

    /// Finalize the turn. Returns false when the turn was rolled back
    /// (an incomplete scripted chain opening).
    fn end_turn(&mut self, last_to: CellIdx) -> bool {
        // Scripted-opening bookkeeping.
        if let OpeningState::Active { base, ply } = self.opening {
            let step = &table(base)[ply as usize];
            if step.is_chain() && last_to != step.final_to() {
                warn!(ply, "scripted chain opening ended early; rolling back");
                self.rollback_turn();
                self.raise(Notice::OpeningChainIncomplete);
                return false;
            }
            let next = ply + 1;
            self.opening = if next >= OPENING_PLIES {
                info!("scripted opening complete");
                OpeningState::Inactive
            } else {
                OpeningState::Active { base, ply: next }
            };
            self.painter.overlays_mut().clear_opening_arrow();
        }

        // Deferred promotion.
        if self.rules.promotes(&self.board, last_to) {
            if let Some(owner) = piece_owner(self.board.get(last_to)) {
                self.board.set(last_to, king(owner));
                self.painter
                    .overlays_mut()
                    .queue_crown(last_to, Instant::now());
                info!(idx = last_to, "promotion");
            }
        }

        // Penalty evaluation.
        let (started_from, captures_done) = match self.chain {
            ChainState::Active {
                started_from,
                captures,
                ..
            } => (Some(started_from), captures),
            ChainState::Inactive => (None, 0),
        };
        let report = TurnReport {
            mover: self.mover,
            started_from,
            captures_done,
            turn_start: &self.turn_start,
            last_moved_from: self.last_moved_from,
            last_moved_to: self.last_moved_to,
            last_move_from: self.turn_from,
            last_move_path: Some(&self.turn_path),
        };
        let pending = self.rules.finish_turn(&self.board, &report);

        // Commit move-path overlays.
        self.last_move_from = self.turn_from;
        self.last_move_path = Some(self.turn_path.clone());
        let (from, path, side) = (
            self.turn_from.unwrap_or(last_to),
            self.turn_path.clone(),
            self.mover,
        );
        // Penalty aftermath annotations are sticky until the local side
        // finishes its next turn.
        let clear_fx = self.soufla_fx_armed && self.mover == self.local_side;
        self.painter.update(&self.board, |ov| {
            ov.set_highlights(Vec::new());
            ov.promote_last_to_prev();
            ov.set_last_move(from, path, side);
            if clear_fx {
                ov.clear_soufla_fx();
            }
        });
        if clear_fx {
            self.soufla_fx_armed = false;
        }

        // Turn switch.
        let prev_mover = self.mover;
        self.mover = self.mover.opponent();
        self.selection = None;
        self.chain = ChainState::Inactive;
        self.turn_from = None;
        self.turn_path.clear();
        self.turn_start = self.snapshot();
        self.turn_history_mark = self.history.len();

        if self.board.count(self.mover) == 0 {
            self.phase = Phase::Over {
                winner: Some(prev_mover),
            };
            info!(winner = ?prev_mover, "game over");
            return true;
        }

        if let Some(pending) = pending {
            info!(offenders = ?pending.offenders, "penalty pending");
            self.open_penalty(pending);
        } else {
            self.maybe_schedule_opponent();
        }
        true
    }

    fn rollback_turn(&mut self) {
        self.history.truncate(self.turn_history_mark);
        let snap = self.turn_start.clone();
        self.restore(snap);
    }

    // -------------------------------------------------------------------------
    // Scripted opening
    // -------------------------------------------------------------------------

    fn current_opening_step(&self) -> Option<&'static OpeningStep> {
        match self.opening {
            OpeningState::Active { base, ply } => Some(&table(base)[ply as usize]),
            OpeningState::Inactive => None,
        }
    }

    /// The scripted `(from, to)` the current mover must play, if the
    /// opening is active.
    pub fn expected_opening_hop(&self) -> Option<(CellIdx, CellIdx)> {
        let step = self.current_opening_step()?;
        let anchor = match self.chain {
            ChainState::Active { anchor, .. } => Some(anchor),
            ChainState::Inactive => None,
        };
        Some(step.expected_hop(anchor))
    }

    fn show_opening_hint(&mut self, from: CellIdx, to: CellIdx) {
        self.painter
            .update(&self.board, |ov| ov.set_opening_arrow(from, to));
    }

    /// Whether the automated side must be driven through its scripted
    /// ply. Hosts call [`Game::play_scripted_step`] when this is true.
    pub fn needs_scripted_autoplay(&self) -> bool {
        matches!(self.phase, Phase::Playing)
            && self.automated == Some(self.mover)
            && matches!(self.opening, OpeningState::Active { .. })
    }

    /// Play the automated side's entire scripted ply (all hops of a
    /// chain opening).
    pub fn play_scripted_step(&mut self) -> bool {
        if !self.needs_scripted_autoplay() {
            return false;
        }
        let side = self.mover;
        while self.mover == side {
            let Some((from, to)) = self.expected_opening_hop() else {
                break;
            };
            match self.try_move(from, to) {
                ClickOutcome::Moved {
                    chain_continues: true,
                    ..
                } => continue,
                ClickOutcome::Moved { .. } => return true,
                other => {
                    warn!(?other, "scripted step rejected");
                    return false;
                }
            }
        }
        true
    }

    // -------------------------------------------------------------------------
    // Penalty protocol
    // -------------------------------------------------------------------------

    fn open_penalty(&mut self, pending: PendingPenalty) {
        let penalizer = pending.penalizer;
        self.phase = Phase::AwaitingPenalty(pending);
        self.picker.open();
        self.raise(Notice::AwaitingPenalty);

        if self.automated == Some(penalizer) {
            let decision = match (&mut self.opponent, &self.phase) {
                (Some(driver), Phase::AwaitingPenalty(p)) => driver.choose_penalty(p),
                _ => None,
            };
            if let Some(decision) = decision {
                self.apply_penalty_decision(decision);
            }
        }
    }

    fn penalty_click(&mut self, idx: CellIdx) -> ClickOutcome {
        let Phase::AwaitingPenalty(pending) = &self.phase else {
            return ClickOutcome::Ignored;
        };
        if self.automated == Some(pending.penalizer) {
            self.raise(Notice::WaitTurn);
            return ClickOutcome::Rejected(Notice::WaitTurn);
        }
        let action = self.picker.click(pending, idx);
        match action {
            PickerAction::None => ClickOutcome::Ignored,
            PickerAction::NotOffender => {
                self.raise(Notice::NotAnOffender);
                ClickOutcome::Rejected(Notice::NotAnOffender)
            }
            PickerAction::Selected(offender) => {
                ClickOutcome::PenaltyOffenderSelected(offender)
            }
            PickerAction::Commit(decision) => {
                self.apply_penalty_decision(decision);
                ClickOutcome::PenaltyCommitted
            }
        }
    }

    /// Cycle the emphasized force candidate in the picker.
    pub fn cycle_penalty_candidate(&mut self) {
        self.picker.cycle();
    }

    /// Render the picker's current candidate preview onto a detached
    /// surface, leaving the primary view untouched.
    pub fn render_penalty_preview(&mut self, target: &mut FrameBuffer) {
        let payload = self.picker.preview();
        self.painter
            .render_penalty_preview(target, &self.board, &payload);
    }

    /// Close the picker without committing. The pending penalty stays.
    pub fn dismiss_penalty_picker(&mut self) {
        self.picker.dismiss();
    }

    /// Reopen a dismissed picker for the still-pending penalty.
    pub fn reopen_penalty_picker(&mut self) {
        if matches!(self.phase, Phase::AwaitingPenalty(_)) {
            self.picker.open();
        }
    }

    /// Commit a remedy: mutate the board, stage the aftermath overlays in
    /// one batch behind the draw gate, and resume normal flow with the
    /// penalizer to move.
    pub fn apply_penalty_decision(&mut self, decision: PenaltyDecision) {
        let Phase::AwaitingPenalty(pending) = std::mem::replace(&mut self.phase, Phase::Playing)
        else {
            return;
        };
        self.painter.set_penalty_applying(true, &self.board);
        self.mirror.set_suspended(true);

        let decided_offender = match &decision {
            PenaltyDecision::Remove { offender } => *offender,
            PenaltyDecision::Force { offender, .. } => *offender,
        };

        match &decision {
            PenaltyDecision::Remove { offender } => {
                let target = remove_target(&pending, *offender);
                info!(offender, target, "penalty: remove");
                self.board.set(target, 0);
            }
            PenaltyDecision::Force {
                offender,
                path,
                jumps,
            } => {
                info!(offender, ?path, "penalty: force replay");
                self.board = pending.turn_start_snapshot.board.clone();
                let mut cur = *offender;
                for (i, &to) in path.iter().enumerate() {
                    let jumped = jumps
                        .get(i)
                        .copied()
                        .or_else(|| self.rules.classify_capture(&self.board, cur, to));
                    self.board.apply_move(cur, to, jumped);
                    cur = to;
                }
                if self.rules.promotes(&self.board, cur) {
                    if let Some(owner) = piece_owner(self.board.get(cur)) {
                        self.board.set(cur, king(owner));
                        self.painter.overlays_mut().queue_crown(cur, Instant::now());
                    }
                }
            }
        }

        // Aftermath annotations, staged as one batch.
        let ignored = force_candidates(&pending, decided_offender).into_iter().next();
        let undo_nodes = pending.last_move_from.map(|from| {
            let mut nodes = vec![from];
            if let Some(path) = &pending.last_move_path {
                nodes.extend_from_slice(path);
            }
            nodes.reverse();
            nodes
        });
        let forced = matches!(decision, PenaltyDecision::Force { .. });
        {
            let ov = self.painter.overlays_mut();
            ov.set_highlights(Vec::new());
            ov.clear_soufla_fx();
            ov.clear_captured_order();
            // The penalized move no longer stands in either remedy.
            ov.clear_last_move();
            ov.clear_prev_move();
            if let Some(cand) = ignored {
                ov.ignored_segments.push(crate::overlay::IgnoredSegment {
                    from: decided_offender,
                    path: cand.path,
                    jumps: cand.jumps,
                });
            }
            if forced {
                if let Some(nodes) = undo_nodes {
                    ov.soufla_undo_arrow = Some(nodes);
                }
            } else {
                // Mark the eliminated piece's origin cell.
                ov.remove_marks.push(decided_offender);
            }
        }
        self.last_move_from = None;
        self.last_move_path = None;
        self.last_moved_from = None;
        self.last_moved_to = None;
        self.soufla_fx_armed = true;

        self.picker.dismiss();
        self.selection = None;
        self.chain = ChainState::Inactive;
        self.turn_from = None;
        self.turn_path.clear();

        // The remedy may have taken a side's last piece.
        let (mine, theirs) = (
            self.board.count(self.mover),
            self.board.count(self.mover.opponent()),
        );
        if mine == 0 || theirs == 0 {
            let winner = if mine == 0 {
                self.mover.opponent()
            } else {
                self.mover
            };
            self.phase = Phase::Over {
                winner: Some(winner),
            };
            info!(winner = ?winner, "game over");
        }

        self.turn_start = self.snapshot();
        self.turn_history_mark = self.history.len();

        self.painter.set_penalty_applying(false, &self.board);
        self.mirror.set_suspended(false);
        self.mirror.invalidate();
        self.maybe_schedule_opponent();
    }

    // -------------------------------------------------------------------------
    // Undo
    // -------------------------------------------------------------------------

    /// Pop the latest history snapshot and restore it, flashing the
    /// undone move's path backwards.
    pub fn undo(&mut self) -> Result<(), Notice> {
        if matches!(self.phase, Phase::AwaitingPenalty(_)) {
            // Only a committed remedy may clear a pending penalty.
            self.raise(Notice::AwaitingPenalty);
            return Err(Notice::AwaitingPenalty);
        }
        // The candidate snapshot decides: states taken inside the scripted
        // opening stay unrestorable even after the opening completes.
        match self.history.last() {
            None => {
                self.raise(Notice::UndoUnavailable);
                return Err(Notice::UndoUnavailable);
            }
            Some(c) if c.forced_enabled && c.forced_ply < OPENING_PLIES => {
                self.raise(Notice::UndoBlockedInOpening);
                return Err(Notice::UndoBlockedInOpening);
            }
            Some(_) => {}
        }
        let Some(snap) = self.history.pop() else {
            return Err(Notice::UndoUnavailable);
        };
        // Flash the move being undone, walking its path backwards. Inside
        // a chain the committed fields still describe the previous turn,
        // so the in-progress hops win, then the committed path, then the
        // bare from/to of the last applied hop.
        let flash: Vec<CellIdx> = if let (Some(from), false) =
            (self.turn_from, self.turn_path.is_empty())
        {
            let mut nodes = vec![from];
            nodes.extend_from_slice(&self.turn_path);
            nodes
        } else if let (Some(from), Some(path)) =
            (self.last_move_from, self.last_move_path.as_deref())
        {
            let mut nodes = vec![from];
            nodes.extend_from_slice(path);
            nodes
        } else if let (Some(from), Some(to)) = (self.last_moved_from, self.last_moved_to) {
            vec![from, to]
        } else {
            Vec::new()
        };
        self.restore(snap);
        self.painter.update(&self.board, |ov| {
            ov.set_undo_flash(flash, Instant::now());
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Opponent scheduling
    // -------------------------------------------------------------------------

    fn maybe_schedule_opponent(&mut self) {
        if !matches!(self.phase, Phase::Playing) {
            return;
        }
        if self.automated != Some(self.mover) {
            return;
        }
        if matches!(self.opening, OpeningState::Active { .. }) {
            // Scripted plies are host-driven via `play_scripted_step`.
            return;
        }
        if let Some(driver) = &mut self.opponent {
            driver.schedule_move();
        }
    }

    // -------------------------------------------------------------------------
    // Simulation and rendering
    // -------------------------------------------------------------------------

    /// Run a speculative board mutation with draws deferred; the board
    /// must be returned to its real state before the closure ends.
    pub fn simulate<T>(&mut self, f: impl FnOnce(&mut Board, &R) -> T) -> T {
        self.painter.sim_enter();
        let out = f(&mut self.board, &self.rules);
        self.painter.sim_exit(&self.board);
        out
    }

    /// Per-frame tick: repaint (pruning expired overlays) and pull-sync
    /// the raised view.
    pub fn tick(&mut self, now: Instant) {
        self.painter.draw_at(&self.board, now);
        let highlights = self.painter.overlays().highlight_cells.clone();
        self.mirror.sync_if_needed(
            &self.board,
            self.selection,
            &highlights,
            self.painter.sim_depth(),
        );
    }

    /// Switch to the raised view. Initialization failure falls back to
    /// the flat view with a notice; never fatal.
    pub fn enable_raised_view(&mut self, width: u16, height: u16) -> bool {
        match self.mirror.init(width, height) {
            Ok(()) => {
                self.mirror.set_enabled(true);
                self.painter.set_mode(ViewMode::Raised);
                self.painter.draw(&self.board);
                true
            }
            Err(err) => {
                warn!(%err, "raised view unavailable, staying flat");
                self.raise(Notice::RaisedViewUnavailable);
                self.painter.set_mode(ViewMode::Flat);
                false
            }
        }
    }

    pub fn disable_raised_view(&mut self) {
        self.mirror.set_enabled(false);
        self.painter.set_mode(ViewMode::Flat);
        self.painter.draw(&self.board);
    }
}

fn placeholder_snapshot(mover: Side) -> Snapshot {
    Snapshot {
        board: Board::empty(),
        mover,
        in_chain: false,
        chain_anchor: None,
        last_moved_from: None,
        last_moved_to: None,
        last_move_from: None,
        last_move_path: None,
        move_count: 0,
        forced_enabled: false,
        forced_ply: OPENING_PLIES,
        game_over: false,
        winner: None,
    }
}

// =============================================================================
// Tests
// =============================================================================
