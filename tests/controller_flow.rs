//! End-to-end controller flows driven through the public click API:
//! the scripted opening, penalty resolution, and raised-view sync.

use std::cell::RefCell;
use std::collections::HashSet;
use std::time::Instant;

use zamat_tui::{
    index_to_rc, man, piece_owner, rc_to_index, Board, CellIdx, ClickOutcome, Game, GameOptions,
    Notice, OpeningState, PendingPenalty, PenaltyOption, Phase, Rules, Side, Snapshot,
    TurnReport,
};

/// Geometric stub rules: any distinct pair is "legal" (the controller's
/// gating is what is under test), a straight or diagonal two-cell step
/// over an enemy midpoint is a capture, deeper captures exist exactly at
/// the preprogrammed cells, and finish-turn pops a preloaded penalty.
struct StubRules {
    deeper: HashSet<CellIdx>,
    pending: RefCell<Option<PendingPenalty>>,
}

impl StubRules {
    fn new() -> Self {
        Self {
            deeper: HashSet::new(),
            pending: RefCell::new(None),
        }
    }
}

impl Rules for StubRules {
    fn is_legal(&self, _board: &Board, _mover: Side, from: CellIdx, to: CellIdx) -> bool {
        from != to
    }

    fn classify_capture(&self, board: &Board, from: CellIdx, to: CellIdx) -> Option<CellIdx> {
        let (fr, fc) = index_to_rc(from);
        let (tr, tc) = index_to_rc(to);
        let dr = tr as i16 - fr as i16;
        let dc = tc as i16 - fc as i16;
        if dr.abs() > 2 || dc.abs() > 2 || (dr.abs() != 2 && dc.abs() != 2) {
            return None;
        }
        if dr % 2 != 0 || dc % 2 != 0 {
            return None;
        }
        let mid = rc_to_index(((fr as i16 + tr as i16) / 2) as u8, ((fc as i16 + tc as i16) / 2) as u8);
        let mover = piece_owner(board.get(from))?;
        if piece_owner(board.get(mid)) == Some(mover.opponent()) {
            Some(mid)
        } else {
            None
        }
    }

    fn has_deeper_capture(&self, _board: &Board, from: CellIdx) -> bool {
        self.deeper.contains(&from)
    }

    fn promotes(&self, _board: &Board, _idx: CellIdx) -> bool {
        false
    }

    fn finish_turn(&self, _board: &Board, _report: &TurnReport<'_>) -> Option<PendingPenalty> {
        self.pending.borrow_mut().take()
    }
}

fn two_human_game(rules: StubRules, forced_opening: bool) -> Game<StubRules> {
    Game::new(
        rules,
        GameOptions {
            local_side: Side::Bottom,
            first_mover: Side::Bottom,
            forced_opening,
            automated: None,
        },
        90,
        45,
    )
}

fn base_snapshot(board: Board, mover: Side) -> Snapshot {
    Snapshot {
        board,
        mover,
        in_chain: false,
        chain_anchor: None,
        last_moved_from: None,
        last_moved_to: None,
        last_move_from: None,
        last_move_path: None,
        move_count: 0,
        forced_enabled: false,
        forced_ply: 10,
        game_over: false,
        winner: None,
    }
}

// =============================================================================
// Scripted opening
// =============================================================================

#[test]
fn scripted_opening_plays_out_hop_by_hop() {
    let mut rules = StubRules::new();
    // The chain opening for a bottom-based game pauses at (4,2).
    rules.deeper.insert(rc_to_index(4, 2));
    let mut g = two_human_game(rules, true);

    // Ply 0: selecting anything but the scripted origin is rejected and
    // leaves no selection.
    let wrong = rc_to_index(6, 6);
    assert!(matches!(
        g.click_cell(wrong),
        ClickOutcome::Rejected(Notice::OpeningExpected { .. })
    ));
    assert_eq!(g.selection(), None);

    for ply in 0..10 {
        assert_eq!(
            g.opening(),
            OpeningState::Active {
                base: Side::Bottom,
                ply
            }
        );

        if ply == 6 {
            // The chain opening must be played hop by hop; jumping
            // straight to its final cell is refused.
            let origin = rc_to_index(4, 4);
            let final_to = rc_to_index(4, 0);
            assert!(matches!(g.click_cell(origin), ClickOutcome::Selected(_)));
            assert!(matches!(
                g.click_cell(final_to),
                ClickOutcome::Rejected(Notice::OpeningStepByStep)
            ));
            assert_eq!(
                g.opening(),
                OpeningState::Active {
                    base: Side::Bottom,
                    ply: 6
                }
            );
        }

        loop {
            let (from, to) = g.expected_opening_hop().unwrap();
            if g.selection() != Some(from) {
                assert!(matches!(g.click_cell(from), ClickOutcome::Selected(_)));
            }
            match g.click_cell(to) {
                ClickOutcome::Moved {
                    chain_continues: true,
                    ..
                } => continue,
                ClickOutcome::Moved { .. } => break,
                other => panic!("ply {ply}: scripted move rejected: {other:?}"),
            }
        }
    }

    assert_eq!(g.opening(), OpeningState::Inactive);
    // Each side loses five men over the scripted exchange.
    assert_eq!(g.board().count(Side::Top), 35);
    assert_eq!(g.board().count(Side::Bottom), 35);
    assert_eq!(g.mover(), Side::Bottom);

    // The script is not resumable backwards: the first undo would restore
    // a snapshot taken inside the opening and is refused.
    assert_eq!(g.undo(), Err(Notice::UndoBlockedInOpening));
    assert_eq!(g.opening(), OpeningState::Inactive);
    assert_eq!(g.board().count(Side::Top), 35);
}

// =============================================================================
// Penalty resolution
// =============================================================================

/// Offenders 5 and 12; the chain started from 5 and its piece landed
/// on 20; the force remedy for 5 runs 5 -> 12 -> 19 -> 26.
fn preload_penalty(turn_start_board: Board) -> PendingPenalty {
    PendingPenalty {
        offenders: vec![5, 12],
        longest_global: 3,
        started_from: Some(5),
        last_piece_idx: Some(20),
        options: vec![
            PenaltyOption::Remove { offender: 5 },
            PenaltyOption::Remove { offender: 12 },
            PenaltyOption::Force {
                offender: 5,
                path: vec![12, 19, 26],
                jumps: vec![8, 15, 22],
            },
        ],
        turn_start_snapshot: base_snapshot(turn_start_board, Side::Bottom),
        last_move_from: Some(rc_to_index(4, 5)),
        last_move_path: Some(vec![rc_to_index(4, 4)]),
        penalizer: Side::Top,
    }
}

/// Play the quiet move that ends the penalized turn.
fn trigger_penalty(g: &mut Game<StubRules>) {
    let from = rc_to_index(4, 5);
    let to = rc_to_index(4, 4);
    assert!(matches!(g.click_cell(from), ClickOutcome::Selected(_)));
    assert!(matches!(g.click_cell(to), ClickOutcome::Moved { .. }));
    assert!(matches!(g.phase(), Phase::AwaitingPenalty(_)));
    assert_eq!(g.mover(), Side::Top);
}

#[test]
fn penalty_offender_targeting_and_remove() {
    let rules = StubRules::new();
    *rules.pending.borrow_mut() = Some(preload_penalty(Board::starting()));
    let mut g = two_human_game(rules, false);
    trigger_penalty(&mut g);

    // Indirect hit: the offender at 5 relocated to 20.
    assert_eq!(
        g.click_cell(20),
        ClickOutcome::PenaltyOffenderSelected(5)
    );
    // A cell naming no offender clears the selection with a notice.
    assert_eq!(
        g.click_cell(7),
        ClickOutcome::Rejected(Notice::NotAnOffender)
    );
    // Direct hit, then clicking its remove ring commits.
    assert_eq!(
        g.click_cell(12),
        ClickOutcome::PenaltyOffenderSelected(12)
    );
    assert_ne!(g.board().get(12), 0);
    assert_eq!(g.click_cell(12), ClickOutcome::PenaltyCommitted);

    assert_eq!(g.board().get(12), 0);
    assert_eq!(*g.phase(), Phase::Playing);
    assert!(g.pending_penalty().is_none());
    // The penalizer is on the move.
    assert_eq!(g.mover(), Side::Top);

    // The eliminated piece is marked and the penalized move's visuals
    // are dropped, same as a force commit.
    let ov = g.painter().overlays();
    assert_eq!(ov.remove_marks, vec![12]);
    assert!(ov.last_move.is_none());
}

#[test]
fn penalty_force_replays_from_turn_start() {
    // Pre-turn board for the rollback: the offending man sits on 5 with
    // three enemy men on the cells its forced chain jumps, plus one Top
    // man the replay leaves standing.
    let mut pre = Board::empty();
    pre.set(5, man(Side::Bottom));
    pre.set(rc_to_index(4, 5), man(Side::Bottom));
    pre.set(rc_to_index(0, 0), man(Side::Top));
    for j in [8, 15, 22] {
        pre.set(j, man(Side::Top));
    }

    let rules = StubRules::new();
    *rules.pending.borrow_mut() = Some(preload_penalty(pre));
    let mut g = two_human_game(rules, false);
    trigger_penalty(&mut g);

    // Select the relocated offender, then click the end of its forced
    // chain to commit.
    assert_eq!(g.click_cell(20), ClickOutcome::PenaltyOffenderSelected(5));
    assert_eq!(g.click_cell(26), ClickOutcome::PenaltyCommitted);

    // The offender was replayed along 5 -> 12 -> 19 -> 26 from the
    // pre-turn board, clearing every jumped cell.
    assert_eq!(g.board().get(5), 0);
    assert_eq!(g.board().get(12), 0);
    assert_eq!(g.board().get(19), 0);
    assert_eq!(g.board().get(26), man(Side::Bottom));
    for j in [8, 15, 22] {
        assert_eq!(g.board().get(j), 0);
    }
    // The penalized quiet move itself was rolled back.
    assert_eq!(g.board().get(rc_to_index(4, 4)), 0);
    assert_eq!(g.board().get(rc_to_index(4, 5)), man(Side::Bottom));

    // Aftermath annotations: the ignored chain and the backwards arrow
    // over the undone move.
    let ov = g.painter().overlays();
    assert_eq!(ov.ignored_segments.len(), 1);
    assert_eq!(ov.ignored_segments[0].from, 5);
    assert_eq!(ov.ignored_segments[0].path, vec![12, 19, 26]);
    assert_eq!(
        ov.soufla_undo_arrow,
        Some(vec![rc_to_index(4, 4), rc_to_index(4, 5)])
    );
    assert!(ov.last_move.is_none());

    assert_eq!(*g.phase(), Phase::Playing);
    assert_eq!(g.mover(), Side::Top);
}

#[test]
fn ending_a_chain_early_goes_to_penalty_evaluation() {
    let mut rules = StubRules::new();
    rules.deeper.insert(rc_to_index(4, 2));
    *rules.pending.borrow_mut() = Some(preload_penalty(Board::starting()));
    let mut g = two_human_game(rules, false);

    // Bottom man with two jumps available in a row; the mover takes the
    // first and then stops.
    let mut b = Board::empty();
    b.set(rc_to_index(4, 4), man(Side::Bottom));
    b.set(rc_to_index(4, 3), man(Side::Top));
    b.set(rc_to_index(4, 1), man(Side::Top));
    g.restore(base_snapshot(b, Side::Bottom));

    assert!(matches!(
        g.click_cell(rc_to_index(4, 4)),
        ClickOutcome::Selected(_)
    ));
    assert!(matches!(
        g.click_cell(rc_to_index(4, 2)),
        ClickOutcome::Moved {
            capture: true,
            chain_continues: true,
            ..
        }
    ));

    assert!(g.end_chain().is_ok());
    assert!(matches!(g.phase(), Phase::AwaitingPenalty(_)));
    assert_eq!(g.end_chain(), Err(Notice::AwaitingPenalty));
}

#[test]
fn undo_is_refused_while_a_penalty_is_pending() {
    let rules = StubRules::new();
    *rules.pending.borrow_mut() = Some(preload_penalty(Board::starting()));
    let mut g = two_human_game(rules, false);
    trigger_penalty(&mut g);

    // Only a committed remedy may clear the pending penalty.
    assert_eq!(g.undo(), Err(Notice::AwaitingPenalty));
    assert!(matches!(g.phase(), Phase::AwaitingPenalty(_)));
    assert!(g.pending_penalty().is_some());
}

#[test]
fn penalty_fx_stick_until_the_local_turn_ends() {
    let rules = StubRules::new();
    *rules.pending.borrow_mut() = Some(preload_penalty(Board::starting()));
    let mut g = two_human_game(rules, false);
    trigger_penalty(&mut g);

    g.click_cell(12);
    assert_eq!(g.click_cell(12), ClickOutcome::PenaltyCommitted);
    assert_eq!(g.painter().overlays().ignored_segments.len(), 1);
    assert_eq!(g.painter().overlays().remove_marks, vec![12]);

    // The penalizer's (Top's) turn leaves the annotations standing.
    assert!(matches!(g.click_cell(3), ClickOutcome::Selected(_)));
    assert!(matches!(g.click_cell(12), ClickOutcome::Moved { .. }));
    assert_eq!(g.painter().overlays().ignored_segments.len(), 1);

    // The local side (Bottom) ending its turn clears them.
    assert!(matches!(
        g.click_cell(rc_to_index(4, 4)),
        ClickOutcome::Selected(_)
    ));
    assert!(matches!(
        g.click_cell(rc_to_index(4, 5)),
        ClickOutcome::Moved { .. }
    ));
    let ov = g.painter().overlays();
    assert!(ov.ignored_segments.is_empty());
    assert!(ov.remove_marks.is_empty());
    assert!(ov.soufla_undo_arrow.is_none());
}

#[test]
fn force_that_wipes_a_side_ends_the_game() {
    // The penalizer's only men sit on the cells the forced chain jumps.
    let mut pre = Board::empty();
    pre.set(5, man(Side::Bottom));
    pre.set(rc_to_index(4, 5), man(Side::Bottom));
    for j in [8, 15, 22] {
        pre.set(j, man(Side::Top));
    }

    let rules = StubRules::new();
    *rules.pending.borrow_mut() = Some(preload_penalty(pre.clone()));
    let mut g = two_human_game(rules, false);
    g.restore(base_snapshot(pre, Side::Bottom));
    trigger_penalty(&mut g);

    g.click_cell(20);
    assert_eq!(g.click_cell(26), ClickOutcome::PenaltyCommitted);

    assert_eq!(g.board().count(Side::Top), 0);
    assert_eq!(
        *g.phase(),
        Phase::Over {
            winner: Some(Side::Bottom)
        }
    );
}

#[test]
fn undo_mid_chain_flashes_the_hops_in_progress() {
    let mut rules = StubRules::new();
    rules.deeper.insert(rc_to_index(4, 2));
    let mut g = two_human_game(rules, false);

    let mut b = Board::empty();
    b.set(rc_to_index(4, 4), man(Side::Bottom));
    b.set(rc_to_index(4, 3), man(Side::Top));
    b.set(rc_to_index(4, 1), man(Side::Top));
    g.restore(base_snapshot(b, Side::Bottom));

    g.click_cell(rc_to_index(4, 4));
    assert!(matches!(
        g.click_cell(rc_to_index(4, 2)),
        ClickOutcome::Moved {
            chain_continues: true,
            ..
        }
    ));

    // Undoing the open chain flashes the hop just played, not the
    // previous turn's committed path.
    g.undo().unwrap();
    let flash = g.painter().overlays().undo_flash.clone().unwrap();
    assert_eq!(flash.nodes, vec![rc_to_index(4, 4), rc_to_index(4, 2)]);
    assert_eq!(g.board().get(rc_to_index(4, 3)), man(Side::Top));
    assert_eq!(g.board().get(rc_to_index(4, 4)), man(Side::Bottom));
    assert_eq!(g.mover(), Side::Bottom);
}

#[test]
fn penalty_gates_ordinary_input() {
    let rules = StubRules::new();
    *rules.pending.borrow_mut() = Some(preload_penalty(Board::starting()));
    let mut g = two_human_game(rules, false);
    trigger_penalty(&mut g);

    // A click that would ordinarily select a top piece is redirected to
    // offender resolution and rejected.
    let top_piece = rc_to_index(0, 0);
    assert_eq!(
        g.click_cell(top_piece),
        ClickOutcome::Rejected(Notice::NotAnOffender)
    );
    assert_eq!(g.selection(), None);
}

// =============================================================================
// Raised view sync
// =============================================================================

#[test]
fn raised_view_rebuilds_only_on_structural_change() {
    let mut g = two_human_game(StubRules::new(), false);
    assert!(g.enable_raised_view(60, 30));

    let t0 = Instant::now();
    g.tick(t0);
    g.tick(t0);
    assert_eq!(g.mirror().rebuilds(), 1);

    // A selection change is structural and triggers exactly one rebuild.
    g.click_cell(rc_to_index(6, 3));
    g.tick(t0);
    g.tick(t0);
    assert_eq!(g.mirror().rebuilds(), 2);
}
