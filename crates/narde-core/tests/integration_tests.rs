//! Integration tests for the Narde rules engine.
//!
//! These tests verify complete matches between bots and the rule
//! properties that must hold in every reachable position.

use narde_core::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

const MAX_TURNS: u32 = 3000;

/// Board invariants: 15 checkers per side, one owner per point
fn assert_board_invariants(game: &GameState) {
    if let Err(e) = game.board.validate() {
        panic!("board invariant broken at turn {}: {}", game.turn_count, e);
    }
    for color in Color::ALL {
        assert_eq!(game.board.checker_total(color), CHECKERS_PER_SIDE as u32);
    }
}

/// Rule properties of the sequences currently offered
fn assert_sequence_properties(game: &GameState) {
    let seqs = game.legal_sequences();
    let color = game.current_player;

    if let Some(first) = seqs.first() {
        assert!(seqs.iter().all(|s| s.len() == first.len()), "mixed lengths offered");
    }

    let limit = head_move_limit(game.turn_count, &game.dice);
    for seq in seqs {
        let head_moves = seq.iter().filter(|m| m.is_from_head(color)).count() as u8;
        assert!(
            game.moves_from_head + head_moves <= limit,
            "head limit exceeded: {:?}",
            seq
        );

        let result = seq.iter().fold(game.board, |b, mv| b.apply_move(*mv, color));
        assert!(!forms_illegal_block(&result, color), "block of six offered: {:?}", seq);
    }
}

/// Play a bot-vs-bot match, checking invariants after every action
fn play_match(seed: u64, white: BotDifficulty, black: BotDifficulty) -> GameState {
    let mut game = GameState::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bots = [
        Bot::with_seed(Color::White, white, seed),
        Bot::with_seed(Color::Black, black, seed.wrapping_add(1)),
    ];

    while !game.is_finished() && game.turn_count < MAX_TURNS {
        let color = game.current_player;
        let bot = &mut bots[color.index()];

        if game.no_legal_moves {
            game.end_turn().unwrap();
            continue;
        }

        let action = bot
            .choose_action(&game)
            .expect("bot on turn must have an action");
        let result = match action {
            GameAction::RollDice => game.roll(color, &mut rng),
            other => game.apply_action(color, other),
        };
        assert!(result.is_ok(), "bot chose a rejected action: {:?}", result);

        assert_board_invariants(&game);
        assert_sequence_properties(&game);
    }

    game
}

#[test]
fn test_full_matches_preserve_invariants() {
    for seed in 0..4 {
        let game = play_match(seed, BotDifficulty::Medium, BotDifficulty::Easy);
        assert_board_invariants(&game);
    }
}

#[test]
fn test_match_reaches_a_winner() {
    let finished = (10..16)
        .map(|seed| play_match(seed, BotDifficulty::Medium, BotDifficulty::Medium))
        .filter(|g| g.is_finished())
        .count();
    assert!(finished > 0, "no match finished within {} turns", MAX_TURNS);
}

#[test]
fn test_winner_has_borne_off_everything() {
    for seed in 20..24 {
        let game = play_match(seed, BotDifficulty::Medium, BotDifficulty::Medium);
        if let Some(winner) = game.winner() {
            assert_eq!(game.board.off(winner), CHECKERS_PER_SIDE);
            assert!(game.board.off(winner.opponent()) < CHECKERS_PER_SIDE);
            assert!(game.valid_actions(winner.opponent()).is_empty());
        }
    }
}

#[test]
fn test_scenario_opening_three_five() {
    let mut game = GameState::new();
    game.apply_roll(Color::White, 3, 5).unwrap();

    let mut offered = game.legal_moves();
    offered.sort_by_key(|m| m.die);
    assert_eq!(
        offered,
        vec![
            Move::new(Source::Point(24), Target::Point(21), 3),
            Move::new(Source::Point(24), Target::Point(19), 5),
        ]
    );

    game.move_checker(Color::White, Source::Point(24), Target::Point(19))
        .unwrap();
    assert_eq!(game.board.count_at(24, Color::White), 14);
    assert_eq!(game.board.count_at(19, Color::White), 1);
}

#[test]
fn test_scenario_bar_entry() {
    let mut board = Board::empty();
    board.set_bar(Color::White, 1);
    board.set_point(20, Some(Color::White), 8);
    board.set_point(15, Some(Color::White), 6);
    board.set_point(12, Some(Color::Black), 15);
    let mut game = GameState::from_position(board, Color::White, 9);

    game.apply_roll(Color::White, 2, 4).unwrap();

    let mut entries: Vec<Move> = game.legal_moves();
    entries.sort_by_key(|m| m.die);
    assert_eq!(
        entries,
        vec![
            Move::new(Source::Bar, Target::Point(23), 2),
            Move::new(Source::Bar, Target::Point(21), 4),
        ]
    );

    // Board moves only ever follow the entry.
    for seq in game.legal_sequences() {
        assert_eq!(seq[0].from, Source::Bar);
        assert!(seq[1..].iter().all(|m| m.from != Source::Bar));
    }

    let result = game.move_checker(Color::White, Source::Point(20), Target::Point(18));
    assert!(matches!(result, Err(GameError::IllegalMove { .. })));
}

#[test]
fn test_scenario_bear_off_six() {
    let mut board = Board::empty();
    board.set_point(6, Some(Color::White), 3);
    board.set_point(4, Some(Color::White), 6);
    board.set_point(1, Some(Color::White), 6);
    board.set_point(12, Some(Color::Black), 15);
    let mut game = GameState::from_position(board, Color::White, 60);

    game.apply_roll(Color::White, 6, 2).unwrap();
    assert!(game
        .legal_moves()
        .contains(&Move::new(Source::Point(6), Target::Off, 6)));

    game.move_checker(Color::White, Source::Point(6), Target::Off)
        .unwrap();
    assert_eq!(game.board.off(Color::White), 1);
    assert_eq!(game.board.count_at(6, Color::White), 2);
}

#[test]
fn test_opening_double_four_lets_two_leave_head() {
    let mut game = GameState::new();
    game.apply_roll(Color::White, 4, 4).unwrap();

    game.move_checker(Color::White, Source::Point(24), Target::Point(20))
        .unwrap();
    game.move_checker(Color::White, Source::Point(24), Target::Point(20))
        .unwrap();
    assert_eq!(game.moves_from_head, 2);
    assert!(!game
        .legal_moves()
        .iter()
        .any(|m| m.is_from_head(Color::White)));
}

#[test]
fn test_head_limit_on_later_turn() {
    let mut game = GameState::new();
    game.apply_roll(Color::White, 1, 2).unwrap();
    game.move_checker(Color::White, Source::Point(24), Target::Point(22))
        .unwrap();
    game.move_checker(Color::White, Source::Point(22), Target::Point(21))
        .unwrap();

    game.apply_roll(Color::Black, 5, 6).unwrap();
    game.move_checker(Color::Black, Source::Point(12), Target::Point(6))
        .unwrap();
    game.move_checker(Color::Black, Source::Point(6), Target::Point(1))
        .unwrap();

    // Turn 3: a double six no longer allows a second head checker.
    game.apply_roll(Color::White, 6, 6).unwrap();
    for seq in game.legal_sequences() {
        assert!(seq.iter().filter(|m| m.is_from_head(Color::White)).count() <= 1);
    }
}

#[test]
fn test_snapshot_tracks_turn() {
    let mut game = GameState::new();
    let before = game.snapshot();
    assert_eq!(before.phase, TurnPhase::AwaitingRoll);
    assert!(before.legal_moves.is_empty());

    game.apply_roll(Color::White, 2, 1).unwrap();
    let after = game.snapshot();
    assert_eq!(after.dice, vec![2, 1]);
    assert_eq!(after.last_roll, Some((2, 1)));
    assert_eq!(after.phase, TurnPhase::AwaitingMove);
    assert_eq!(after.legal_moves.len(), 2);
}
