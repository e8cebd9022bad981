//! Legal-move generation.
//!
//! The generator is a pure function of a board snapshot, the remaining dice
//! and the turn context. It enumerates every way to play the dice
//! recursively, branching on copies of the board, and then filters the
//! result through the turn-level rules:
//!
//! 1. Use as many dice as possible.
//! 2. If only one die can be used and both faces are playable, use the larger.
//! 3. Never build six consecutive points in front of an opponent who has not
//!    reached their home quarter.
//!
//! Single-die rules (no hitting, bar entry first, bearing off, head limit)
//! live in [`single_moves`].

use crate::board::{Board, Move, MoveSequence, Source, Target};
use crate::dice::DiceSet;
use crate::route::{distance_to_off, Color, POINT_COUNT};

/// Length of a run of points that may not be built in front of the opponent
pub const BLOCK_LENGTH: usize = 6;

/// How many checkers may leave the head point this turn.
///
/// One, except on the first two turns of the match when the roll is a
/// double 3, 4 or 6: those cannot be played otherwise, so two are allowed.
pub fn head_move_limit(turn_count: u32, dice: &DiceSet) -> u8 {
    match dice.double() {
        Some(3) | Some(4) | Some(6) if turn_count <= 2 => 2,
        _ => 1,
    }
}

/// All moves `color` can make with a single `die`.
///
/// While any checker is on the bar, only bar entries are returned.
/// `head_allowed` is false once the head limit for the turn is spent.
pub fn single_moves(board: &Board, die: u8, color: Color, head_allowed: bool) -> Vec<Move> {
    let mut moves = Vec::new();
    let opponent = color.opponent();

    if board.bar(color) > 0 {
        if let Some(entry) = color.point_at(die as usize - 1) {
            if board.owner_at(entry) != Some(opponent) {
                moves.push(Move::new(Source::Bar, Target::Point(entry), die));
            }
        }
        return moves;
    }

    let bearing_off = board.is_all_checkers_home(color);

    for point in board.occupied_by(color) {
        if point == color.head() && !head_allowed {
            continue;
        }
        let Some(index) = color.route_index(point) else {
            continue;
        };

        let dest = index + die as usize;
        if dest < POINT_COUNT {
            if let Some(to) = color.point_at(dest) {
                if board.owner_at(to) != Some(opponent) {
                    moves.push(Move::new(Source::Point(point), Target::Point(to), die));
                }
            }
        } else if bearing_off && can_bear_off(board, color, index, die) {
            moves.push(Move::new(Source::Point(point), Target::Off, die));
        }
    }

    moves
}

/// Exact pip, or a larger die from the rearmost checker
fn can_bear_off(board: &Board, color: Color, index: usize, die: u8) -> bool {
    let needed = distance_to_off(index);
    if die == needed {
        return true;
    }
    if die < needed {
        return false;
    }
    // Larger die: nothing may sit farther from home.
    color.route()[..index]
        .iter()
        .all(|&p| board.count_at(p, color) == 0)
}

/// Whether `color` holds six consecutive points along the opponent's route
/// while the opponent has no checker in its home quarter yet.
pub fn forms_illegal_block(board: &Board, color: Color) -> bool {
    let opponent = color.opponent();
    let opponent_home = opponent
        .home_points()
        .iter()
        .any(|&p| board.owner_at(p) == Some(opponent));
    if opponent_home {
        return false;
    }

    let mut run = 0;
    for &point in opponent.route() {
        if board.owner_at(point) == Some(color) {
            run += 1;
            if run >= BLOCK_LENGTH {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// Every legal way for `color` to play `dice` from `board`.
///
/// `turn_count` and `moves_from_head` feed the head rule. An empty result
/// means the player has no legal move.
pub fn legal_sequences(
    board: &Board,
    dice: &DiceSet,
    color: Color,
    turn_count: u32,
    moves_from_head: u8,
) -> Vec<MoveSequence> {
    if dice.is_empty() {
        return Vec::new();
    }

    let head_limit = head_move_limit(turn_count, dice);
    let mut leaves = Vec::new();
    let mut prefix = Vec::new();
    search(
        board,
        dice.faces(),
        color,
        moves_from_head,
        head_limit,
        &mut prefix,
        &mut leaves,
    );

    let max_used = leaves.iter().map(|(seq, _)| seq.len()).max().unwrap_or(0);
    if max_used == 0 {
        return Vec::new();
    }
    leaves.retain(|(seq, _)| seq.len() == max_used);

    let faces = dice.faces();
    if max_used == 1 && faces.len() == 2 && faces[0] != faces[1] {
        let head_allowed = moves_from_head < head_limit;
        let playable: Vec<u8> = faces
            .iter()
            .copied()
            .filter(|&die| !single_moves(board, die, color, head_allowed).is_empty())
            .collect();
        if playable.len() > 1 {
            if let Some(&larger) = playable.iter().max() {
                leaves.retain(|(seq, _)| seq[0].die == larger);
            }
        }
    }

    leaves
        .into_iter()
        .filter(|(_, result)| !forms_illegal_block(result, color))
        .map(|(seq, _)| seq)
        .collect()
}

/// Depth-first enumeration. Each leaf is the sequence played so far plus
/// the board it produces.
fn search(
    board: &Board,
    dice: &[u8],
    color: Color,
    head_used: u8,
    head_limit: u8,
    prefix: &mut Vec<Move>,
    leaves: &mut Vec<(MoveSequence, Board)>,
) {
    if dice.is_empty() || board.remaining(color) == 0 {
        leaves.push((prefix.clone(), *board));
        return;
    }

    let mut tried = [false; 7];
    let mut extended = false;

    for (i, &die) in dice.iter().enumerate() {
        if tried[die as usize] {
            continue;
        }
        tried[die as usize] = true;

        let mut rest = dice.to_vec();
        rest.remove(i);

        for mv in single_moves(board, die, color, head_used < head_limit) {
            extended = true;
            let next = board.apply_move(mv, color);
            let head = head_used + u8::from(mv.is_from_head(color));
            prefix.push(mv);
            search(&next, &rest, color, head, head_limit, prefix, leaves);
            prefix.pop();
        }
    }

    if !extended {
        leaves.push((prefix.clone(), *board));
    }
}
