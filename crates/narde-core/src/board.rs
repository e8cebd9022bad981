//! Board representation: 24 points, the bar and the borne-off trays.
//!
//! This module contains:
//! - Checker stacks and the fixed 24-slot point array
//! - Move sources and targets (bar, point, off)
//! - The starting position with both heads stacked
//! - Conservation and exclusivity checks

use crate::route::{Color, PointId, CHECKERS_PER_SIDE, POINT_COUNT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Checkers of one color sitting on a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub owner: Color,
    pub count: u8,
}

/// Where a checker is moved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Bar,
    Point(PointId),
}

/// Where a checker is moved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Point(PointId),
    Off,
}

/// A single checker movement using one die
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Source,
    pub to: Target,
    pub die: u8,
}

impl Move {
    pub fn new(from: Source, to: Target, die: u8) -> Self {
        Self { from, to, die }
    }

    /// Whether this move lifts a checker off `color`'s head point
    pub fn is_from_head(&self, color: Color) -> bool {
        self.from == Source::Point(color.head())
    }
}

/// One complete legal use of the dice for a turn
pub type MoveSequence = Vec<Move>;

/// Ways a board can violate its invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("{color} has {found} checkers, expected {expected}")]
    CheckerCount {
        color: Color,
        found: u32,
        expected: u8,
    },

    #[error("point {0} holds an empty stack")]
    EmptyStack(PointId),
}

/// The full board position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    points: [Option<Stack>; POINT_COUNT],
    bar: [u8; 2],
    off: [u8; 2],
}

impl Default for Board {
    fn default() -> Self {
        Self::starting()
    }
}

impl Board {
    /// A board with no checkers at all
    pub fn empty() -> Self {
        Self {
            points: [None; POINT_COUNT],
            bar: [0; 2],
            off: [0; 2],
        }
    }

    /// Opening position: every checker stacked on its owner's head
    pub fn starting() -> Self {
        let mut board = Self::empty();
        for color in Color::ALL {
            board.set_point(color.head(), Some(color), CHECKERS_PER_SIDE);
        }
        board
    }

    fn slot(point: PointId) -> usize {
        debug_assert!((1..=POINT_COUNT as PointId).contains(&point));
        point as usize - 1
    }

    /// Stack on a point, if any
    pub fn point(&self, point: PointId) -> Option<Stack> {
        self.points[Self::slot(point)]
    }

    /// Owner of a point, if occupied
    pub fn owner_at(&self, point: PointId) -> Option<Color> {
        self.point(point).map(|s| s.owner)
    }

    /// Number of `color` checkers on a point
    pub fn count_at(&self, point: PointId, color: Color) -> u8 {
        match self.point(point) {
            Some(stack) if stack.owner == color => stack.count,
            _ => 0,
        }
    }

    /// Overwrite a point. A zero count or `None` owner clears it.
    pub fn set_point(&mut self, point: PointId, owner: Option<Color>, count: u8) {
        self.points[Self::slot(point)] = match owner {
            Some(owner) if count > 0 => Some(Stack { owner, count }),
            _ => None,
        };
    }

    pub fn bar(&self, color: Color) -> u8 {
        self.bar[color.index()]
    }

    pub fn set_bar(&mut self, color: Color, count: u8) {
        self.bar[color.index()] = count;
    }

    pub fn off(&self, color: Color) -> u8 {
        self.off[color.index()]
    }

    pub fn set_off(&mut self, color: Color, count: u8) {
        self.off[color.index()] = count;
    }

    /// Points currently holding `color` checkers, ascending
    pub fn occupied_by(&self, color: Color) -> impl Iterator<Item = PointId> + '_ {
        self.points.iter().enumerate().filter_map(move |(i, slot)| match slot {
            Some(stack) if stack.owner == color => Some(i as PointId + 1),
            _ => None,
        })
    }

    /// Checkers of `color` on points (excluding bar and off)
    pub fn on_points(&self, color: Color) -> u32 {
        self.points
            .iter()
            .flatten()
            .filter(|s| s.owner == color)
            .map(|s| s.count as u32)
            .sum()
    }

    /// Checkers of `color` anywhere: points, bar and off
    pub fn checker_total(&self, color: Color) -> u32 {
        self.on_points(color) + self.bar(color) as u32 + self.off(color) as u32
    }

    /// Checkers still in play (not borne off)
    pub fn remaining(&self, color: Color) -> u8 {
        CHECKERS_PER_SIDE.saturating_sub(self.off(color))
    }

    /// True when no `color` checker is outside its home quarter.
    ///
    /// A checker on the bar is outside home.
    pub fn is_all_checkers_home(&self, color: Color) -> bool {
        self.bar(color) == 0 && self.occupied_by(color).all(|p| color.is_home(p))
    }

    /// Apply a move for `color` and return the resulting board.
    ///
    /// The move is not validated; callers must only pass moves produced by
    /// the move generator.
    pub fn apply_move(&self, mv: Move, color: Color) -> Board {
        let mut next = *self;

        match mv.from {
            Source::Bar => {
                next.bar[color.index()] = next.bar(color).saturating_sub(1);
            }
            Source::Point(point) => {
                let count = next.count_at(point, color);
                next.set_point(point, Some(color), count.saturating_sub(1));
            }
        }

        match mv.to {
            Target::Off => {
                next.off[color.index()] += 1;
            }
            Target::Point(point) => {
                let count = next.count_at(point, color);
                next.set_point(point, Some(color), count + 1);
            }
        }

        next
    }

    /// Check conservation (15 per color) and that no stack is empty.
    ///
    /// Two colors on one point cannot be represented, so exclusivity holds
    /// structurally.
    pub fn validate(&self) -> Result<(), BoardError> {
        for (i, slot) in self.points.iter().enumerate() {
            if let Some(stack) = slot {
                if stack.count == 0 {
                    return Err(BoardError::EmptyStack(i as PointId + 1));
                }
            }
        }
        for color in Color::ALL {
            let found = self.checker_total(color);
            if found != CHECKERS_PER_SIDE as u32 {
                return Err(BoardError::CheckerCount {
                    color,
                    found,
                    expected: CHECKERS_PER_SIDE,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_starting_position() {
        let board = Board::starting();
        assert_eq!(board.point(24), Some(Stack { owner: Color::White, count: 15 }));
        assert_eq!(board.point(12), Some(Stack { owner: Color::Black, count: 15 }));
        assert_eq!(board.occupied_by(Color::White).collect::<Vec<_>>(), vec![24]);
        assert!(board.validate().is_ok());
    }

    #[test]
    fn test_apply_move_leaves_original_untouched() {
        let board = Board::starting();
        let mv = Move::new(Source::Point(24), Target::Point(21), 3);
        let next = board.apply_move(mv, Color::White);

        assert_eq!(board.count_at(24, Color::White), 15);
        assert_eq!(next.count_at(24, Color::White), 14);
        assert_eq!(next.count_at(21, Color::White), 1);
        assert!(next.validate().is_ok());
    }

    #[test]
    fn test_apply_move_from_bar_and_off() {
        let mut board = Board::empty();
        board.set_bar(Color::White, 1);
        board.set_point(3, Some(Color::White), 14);

        let entered = board.apply_move(Move::new(Source::Bar, Target::Point(22), 3), Color::White);
        assert_eq!(entered.bar(Color::White), 0);
        assert_eq!(entered.count_at(22, Color::White), 1);

        let borne = entered.apply_move(Move::new(Source::Point(3), Target::Off, 3), Color::White);
        assert_eq!(borne.off(Color::White), 1);
        assert_eq!(borne.count_at(3, Color::White), 13);
    }

    #[test]
    fn test_emptied_point_is_cleared() {
        let mut board = Board::starting();
        board.set_point(20, Some(Color::White), 1);
        board.set_point(24, Some(Color::White), 14);

        let next = board.apply_move(Move::new(Source::Point(20), Target::Point(18), 2), Color::White);
        assert_eq!(next.point(20), None);
    }

    #[test]
    fn test_all_home() {
        let mut board = Board::empty();
        board.set_point(6, Some(Color::White), 10);
        board.set_point(1, Some(Color::White), 5);
        assert!(board.is_all_checkers_home(Color::White));

        board.set_bar(Color::White, 1);
        assert!(!board.is_all_checkers_home(Color::White));

        board.set_bar(Color::White, 0);
        board.set_point(7, Some(Color::White), 1);
        assert!(!board.is_all_checkers_home(Color::White));
    }

    #[test]
    fn test_validate_detects_lost_checker() {
        let mut board = Board::starting();
        board.set_point(24, Some(Color::White), 14);
        assert_eq!(
            board.validate(),
            Err(BoardError::CheckerCount {
                color: Color::White,
                found: 14,
                expected: 15
            })
        );
    }

    #[test]
    fn test_checker_total_counts_bar_and_off() {
        let mut board = Board::empty();
        board.set_point(5, Some(Color::Black), 10);
        board.set_bar(Color::Black, 2);
        board.set_off(Color::Black, 3);
        assert_eq!(board.checker_total(Color::Black), 15);
        assert_eq!(board.remaining(Color::Black), 12);
    }
}
