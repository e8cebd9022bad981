//! Point numbering and the per-color routes around the board.
//!
//! Points are numbered 1 through 24. Each color walks a fixed route of all
//! 24 points from its head (starting stack) to the end of its home quarter:
//!
//! - White: 24, 23, ..., 1. Head on 24, home 1-6.
//! - Black: 12, 11, ..., 1, 24, 23, ..., 13. Head on 12, home 13-18.
//!
//! Everything the move generator needs to know about geometry is expressed
//! as a route index (0 = head, 23 = last point before bearing off).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Point number on the board (1-24)
pub type PointId = u8;

/// Number of points on the board
pub const POINT_COUNT: usize = 24;

/// Number of points in a home quarter
pub const HOME_SIZE: usize = 6;

/// Checkers each side starts with
pub const CHECKERS_PER_SIDE: u8 = 15;

const WHITE_ROUTE: [PointId; POINT_COUNT] = [
    24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1,
];

const BLACK_ROUTE: [PointId; POINT_COUNT] = [
    12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13,
];

/// Side of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Both colors, White first
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    /// The other side
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Index into per-color arrays
    pub fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// The full traversal order for this color
    pub fn route(self) -> &'static [PointId; POINT_COUNT] {
        match self {
            Color::White => &WHITE_ROUTE,
            Color::Black => &BLACK_ROUTE,
        }
    }

    /// The head (starting) point
    pub fn head(self) -> PointId {
        self.route()[0]
    }

    /// Position of `point` along this color's route.
    ///
    /// Returns `None` for point numbers outside 1-24.
    pub fn route_index(self, point: PointId) -> Option<usize> {
        if !(1..=POINT_COUNT as PointId).contains(&point) {
            return None;
        }
        let p = point as usize;
        Some(match self {
            Color::White => POINT_COUNT - p,
            Color::Black => {
                if p <= 12 {
                    12 - p
                } else {
                    36 - p
                }
            }
        })
    }

    /// Point at a route index, or `None` past the end of the route
    pub fn point_at(self, index: usize) -> Option<PointId> {
        self.route().get(index).copied()
    }

    /// Whether `point` lies in this color's home quarter
    pub fn is_home(self, point: PointId) -> bool {
        self.route_index(point)
            .map(|i| i >= POINT_COUNT - HOME_SIZE)
            .unwrap_or(false)
    }

    /// Points of the home quarter, in route order
    pub fn home_points(self) -> &'static [PointId] {
        &self.route()[POINT_COUNT - HOME_SIZE..]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Pips left to bear off a checker sitting at `route_index`
pub fn distance_to_off(route_index: usize) -> u8 {
    (POINT_COUNT - route_index) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_routes_cover_every_point_once() {
        for color in Color::ALL {
            let unique: HashSet<_> = color.route().iter().collect();
            assert_eq!(unique.len(), POINT_COUNT);
            assert!(color.route().iter().all(|p| (1..=24).contains(p)));
        }
    }

    #[test]
    fn test_route_index_inverts_point_at() {
        for color in Color::ALL {
            for i in 0..POINT_COUNT {
                let point = color.point_at(i).unwrap();
                assert_eq!(color.route_index(point), Some(i));
            }
        }
        assert_eq!(Color::White.route_index(0), None);
        assert_eq!(Color::Black.route_index(25), None);
    }

    #[test]
    fn test_heads_and_homes() {
        assert_eq!(Color::White.head(), 24);
        assert_eq!(Color::Black.head(), 12);

        assert_eq!(Color::White.home_points(), &[6, 5, 4, 3, 2, 1]);
        assert_eq!(Color::Black.home_points(), &[18, 17, 16, 15, 14, 13]);

        assert!(Color::White.is_home(1));
        assert!(!Color::White.is_home(7));
        assert!(Color::Black.is_home(13));
        assert!(!Color::Black.is_home(1));
    }

    #[test]
    fn test_black_route_wraps_from_one_to_twenty_four() {
        let one = Color::Black.route_index(1).unwrap();
        assert_eq!(Color::Black.point_at(one + 1), Some(24));
    }

    #[test]
    fn test_distance_to_off() {
        assert_eq!(distance_to_off(Color::White.route_index(6).unwrap()), 6);
        assert_eq!(distance_to_off(Color::White.route_index(1).unwrap()), 1);
        assert_eq!(distance_to_off(Color::Black.route_index(13).unwrap()), 1);
    }
}
