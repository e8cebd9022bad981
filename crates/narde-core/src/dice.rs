//! Dice still available to the player on turn.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Remaining die faces for the current turn.
///
/// Holds 0, 2 or 4 faces right after a roll (4 only on a double) and
/// shrinks as moves consume them. The face of the originating double is
/// remembered so turn rules that depend on the roll still apply once some
/// dice are used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceSet {
    faces: Vec<u8>,
    double: Option<u8>,
}

impl DiceSet {
    /// No dice (before a roll / after the turn)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Dice for a rolled pair. Doubles expand to four copies.
    pub fn from_roll(die1: u8, die2: u8) -> Self {
        debug_assert!((1..=6).contains(&die1) && (1..=6).contains(&die2));
        if die1 == die2 {
            Self {
                faces: vec![die1; 4],
                double: Some(die1),
            }
        } else {
            Self {
                faces: vec![die1, die2],
                double: None,
            }
        }
    }

    /// Roll two fair dice
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> (u8, u8) {
        (rng.gen_range(1..=6), rng.gen_range(1..=6))
    }

    pub fn faces(&self) -> &[u8] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn contains(&self, die: u8) -> bool {
        self.faces.contains(&die)
    }

    /// Face of the double this set came from, if any
    pub fn double(&self) -> Option<u8> {
        self.double
    }

    /// Remove one copy of `die`. Returns false if it was not available.
    pub fn consume(&mut self, die: u8) -> bool {
        match self.faces.iter().position(|&d| d == die) {
            Some(idx) => {
                self.faces.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.faces.clear();
        self.double = None;
    }
}
