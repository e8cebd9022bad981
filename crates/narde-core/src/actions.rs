//! Player actions and the events they produce.
//!
//! This module defines the inbound intents the turn controller accepts and
//! the events emitted after each accepted mutation.

use crate::board::{Move, Source, Target};
use crate::route::Color;
use serde::{Deserialize, Serialize};

/// Intents a seated player can submit during a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Roll the dice (start of turn)
    RollDice,
    /// Move one checker using one die
    MoveChecker { from: Source, to: Target },
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    /// All 15 checkers borne off
    BorneOff,
    /// The opponent left the match
    OpponentLeft,
    /// The opponent did not reconnect in time
    OpponentTimedOut,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled {
        player: Color,
        roll: (u8, u8),
        dice: Vec<u8>,
    },

    /// A checker was moved
    CheckerMoved { player: Color, mv: Move },

    /// The roll cannot be played; the turn will be ended for the player
    NoLegalMoves { player: Color },

    /// Turn passed to the other side
    TurnEnded { next_player: Color, turn_count: u32 },

    /// The match has a winner
    GameWon { player: Color, reason: WinReason },
}
