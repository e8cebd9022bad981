//! Computer players for self-play and load testing.
//!
//! - Easy: random legal move
//! - Medium: prefers bearing off, then the move that advances the
//!   rearmost checker

use crate::actions::GameAction;
use crate::board::{Move, Source, Target};
use crate::game::{GameState, TurnPhase};
use crate::route::Color;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
}

/// A bot player that can decide on actions
pub struct Bot {
    pub color: Color,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(color: Color, difficulty: BotDifficulty) -> Self {
        Self {
            color,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(color: Color, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            color,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose an action from the valid actions
    pub fn choose_action(&mut self, game: &GameState) -> Option<GameAction> {
        if game.current_player != self.color {
            return None;
        }
        match game.phase {
            TurnPhase::AwaitingRoll => Some(GameAction::RollDice),
            TurnPhase::AwaitingMove => {
                let moves = game.legal_moves();
                let chosen = match self.difficulty {
                    BotDifficulty::Easy => moves.choose(&mut self.rng).copied(),
                    BotDifficulty::Medium => self.choose_medium(&moves),
                }?;
                Some(GameAction::MoveChecker {
                    from: chosen.from,
                    to: chosen.to,
                })
            }
            TurnPhase::Finished { .. } => None,
        }
    }

    /// Take the bot's whole turn, rolling with its own RNG
    pub fn play_turn(&mut self, game: &mut GameState) {
        while game.current_player == self.color && !game.is_finished() && !game.no_legal_moves {
            let result = match self.choose_action(game) {
                Some(GameAction::RollDice) => game.roll(self.color, &mut self.rng),
                Some(action) => game.apply_action(self.color, action),
                None => break,
            };
            if result.is_err() {
                break;
            }
        }
        if game.no_legal_moves && game.current_player == self.color {
            let _ = game.end_turn();
        }
    }

    fn choose_medium(&mut self, moves: &[Move]) -> Option<Move> {
        if let Some(off) = moves.iter().find(|m| m.to == Target::Off) {
            return Some(*off);
        }
        let color = self.color;
        let rearmost = moves
            .iter()
            .filter_map(|m| match m.from {
                Source::Bar => Some((0, *m)),
                Source::Point(p) => color.route_index(p).map(|i| (i + 1, *m)),
            })
            .min_by_key(|(idx, m)| (*idx, std::cmp::Reverse(m.die)))
            .map(|(_, m)| m);
        rearmost.or_else(|| moves.choose(&mut self.rng).copied())
    }
}
