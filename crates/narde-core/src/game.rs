//! Turn controller.
//!
//! `GameState` owns the live board of one match and is the only thing that
//! mutates it. A turn runs roll → move (repeated) → end of turn; the set of
//! legal sequences is recomputed after every accepted move, and a move is
//! accepted only when it starts one of those sequences.

use crate::actions::{GameAction, GameEvent, WinReason};
use crate::board::{Board, Move, MoveSequence, Source, Target};
use crate::dice::DiceSet;
use crate::movegen::legal_sequences;
use crate::route::{Color, CHECKERS_PER_SIDE};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the current turn stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Current player must roll
    AwaitingRoll,

    /// Dice are on the board; current player moves checkers
    AwaitingMove,

    /// Match is over
    Finished { winner: Color, reason: WinReason },
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Illegal move {from:?} -> {to:?}")]
    IllegalMove { from: Source, to: Target },

    #[error("Game is over")]
    GameOver,
}

/// The complete state of one match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// The live board
    pub board: Board,
    /// Dice left to play this turn
    pub dice: DiceSet,
    /// Side to act
    pub current_player: Color,
    /// Turn number (starts at 1, both sides count)
    pub turn_count: u32,
    /// Checkers moved off the head point this turn
    pub moves_from_head: u8,
    /// Current turn phase
    pub phase: TurnPhase,
    /// Last dice roll
    pub last_roll: Option<(u8, u8)>,
    /// The roll could not be played; turn is about to pass
    pub no_legal_moves: bool,
    #[serde(skip)]
    legal_sequences: Vec<MoveSequence>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// New match from the opening position, White to roll
    pub fn new() -> Self {
        Self::from_position(Board::starting(), Color::White, 1)
    }

    /// Start from an arbitrary position (used for puzzles and tests)
    pub fn from_position(board: Board, current_player: Color, turn_count: u32) -> Self {
        Self {
            board,
            dice: DiceSet::empty(),
            current_player,
            turn_count,
            moves_from_head: 0,
            phase: TurnPhase::AwaitingRoll,
            last_roll: None,
            no_legal_moves: false,
            legal_sequences: Vec::new(),
        }
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, TurnPhase::Finished { .. })
    }

    /// Get the winner if the game is finished
    pub fn winner(&self) -> Option<Color> {
        match self.phase {
            TurnPhase::Finished { winner, .. } => Some(winner),
            _ => None,
        }
    }

    /// Sequences the current player may still play this turn
    pub fn legal_sequences(&self) -> &[MoveSequence] {
        &self.legal_sequences
    }

    /// Distinct first moves of the legal sequences
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves: Vec<Move> = Vec::new();
        for seq in &self.legal_sequences {
            if let Some(first) = seq.first() {
                if !moves.contains(first) {
                    moves.push(*first);
                }
            }
        }
        moves
    }

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: Color) -> Vec<GameAction> {
        if player != self.current_player {
            return Vec::new();
        }
        match self.phase {
            TurnPhase::AwaitingRoll => vec![GameAction::RollDice],
            TurnPhase::AwaitingMove => {
                let mut actions: Vec<GameAction> = Vec::new();
                for mv in self.legal_moves() {
                    let action = GameAction::MoveChecker {
                        from: mv.from,
                        to: mv.to,
                    };
                    if !actions.contains(&action) {
                        actions.push(action);
                    }
                }
                actions
            }
            TurnPhase::Finished { .. } => Vec::new(),
        }
    }

    /// Apply an action to the game state, rolling with the thread RNG
    pub fn apply_action(
        &mut self,
        player: Color,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::RollDice => self.roll(player, &mut rand::thread_rng()),
            GameAction::MoveChecker { from, to } => self.move_checker(player, from, to),
        }
    }

    /// Roll two dice for `player`
    pub fn roll<R: Rng + ?Sized>(
        &mut self,
        player: Color,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.check_turn(player, TurnPhase::AwaitingRoll)?;
        let (die1, die2) = DiceSet::roll(rng);
        self.apply_roll(player, die1, die2)
    }

    /// Put a known roll on the board for `player`
    pub fn apply_roll(
        &mut self,
        player: Color,
        die1: u8,
        die2: u8,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.check_turn(player, TurnPhase::AwaitingRoll)?;
        if !(1..=6).contains(&die1) || !(1..=6).contains(&die2) {
            return Err(GameError::InvalidPhase);
        }

        self.dice = DiceSet::from_roll(die1, die2);
        self.last_roll = Some((die1, die2));
        self.phase = TurnPhase::AwaitingMove;
        self.recompute();

        let mut events = vec![GameEvent::DiceRolled {
            player,
            roll: (die1, die2),
            dice: self.dice.faces().to_vec(),
        }];

        if self.legal_sequences.is_empty() {
            self.no_legal_moves = true;
            events.push(GameEvent::NoLegalMoves { player });
        }

        Ok(events)
    }

    /// Move one checker for `player`.
    ///
    /// Accepted only if `(from, to)` starts one of the legal sequences.
    pub fn move_checker(
        &mut self,
        player: Color,
        from: Source,
        to: Target,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.check_turn(player, TurnPhase::AwaitingMove)?;

        // Several dice can bear off from the same point; spend the smallest.
        let mv = self
            .legal_sequences
            .iter()
            .filter_map(|seq| seq.first())
            .filter(|m| m.from == from && m.to == to)
            .min_by_key(|m| m.die)
            .copied()
            .ok_or(GameError::IllegalMove { from, to })?;

        self.board = self.board.apply_move(mv, player);
        self.dice.consume(mv.die);
        if mv.is_from_head(player) {
            self.moves_from_head += 1;
        }

        let mut events = vec![GameEvent::CheckerMoved { player, mv }];

        if self.board.off(player) == CHECKERS_PER_SIDE {
            events.extend(self.finish(player, WinReason::BorneOff));
            return Ok(events);
        }

        self.recompute();
        if self.legal_sequences.is_empty() {
            events.extend(self.end_turn()?);
        }

        Ok(events)
    }

    /// Pass the turn to the other side
    pub fn end_turn(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }

        self.dice.clear();
        self.legal_sequences.clear();
        self.moves_from_head = 0;
        self.no_legal_moves = false;
        self.current_player = self.current_player.opponent();
        self.turn_count += 1;
        self.phase = TurnPhase::AwaitingRoll;

        Ok(vec![GameEvent::TurnEnded {
            next_player: self.current_player,
            turn_count: self.turn_count,
        }])
    }

    /// End the match in favour of `loser`'s opponent
    pub fn concede(&mut self, loser: Color, reason: WinReason) -> Result<Vec<GameEvent>, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        Ok(self.finish(loser.opponent(), reason))
    }

    /// Projection of the state pushed to clients
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            board: self.board,
            dice: self.dice.faces().to_vec(),
            last_roll: self.last_roll,
            current_player: self.current_player,
            turn_count: self.turn_count,
            phase: self.phase,
            winner: self.winner(),
            legal_moves: self.legal_moves(),
            no_legal_moves: self.no_legal_moves,
        }
    }

    fn check_turn(&self, player: Color, expected: TurnPhase) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        if self.phase != expected {
            return Err(GameError::InvalidPhase);
        }
        Ok(())
    }

    fn recompute(&mut self) {
        self.legal_sequences = legal_sequences(
            &self.board,
            &self.dice,
            self.current_player,
            self.turn_count,
            self.moves_from_head,
        );
    }

    fn finish(&mut self, winner: Color, reason: WinReason) -> Vec<GameEvent> {
        self.dice.clear();
        self.legal_sequences.clear();
        self.no_legal_moves = false;
        self.phase = TurnPhase::Finished { winner, reason };
        vec![GameEvent::GameWon {
            player: winner,
            reason,
        }]
    }
}

/// Full board/dice/turn projection sent after each mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub board: Board,
    pub dice: Vec<u8>,
    pub last_roll: Option<(u8, u8)>,
    pub current_player: Color,
    pub turn_count: u32,
    pub phase: TurnPhase,
    pub winner: Option<Color>,
    /// Moves the current player may start with
    pub legal_moves: Vec<Move>,
    pub no_legal_moves: bool,
}
