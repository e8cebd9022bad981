//! Narde - a long-backgammon rules engine
//!
//! This crate provides the authoritative match logic for long backgammon:
//! - Per-color routes around the 24 points, heads and home quarters
//! - Board representation with bar and borne-off counts
//! - Exhaustive legal-move search under the variant's rules
//! - Turn state machine with win detection
//!
//! # Architecture
//!
//! The engine is synchronous and free of I/O. A server owns one
//! [`GameState`] per match, feeds it validated player intents and broadcasts
//! [`MatchSnapshot`]s; timers and networking live outside this crate.
//!
//! # Modules
//!
//! - [`route`]: Point numbering, routes, heads and homes
//! - [`board`]: Board, moves and invariants
//! - [`dice`]: Remaining dice for a turn
//! - [`movegen`]: Legal move sequences
//! - [`game`]: Turn controller
//! - [`bot`]: Computer players

pub mod actions;
pub mod board;
pub mod bot;
pub mod dice;
pub mod game;
pub mod movegen;
pub mod route;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent, WinReason};
pub use board::{Board, BoardError, Move, MoveSequence, Source, Stack, Target};
pub use bot::{Bot, BotDifficulty};
pub use dice::DiceSet;
pub use game::{GameError, GameState, MatchSnapshot, TurnPhase};
pub use movegen::{forms_illegal_block, head_move_limit, legal_sequences, single_moves};
pub use route::{Color, PointId, CHECKERS_PER_SIDE, HOME_SIZE, POINT_COUNT};
