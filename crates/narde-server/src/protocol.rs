//! WebSocket protocol messages for Narde matches.

use narde_core::{Color, MatchSnapshot, Source, Target, WinReason};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Open a new match
    CreateMatch,

    /// Take a seat in (or return to) a match
    Join {
        match_id: Uuid,
        token: String,
        #[serde(default)]
        color_hint: Option<Color>,
    },

    /// Roll the dice
    Roll,

    /// Move one checker
    Move { from: Source, to: Target },

    /// Leave the match (forfeits a match in progress)
    Leave,

    /// Request match list
    ListMatches,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned session ID
    Welcome { session_id: Uuid },

    /// Match created successfully
    MatchCreated { match_id: Uuid },

    /// Seated in a match
    Joined {
        match_id: Uuid,
        color: Color,
        player_id: String,
    },

    /// Left the match
    LeftMatch,

    /// Full state after a mutation
    StateSnapshot { state: MatchSnapshot },

    /// Action was rejected; state unchanged
    IllegalAction { reason: String },

    /// The roll cannot be played; turn passes shortly
    NoLegalMoves { player: Color },

    /// The other player dropped; they may still return
    OpponentDisconnected { color: Color, grace_secs: u64 },

    /// The other player is back
    OpponentReconnected { color: Color },

    /// Match over
    MatchConcluded { winner: Color, reason: WinReason },

    /// List of matches
    MatchList { matches: Vec<MatchInfo> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Match information for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: Uuid,
    pub players: Vec<SeatInfo>,
    pub status: MatchStatus,
}

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub color: Color,
    pub player_id: String,
    pub display_name: String,
    pub connected: bool,
}

/// Match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Waiting,
    InGame,
    Finished,
    /// Torn down; only ever sent to the lobby
    Closed,
}
