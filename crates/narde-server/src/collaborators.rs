//! Interfaces to services outside the match engine.
//!
//! The match actor only ever talks to identity, statistics and the lobby
//! through these traits. The in-memory implementations back the standalone
//! binary and the tests.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::protocol::MatchStatus;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Authentication rejected: {0}")]
    Rejected(String),

    /// Raised by remote implementations; the in-memory ones never fail
    #[allow(dead_code)]
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Who a player is, as resolved from their token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub player_id: String,
    pub display_name: String,
}

/// Resolves a client token to a player identity
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<PlayerIdentity, CollaboratorError>;
}

/// Persists win/loss results
#[async_trait]
pub trait StatsRecorder: Send + Sync {
    async fn record_result(&self, player_id: &str, won: bool) -> Result<(), CollaboratorError>;
}

/// Receives match status changes for the lobby listing
#[async_trait]
pub trait LobbyNotifier: Send + Sync {
    async fn notify(&self, match_id: Uuid, status: MatchStatus);
}

/// The set of collaborators injected into every match
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityResolver>,
    pub stats: Arc<dyn StatsRecorder>,
    pub lobby: Arc<dyn LobbyNotifier>,
}

impl Collaborators {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        stats: Arc<dyn StatsRecorder>,
        lobby: Arc<dyn LobbyNotifier>,
    ) -> Self {
        Self {
            identity,
            stats,
            lobby,
        }
    }

    /// In-memory services for running the server standalone
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(TokenIdentity),
            Arc::new(InMemoryStats::new()),
            Arc::new(InMemoryLobby::new()),
        )
    }
}

/// Development identity: the token is `player_id` or `player_id:Display Name`.
pub struct TokenIdentity;

#[async_trait]
impl IdentityResolver for TokenIdentity {
    async fn resolve(&self, token: &str) -> Result<PlayerIdentity, CollaboratorError> {
        let token = token.trim();
        let (id, name) = match token.split_once(':') {
            Some((id, name)) => (id.trim(), name.trim()),
            None => (token, token),
        };
        if id.is_empty() {
            return Err(CollaboratorError::Rejected("empty token".to_string()));
        }
        let display_name = if name.is_empty() { id } else { name };
        Ok(PlayerIdentity {
            player_id: id.to_string(),
            display_name: display_name.to_string(),
        })
    }
}

/// Per-player record kept by [`InMemoryStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub current_streak: u32,
    pub best_streak: u32,
}

impl PlayerStats {
    fn record(&mut self, won: bool) {
        self.games += 1;
        if won {
            self.wins += 1;
            self.current_streak += 1;
            self.best_streak = self.best_streak.max(self.current_streak);
        } else {
            self.losses += 1;
            self.current_streak = 0;
        }
    }

    /// Share of games won, 0.0 before the first game
    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }
}

#[derive(Default)]
pub struct InMemoryStats {
    players: DashMap<String, PlayerStats>,
}

impl InMemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, player_id: &str) -> Option<PlayerStats> {
        self.players.get(player_id).map(|s| s.clone())
    }
}

#[async_trait]
impl StatsRecorder for InMemoryStats {
    async fn record_result(&self, player_id: &str, won: bool) -> Result<(), CollaboratorError> {
        let mut entry = self.players.entry(player_id.to_string()).or_default();
        entry.record(won);
        debug!(
            "Stats for {}: {} games, {} wins, win rate {:.2}",
            player_id,
            entry.games,
            entry.wins,
            entry.win_rate()
        );
        Ok(())
    }
}

/// Lobby listing kept in memory
#[derive(Default)]
pub struct InMemoryLobby {
    matches: DashMap<Uuid, MatchStatus>,
}

impl InMemoryLobby {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn status(&self, match_id: Uuid) -> Option<MatchStatus> {
        self.matches.get(&match_id).map(|s| *s)
    }
}

#[async_trait]
impl LobbyNotifier for InMemoryLobby {
    async fn notify(&self, match_id: Uuid, status: MatchStatus) {
        info!("Lobby: match {} is now {:?}", match_id, status);
        if status == MatchStatus::Closed {
            self.matches.remove(&match_id);
        } else {
            self.matches.insert(match_id, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_token_identity() {
        let identity = TokenIdentity.resolve("p1:Alice").await.unwrap();
        assert_eq!(identity.player_id, "p1");
        assert_eq!(identity.display_name, "Alice");

        let bare = TokenIdentity.resolve("bob").await.unwrap();
        assert_eq!(bare.display_name, "bob");

        assert!(TokenIdentity.resolve("   ").await.is_err());
        assert!(TokenIdentity.resolve(":Nobody").await.is_err());
    }

    #[tokio::test]
    async fn test_stats_streaks() {
        let stats = InMemoryStats::new();
        stats.record_result("p1", true).await.unwrap();
        stats.record_result("p1", true).await.unwrap();
        stats.record_result("p1", false).await.unwrap();
        stats.record_result("p1", true).await.unwrap();

        let record = stats.get("p1").unwrap();
        assert_eq!(
            record,
            PlayerStats {
                games: 4,
                wins: 3,
                losses: 1,
                current_streak: 1,
                best_streak: 2,
            }
        );
        assert!((record.win_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_lobby_tracks_status() {
        let lobby = InMemoryLobby::new();
        let id = Uuid::new_v4();
        lobby.notify(id, MatchStatus::Waiting).await;
        lobby.notify(id, MatchStatus::InGame).await;
        assert_eq!(lobby.status(id), Some(MatchStatus::InGame));
        lobby.notify(id, MatchStatus::Closed).await;
        assert_eq!(lobby.status(id), None);
    }
}
