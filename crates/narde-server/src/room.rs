//! Match room: seats, sessions and the game they play.
//!
//! The room is plain synchronous state. The match actor serializes every
//! call into it and turns the outcomes into messages, timers and
//! collaborator calls.

use narde_core::{
    Color, GameAction, GameError, GameEvent, GameState, Source, Target, TurnPhase, WinReason,
};
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::collaborators::PlayerIdentity;
use crate::protocol::{MatchInfo, MatchStatus, SeatInfo};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Match is full")]
    RoomFull,

    #[error("Player already seated")]
    AlreadySeated,

    #[error("Not in this match")]
    NotInMatch,

    #[error("Match has not started")]
    MatchNotStarted,

    #[error("Match is over")]
    MatchFinished,

    #[error("{0}")]
    Game(#[from] GameError),
}

/// A player's connection bound to a seat.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    pub color: Color,
    pub identity: PlayerIdentity,
    pub connected: bool,
    /// Set while waiting for the player to come back
    pub reconnect_deadline: Option<Instant>,
}

impl Session {
    pub fn to_info(&self) -> SeatInfo {
        SeatInfo {
            color: self.color,
            player_id: self.identity.player_id.clone(),
            display_name: self.identity.display_name.clone(),
            connected: self.connected,
        }
    }
}

/// Result of a successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// New seat; `started` when this join filled the match
    Seated { color: Color, started: bool },
    /// Same identity came back inside its window
    Reconnected { color: Color, previous_session: Uuid },
}

/// Result of a consented leave or expired disconnect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Seat released; `empty` when nobody is left
    Removed { empty: bool },
    /// Match was in progress; the other player wins
    Forfeited { winner: Color },
}

/// Result of an unexpected disconnect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    Removed { empty: bool },
    AwaitingReconnect { color: Color },
}

/// Final result handed to stats and lobby
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conclusion {
    pub winner: Color,
    pub reason: WinReason,
    pub winner_id: String,
    pub loser_id: String,
}

/// A two-player match.
pub struct MatchRoom {
    pub id: Uuid,
    pub status: MatchStatus,
    pub sessions: Vec<Session>,
    pub game: GameState,
    /// Identities that held each color, kept after they leave
    players: [Option<PlayerIdentity>; 2],
    concluded: bool,
}

impl MatchRoom {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            status: MatchStatus::Waiting,
            sessions: Vec::new(),
            game: GameState::new(),
            players: [None, None],
            concluded: false,
        }
    }

    pub fn session(&self, session_id: Uuid) -> Option<&Session> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }

    pub fn color_of(&self, session_id: Uuid) -> Option<Color> {
        self.session(session_id).map(|s| s.color)
    }

    pub fn session_for(&self, color: Color) -> Option<&Session> {
        self.sessions.iter().find(|s| s.color == color)
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn join(
        &mut self,
        session_id: Uuid,
        identity: PlayerIdentity,
        color_hint: Option<Color>,
    ) -> Result<JoinOutcome, RoomError> {
        if let Some(existing) = self
            .sessions
            .iter_mut()
            .find(|s| s.identity.player_id == identity.player_id)
        {
            if existing.connected {
                return Err(RoomError::AlreadySeated);
            }
            let previous_session = existing.session_id;
            existing.session_id = session_id;
            existing.connected = true;
            existing.reconnect_deadline = None;
            return Ok(JoinOutcome::Reconnected {
                color: existing.color,
                previous_session,
            });
        }

        if self.status == MatchStatus::Finished {
            return Err(RoomError::MatchFinished);
        }
        if self.sessions.len() >= 2 {
            return Err(RoomError::RoomFull);
        }

        let color = match self.sessions.first() {
            Some(other) => other.color.opponent(),
            None => color_hint.unwrap_or(Color::White),
        };

        self.players[color.index()] = Some(identity.clone());
        self.sessions.push(Session {
            session_id,
            color,
            identity,
            connected: true,
            reconnect_deadline: None,
        });

        let started = self.sessions.len() == 2;
        if started {
            self.status = MatchStatus::InGame;
        }

        Ok(JoinOutcome::Seated { color, started })
    }

    /// Consented leave
    pub fn leave(&mut self, session_id: Uuid) -> Result<LeaveOutcome, RoomError> {
        let color = self.color_of(session_id).ok_or(RoomError::NotInMatch)?;
        self.release(color)
    }

    /// Connection dropped without a leave
    pub fn disconnect(
        &mut self,
        session_id: Uuid,
        deadline: Instant,
    ) -> Result<DisconnectOutcome, RoomError> {
        let in_game = self.status == MatchStatus::InGame;
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
            .ok_or(RoomError::NotInMatch)?;

        if in_game {
            session.connected = false;
            session.reconnect_deadline = Some(deadline);
            return Ok(DisconnectOutcome::AwaitingReconnect {
                color: session.color,
            });
        }

        let color = session.color;
        match self.release(color)? {
            LeaveOutcome::Removed { empty } => Ok(DisconnectOutcome::Removed { empty }),
            LeaveOutcome::Forfeited { .. } => Ok(DisconnectOutcome::Removed {
                empty: self.is_empty(),
            }),
        }
    }

    /// Reconnection window for `color` ran out.
    ///
    /// Returns `None` if the player already came back.
    pub fn expire_reconnect(&mut self, color: Color) -> Option<LeaveOutcome> {
        match self.session_for(color) {
            Some(session) if !session.connected => {}
            _ => return None,
        }
        self.release_with(color, WinReason::OpponentTimedOut).ok()
    }

    pub fn roll(&mut self, session_id: Uuid) -> Result<Vec<GameEvent>, RoomError> {
        let color = self.acting_color(session_id)?;
        Ok(self.game.apply_action(color, GameAction::RollDice)?)
    }

    pub fn move_checker(
        &mut self,
        session_id: Uuid,
        from: Source,
        to: Target,
    ) -> Result<Vec<GameEvent>, RoomError> {
        let color = self.acting_color(session_id)?;
        let events = self.game.move_checker(color, from, to)?;
        if self.game.is_finished() {
            self.status = MatchStatus::Finished;
        }
        Ok(events)
    }

    /// Pass the turn after an unplayable roll. No-op if the turn already moved on.
    pub fn auto_end_turn(&mut self) -> Option<Vec<GameEvent>> {
        if self.status != MatchStatus::InGame || !self.game.no_legal_moves {
            return None;
        }
        self.game.end_turn().ok()
    }

    /// The final result, reported at most once
    pub fn take_conclusion(&mut self) -> Option<Conclusion> {
        if self.concluded {
            return None;
        }
        let (winner, reason) = match self.game.phase {
            TurnPhase::Finished { winner, reason } => (winner, reason),
            _ => return None,
        };
        self.concluded = true;
        Some(Conclusion {
            winner,
            reason,
            winner_id: self.player_id(winner),
            loser_id: self.player_id(winner.opponent()),
        })
    }

    pub fn to_info(&self) -> MatchInfo {
        let mut players: Vec<SeatInfo> = self.sessions.iter().map(|s| s.to_info()).collect();
        players.sort_by_key(|p| p.color.index());
        MatchInfo {
            id: self.id,
            players,
            status: self.status,
        }
    }

    fn player_id(&self, color: Color) -> String {
        self.players[color.index()]
            .as_ref()
            .map(|p| p.player_id.clone())
            .unwrap_or_default()
    }

    fn acting_color(&self, session_id: Uuid) -> Result<Color, RoomError> {
        let color = self.color_of(session_id).ok_or(RoomError::NotInMatch)?;
        match self.status {
            MatchStatus::Waiting => Err(RoomError::MatchNotStarted),
            MatchStatus::Finished | MatchStatus::Closed => Err(RoomError::MatchFinished),
            MatchStatus::InGame => Ok(color),
        }
    }

    fn release(&mut self, color: Color) -> Result<LeaveOutcome, RoomError> {
        self.release_with(color, WinReason::OpponentLeft)
    }

    fn release_with(&mut self, color: Color, reason: WinReason) -> Result<LeaveOutcome, RoomError> {
        let idx = self
            .sessions
            .iter()
            .position(|s| s.color == color)
            .ok_or(RoomError::NotInMatch)?;
        self.sessions.remove(idx);

        if self.status == MatchStatus::InGame {
            self.game.concede(color, reason)?;
            self.status = MatchStatus::Finished;
            return Ok(LeaveOutcome::Forfeited {
                winner: color.opponent(),
            });
        }

        if self.status == MatchStatus::Waiting {
            self.players[color.index()] = None;
        }
        Ok(LeaveOutcome::Removed {
            empty: self.sessions.is_empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narde_core::Board;
    use pretty_assertions::assert_eq;

    fn identity(id: &str) -> PlayerIdentity {
        PlayerIdentity {
            player_id: id.to_string(),
            display_name: id.to_string(),
        }
    }

    fn full_room() -> (MatchRoom, Uuid, Uuid) {
        let mut room = MatchRoom::new(Uuid::new_v4());
        let white = Uuid::new_v4();
        let black = Uuid::new_v4();
        room.join(white, identity("alice"), None).unwrap();
        room.join(black, identity("bob"), None).unwrap();
        (room, white, black)
    }

    #[test]
    fn test_join_assigns_colors() {
        let mut room = MatchRoom::new(Uuid::new_v4());
        let first = room
            .join(Uuid::new_v4(), identity("alice"), Some(Color::Black))
            .unwrap();
        assert_eq!(
            first,
            JoinOutcome::Seated {
                color: Color::Black,
                started: false
            }
        );

        let second = room
            .join(Uuid::new_v4(), identity("bob"), Some(Color::Black))
            .unwrap();
        assert_eq!(
            second,
            JoinOutcome::Seated {
                color: Color::White,
                started: true
            }
        );
        assert_eq!(room.status, MatchStatus::InGame);
    }

    #[test]
    fn test_third_player_rejected() {
        let (mut room, _, _) = full_room();
        let result = room.join(Uuid::new_v4(), identity("carol"), None);
        assert!(matches!(result, Err(RoomError::RoomFull)));
        assert_eq!(room.sessions.len(), 2);
    }

    #[test]
    fn test_same_identity_twice_rejected_while_connected() {
        let mut room = MatchRoom::new(Uuid::new_v4());
        room.join(Uuid::new_v4(), identity("alice"), None).unwrap();
        let result = room.join(Uuid::new_v4(), identity("alice"), None);
        assert!(matches!(result, Err(RoomError::AlreadySeated)));
    }

    #[test]
    fn test_actions_before_start_rejected() {
        let mut room = MatchRoom::new(Uuid::new_v4());
        let white = Uuid::new_v4();
        room.join(white, identity("alice"), None).unwrap();
        assert!(matches!(room.roll(white), Err(RoomError::MatchNotStarted)));
    }

    #[test]
    fn test_out_of_turn_roll_rejected() {
        let (mut room, _, black) = full_room();
        let result = room.roll(black);
        assert!(matches!(result, Err(RoomError::Game(GameError::NotYourTurn))));
        assert!(room.game.dice.is_empty());
    }

    #[test]
    fn test_stranger_cannot_act() {
        let (mut room, _, _) = full_room();
        assert!(matches!(room.roll(Uuid::new_v4()), Err(RoomError::NotInMatch)));
    }

    #[test]
    fn test_leave_in_game_forfeits() {
        let (mut room, white, _) = full_room();
        let outcome = room.leave(white).unwrap();
        assert_eq!(
            outcome,
            LeaveOutcome::Forfeited {
                winner: Color::Black
            }
        );
        assert_eq!(room.status, MatchStatus::Finished);

        let conclusion = room.take_conclusion().unwrap();
        assert_eq!(
            conclusion,
            Conclusion {
                winner: Color::Black,
                reason: WinReason::OpponentLeft,
                winner_id: "bob".to_string(),
                loser_id: "alice".to_string(),
            }
        );
        assert_eq!(room.take_conclusion(), None);
    }

    #[test]
    fn test_leave_while_waiting_empties_room() {
        let mut room = MatchRoom::new(Uuid::new_v4());
        let white = Uuid::new_v4();
        room.join(white, identity("alice"), None).unwrap();
        assert_eq!(room.leave(white).unwrap(), LeaveOutcome::Removed { empty: true });
        assert_eq!(room.take_conclusion(), None);
    }

    #[test]
    fn test_disconnect_then_reconnect_keeps_seat() {
        let (mut room, white, _) = full_room();
        let outcome = room.disconnect(white, Instant::now()).unwrap();
        assert_eq!(
            outcome,
            DisconnectOutcome::AwaitingReconnect {
                color: Color::White
            }
        );
        assert!(!room.session_for(Color::White).unwrap().connected);

        let new_session = Uuid::new_v4();
        let joined = room.join(new_session, identity("alice"), None).unwrap();
        assert_eq!(
            joined,
            JoinOutcome::Reconnected {
                color: Color::White,
                previous_session: white
            }
        );
        assert_eq!(room.color_of(new_session), Some(Color::White));
        assert_eq!(room.expire_reconnect(Color::White), None);
        assert_eq!(room.status, MatchStatus::InGame);
    }

    #[test]
    fn test_reconnect_window_expiry_forfeits() {
        let (mut room, white, _) = full_room();
        room.disconnect(white, Instant::now()).unwrap();

        assert_eq!(
            room.expire_reconnect(Color::White),
            Some(LeaveOutcome::Forfeited {
                winner: Color::Black
            })
        );
        let conclusion = room.take_conclusion().unwrap();
        assert_eq!(conclusion.reason, WinReason::OpponentTimedOut);
        assert_eq!(conclusion.winner_id, "bob");
    }

    #[test]
    fn test_game_state_unchanged_across_reconnect() {
        let (mut room, white, _) = full_room();
        room.roll(white).unwrap();
        let before = room.game.snapshot();

        room.disconnect(white, Instant::now()).unwrap();
        room.join(Uuid::new_v4(), identity("alice"), None).unwrap();
        assert_eq!(room.game.snapshot(), before);
    }

    #[test]
    fn test_auto_end_turn_only_after_unplayable_roll() {
        let (mut room, _, _) = full_room();
        assert_eq!(room.auto_end_turn(), None);

        let mut board = Board::empty();
        board.set_point(24, Some(Color::White), 15);
        board.set_point(12, Some(Color::Black), 5);
        board.set_point(22, Some(Color::Black), 5);
        board.set_point(21, Some(Color::Black), 5);
        room.game = GameState::from_position(board, Color::White, 5);
        room.game.apply_roll(Color::White, 2, 3).unwrap();

        let events = room.auto_end_turn().unwrap();
        assert_eq!(
            events,
            vec![GameEvent::TurnEnded {
                next_player: Color::Black,
                turn_count: 6
            }]
        );
        assert_eq!(room.auto_end_turn(), None);
    }

    #[test]
    fn test_info_lists_seats_in_color_order() {
        let mut room = MatchRoom::new(Uuid::new_v4());
        room.join(Uuid::new_v4(), identity("alice"), Some(Color::Black))
            .unwrap();
        room.join(Uuid::new_v4(), identity("bob"), None).unwrap();
        let info = room.to_info();
        assert_eq!(info.players[0].player_id, "bob");
        assert_eq!(info.players[1].player_id, "alice");
        assert_eq!(info.status, MatchStatus::InGame);
    }
}
