//! Per-match actor.
//!
//! Every match runs as one task that owns its [`MatchRoom`] and drains a
//! FIFO of commands. Client intents, disconnects and timer expiries all go
//! through the same queue, so they never interleave.

use dashmap::DashMap;
use narde_core::{Color, GameEvent, Source, Target};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::collaborators::Collaborators;
use crate::config::MatchTimings;
use crate::protocol::{MatchInfo, MatchStatus, ServerMessage};
use crate::room::{DisconnectOutcome, JoinOutcome, LeaveOutcome, MatchRoom, RoomError};

/// Channel a session's outgoing messages are written to
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// All live matches by ID
pub type MatchRegistry = Arc<DashMap<Uuid, MatchHandle>>;

/// Which match each session is seated in
pub type SessionBindings = Arc<DashMap<Uuid, Uuid>>;

/// Server-wide handles every match is started with
#[derive(Clone)]
pub struct MatchContext {
    pub timings: MatchTimings,
    pub collaborators: Collaborators,
    pub registry: MatchRegistry,
    /// Entries for the match's seated sessions are removed on disposal
    pub bindings: SessionBindings,
}

/// Timers a match can have pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Reconnect(Color),
    AutoEndTurn,
    Teardown,
}

/// Work items processed by a match actor, in arrival order
#[derive(Debug)]
pub enum MatchCommand {
    Join {
        session_id: Uuid,
        token: String,
        color_hint: Option<Color>,
        outbox: Outbox,
        /// Answered with whether the session got a seat
        seated: oneshot::Sender<bool>,
    },
    Roll {
        session_id: Uuid,
    },
    Move {
        session_id: Uuid,
        from: Source,
        to: Target,
    },
    Leave {
        session_id: Uuid,
    },
    Disconnect {
        session_id: Uuid,
    },
    Timer {
        kind: TimerKind,
        generation: u64,
    },
    Info {
        reply: oneshot::Sender<MatchInfo>,
    },
}

/// Cheap handle for posting commands to a match
#[derive(Debug, Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    tx: mpsc::UnboundedSender<MatchCommand>,
}

impl MatchHandle {
    /// Queue a command. Returns false if the match is gone.
    pub fn send(&self, cmd: MatchCommand) -> bool {
        self.tx.send(cmd).is_ok()
    }

    /// Current seats and status
    pub async fn info(&self) -> Option<MatchInfo> {
        let (reply, rx) = oneshot::channel();
        if !self.send(MatchCommand::Info { reply }) {
            return None;
        }
        rx.await.ok()
    }
}

/// Create a match, register it and start its actor.
pub fn spawn_match(id: Uuid, context: MatchContext) -> MatchHandle {
    spawn_room(MatchRoom::new(id), context)
}

fn spawn_room(room: MatchRoom, context: MatchContext) -> MatchHandle {
    let id = room.id;
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = MatchHandle { id, tx: tx.clone() };
    context.registry.insert(id, handle.clone());

    // Lobby updates are delivered one at a time, in the order they were sent.
    let (lobby_tx, mut lobby_rx) = mpsc::unbounded_channel::<MatchStatus>();
    let lobby = Arc::clone(&context.collaborators.lobby);
    tokio::spawn(async move {
        while let Some(status) = lobby_rx.recv().await {
            lobby.notify(id, status).await;
        }
    });

    let actor = MatchActor {
        room,
        outboxes: HashMap::new(),
        timers: HashMap::new(),
        next_generation: 0,
        timings: context.timings,
        collaborators: context.collaborators,
        registry: context.registry,
        bindings: context.bindings,
        lobby: lobby_tx,
        commands: tx,
        disposed: false,
    };
    actor.notify_lobby(MatchStatus::Waiting);

    info!("Match {} created", id);
    tokio::spawn(actor.run(rx));
    handle
}

struct MatchActor {
    room: MatchRoom,
    outboxes: HashMap<Uuid, Outbox>,
    timers: HashMap<TimerKind, (u64, JoinHandle<()>)>,
    next_generation: u64,
    timings: MatchTimings,
    collaborators: Collaborators,
    registry: MatchRegistry,
    bindings: SessionBindings,
    lobby: mpsc::UnboundedSender<MatchStatus>,
    /// Used by timer tasks to post back into the queue
    commands: mpsc::UnboundedSender<MatchCommand>,
    disposed: bool,
}

impl MatchActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<MatchCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
            if self.disposed {
                break;
            }
        }
        debug!("Match {} actor stopped", self.room.id);
    }

    async fn handle(&mut self, cmd: MatchCommand) {
        match cmd {
            MatchCommand::Join {
                session_id,
                token,
                color_hint,
                outbox,
                seated,
            } => {
                let ok = self.join(session_id, &token, color_hint, outbox).await;
                let _ = seated.send(ok);
            }
            MatchCommand::Roll { session_id } => {
                let result = self.room.roll(session_id);
                self.after_action(session_id, result);
            }
            MatchCommand::Move {
                session_id,
                from,
                to,
            } => {
                let result = self.room.move_checker(session_id, from, to);
                self.after_action(session_id, result);
            }
            MatchCommand::Leave { session_id } => self.leave(session_id),
            MatchCommand::Disconnect { session_id } => self.disconnect(session_id),
            MatchCommand::Timer { kind, generation } => self.fire_timer(kind, generation),
            MatchCommand::Info { reply } => {
                let _ = reply.send(self.room.to_info());
            }
        }
    }

    async fn join(
        &mut self,
        session_id: Uuid,
        token: &str,
        color_hint: Option<Color>,
        outbox: Outbox,
    ) -> bool {
        let identity = match self.collaborators.identity.resolve(token).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Match {}: join rejected for {}: {}", self.room.id, session_id, e);
                let _ = outbox.send(ServerMessage::Error {
                    message: e.to_string(),
                });
                return false;
            }
        };
        let player_id = identity.player_id.clone();

        match self.room.join(session_id, identity, color_hint) {
            Ok(JoinOutcome::Seated { color, started }) => {
                info!("Match {}: {} seated as {}", self.room.id, player_id, color);
                self.outboxes.insert(session_id, outbox);
                self.send_to(
                    session_id,
                    ServerMessage::Joined {
                        match_id: self.room.id,
                        color,
                        player_id,
                    },
                );
                if started {
                    self.notify_lobby(MatchStatus::InGame);
                }
                self.broadcast_snapshot();
                true
            }
            Ok(JoinOutcome::Reconnected {
                color,
                previous_session,
            }) => {
                info!("Match {}: {} reconnected as {}", self.room.id, player_id, color);
                self.cancel(TimerKind::Reconnect(color));
                self.outboxes.remove(&previous_session);
                self.outboxes.insert(session_id, outbox);
                self.send_to(
                    session_id,
                    ServerMessage::Joined {
                        match_id: self.room.id,
                        color,
                        player_id,
                    },
                );
                self.broadcast_except(session_id, ServerMessage::OpponentReconnected { color });
                self.broadcast_snapshot();
                true
            }
            Err(e) => {
                warn!("Match {}: join rejected for {}: {}", self.room.id, player_id, e);
                let _ = outbox.send(ServerMessage::Error {
                    message: e.to_string(),
                });
                false
            }
        }
    }

    fn after_action(
        &mut self,
        session_id: Uuid,
        result: Result<Vec<GameEvent>, RoomError>,
    ) {
        match result {
            Ok(events) => {
                for event in &events {
                    if let GameEvent::NoLegalMoves { player } = event {
                        self.broadcast(ServerMessage::NoLegalMoves { player: *player });
                        self.schedule(TimerKind::AutoEndTurn, self.timings.auto_end_turn);
                    }
                }
                self.broadcast_snapshot();
                self.check_conclusion();
            }
            Err(e) => {
                warn!("Match {}: rejected action from {}: {}", self.room.id, session_id, e);
                self.send_to(
                    session_id,
                    ServerMessage::IllegalAction {
                        reason: e.to_string(),
                    },
                );
            }
        }
    }

    fn leave(&mut self, session_id: Uuid) {
        match self.room.leave(session_id) {
            Ok(outcome) => {
                self.send_to(session_id, ServerMessage::LeftMatch);
                self.outboxes.remove(&session_id);
                self.after_release(outcome);
            }
            Err(e) => self.send_to(
                session_id,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            ),
        }
    }

    fn disconnect(&mut self, session_id: Uuid) {
        self.outboxes.remove(&session_id);
        let deadline = Instant::now() + self.timings.reconnect_grace;

        match self.room.disconnect(session_id, deadline) {
            Ok(DisconnectOutcome::AwaitingReconnect { color }) => {
                info!(
                    "Match {}: {} disconnected, holding seat for {:?}",
                    self.room.id, color, self.timings.reconnect_grace
                );
                self.broadcast(ServerMessage::OpponentDisconnected {
                    color,
                    grace_secs: self.timings.reconnect_grace.as_secs(),
                });
                self.schedule(TimerKind::Reconnect(color), self.timings.reconnect_grace);
            }
            Ok(DisconnectOutcome::Removed { empty }) => {
                self.after_release(LeaveOutcome::Removed { empty });
            }
            Err(e) => debug!("Match {}: disconnect of {}: {}", self.room.id, session_id, e),
        }
    }

    fn after_release(&mut self, outcome: LeaveOutcome) {
        match outcome {
            LeaveOutcome::Removed { empty: true } => self.dispose(),
            LeaveOutcome::Removed { empty: false } => {
                if self.room.status == MatchStatus::Waiting {
                    self.notify_lobby(MatchStatus::Waiting);
                }
                self.broadcast_snapshot();
            }
            LeaveOutcome::Forfeited { winner } => {
                info!("Match {}: forfeited, {} wins", self.room.id, winner);
                self.broadcast_snapshot();
                self.check_conclusion();
            }
        }
    }

    fn fire_timer(&mut self, kind: TimerKind, generation: u64) {
        let current = self.timers.get(&kind).map(|(g, _)| *g);
        if current != Some(generation) {
            debug!("Match {}: stale {:?} timer ignored", self.room.id, kind);
            return;
        }
        self.timers.remove(&kind);

        match kind {
            TimerKind::Reconnect(color) => {
                if let Some(outcome) = self.room.expire_reconnect(color) {
                    info!("Match {}: {} did not return in time", self.room.id, color);
                    self.after_release(outcome);
                }
            }
            TimerKind::AutoEndTurn => {
                if self.room.auto_end_turn().is_some() {
                    self.broadcast_snapshot();
                }
            }
            TimerKind::Teardown => self.dispose(),
        }
    }

    /// Report a finished match exactly once.
    fn check_conclusion(&mut self) {
        let Some(conclusion) = self.room.take_conclusion() else {
            return;
        };

        info!(
            "Match {}: {} wins ({:?})",
            self.room.id, conclusion.winner, conclusion.reason
        );
        self.cancel(TimerKind::AutoEndTurn);
        for color in Color::ALL {
            self.cancel(TimerKind::Reconnect(color));
        }

        self.broadcast(ServerMessage::MatchConcluded {
            winner: conclusion.winner,
            reason: conclusion.reason,
        });

        for (player_id, won) in [(conclusion.winner_id, true), (conclusion.loser_id, false)] {
            if player_id.is_empty() {
                continue;
            }
            let stats = Arc::clone(&self.collaborators.stats);
            let match_id = self.room.id;
            tokio::spawn(async move {
                if let Err(e) = stats.record_result(&player_id, won).await {
                    error!("Match {}: failed to record result for {}: {}", match_id, player_id, e);
                }
            });
        }

        self.notify_lobby(MatchStatus::Finished);
        self.schedule(TimerKind::Teardown, self.timings.teardown);
    }

    fn dispose(&mut self) {
        for (_, (_, handle)) in self.timers.drain() {
            handle.abort();
        }
        self.room.status = MatchStatus::Closed;
        self.registry.remove(&self.room.id);
        let match_id = self.room.id;
        for session_id in self.outboxes.keys() {
            self.bindings.remove_if(session_id, |_, bound| *bound == match_id);
        }
        self.notify_lobby(MatchStatus::Closed);
        self.disposed = true;
        info!("Match {} closed", self.room.id);
    }

    fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        self.cancel(kind);
        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.commands.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(MatchCommand::Timer { kind, generation });
        });
        self.timers.insert(kind, (generation, handle));
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some((_, handle)) = self.timers.remove(&kind) {
            handle.abort();
        }
    }

    fn notify_lobby(&self, status: MatchStatus) {
        let _ = self.lobby.send(status);
    }

    fn send_to(&self, session_id: Uuid, msg: ServerMessage) {
        if let Some(outbox) = self.outboxes.get(&session_id) {
            let _ = outbox.send(msg);
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for outbox in self.outboxes.values() {
            let _ = outbox.send(msg.clone());
        }
    }

    fn broadcast_except(&self, except: Uuid, msg: ServerMessage) {
        for (session_id, outbox) in &self.outboxes {
            if *session_id != except {
                let _ = outbox.send(msg.clone());
            }
        }
    }

    fn broadcast_snapshot(&self) {
        self.broadcast(ServerMessage::StateSnapshot {
            state: self.room.game.snapshot(),
        });
    }
}
