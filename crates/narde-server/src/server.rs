//! WebSocket server and connection handling.

use crate::actor::{
    spawn_match, MatchCommand, MatchContext, MatchRegistry, Outbox, SessionBindings,
};
use crate::collaborators::Collaborators;
use crate::config::MatchTimings;
use crate::protocol::{ClientMessage, MatchInfo, ServerMessage};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All live matches
    pub matches: MatchRegistry,
    /// Mapping from session ID to the match it is seated in
    pub session_matches: SessionBindings,
    /// Mapping from session ID to its message sender
    pub session_senders: DashMap<Uuid, Outbox>,
    pub collaborators: Collaborators,
    pub timings: MatchTimings,
}

impl ServerState {
    pub fn new(collaborators: Collaborators, timings: MatchTimings) -> Self {
        Self {
            matches: Arc::new(DashMap::new()),
            session_matches: Arc::new(DashMap::new()),
            session_senders: DashMap::new(),
            collaborators,
            timings,
        }
    }

    /// Send a message to a specific session.
    pub fn send_to_session(&self, session_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.session_senders.get(&session_id) {
            let _ = sender.send(msg);
        }
    }

    fn send_error(&self, session_id: Uuid, message: &str) {
        self.send_to_session(
            session_id,
            ServerMessage::Error {
                message: message.to_string(),
            },
        );
    }

    fn match_context(&self) -> MatchContext {
        MatchContext {
            timings: self.timings,
            collaborators: self.collaborators.clone(),
            registry: Arc::clone(&self.matches),
            bindings: Arc::clone(&self.session_matches),
        }
    }

    /// Forward a command to the session's match.
    fn forward(&self, session_id: Uuid, cmd: MatchCommand) {
        let Some(match_id) = self.session_matches.get(&session_id).map(|m| *m) else {
            self.send_error(session_id, "Not in a match");
            return;
        };

        let delivered = self
            .matches
            .get(&match_id)
            .map(|handle| handle.send(cmd))
            .unwrap_or(false);
        if !delivered {
            self.session_matches.remove(&session_id);
            self.send_error(session_id, "Match not found");
        }
    }

    /// Get all live matches.
    pub async fn list_matches(&self) -> Vec<MatchInfo> {
        let handles: Vec<_> = self.matches.iter().map(|h| h.value().clone()).collect();
        let mut matches = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Some(info) = handle.info().await {
                matches.push(info);
            }
        }
        matches
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Narde server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let session_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.session_senders.insert(session_id, tx);

    let welcome = ServerMessage::Welcome { session_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                    handle_message(session_id, client_msg, &state).await;
                } else {
                    warn!("Invalid message from {}: {}", session_id, text);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", session_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_session(session_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", session_id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(session_id, &state);
    state.session_senders.remove(&session_id);
    send_task.abort();

    info!("Connection closed for {}", session_id);
    Ok(())
}

/// Handle a client message.
async fn handle_message(session_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateMatch => {
            let handle = spawn_match(Uuid::new_v4(), state.match_context());
            state.send_to_session(
                session_id,
                ServerMessage::MatchCreated {
                    match_id: handle.id,
                },
            );
        }

        ClientMessage::Join {
            match_id,
            token,
            color_hint,
        } => {
            if let Some(bound) = state.session_matches.get(&session_id).map(|m| *m) {
                if state.matches.contains_key(&bound) {
                    state.send_error(session_id, "Already in a match");
                    return;
                }
                state.session_matches.remove(&session_id);
            }
            let Some(handle) = state.matches.get(&match_id).map(|h| h.value().clone()) else {
                state.send_error(session_id, "Match not found");
                return;
            };
            let Some(outbox) = state.session_senders.get(&session_id).map(|s| s.value().clone()) else {
                return;
            };

            let (seated, reply) = oneshot::channel();
            let sent = handle.send(MatchCommand::Join {
                session_id,
                token,
                color_hint,
                outbox,
                seated,
            });
            if !sent {
                state.send_error(session_id, "Match not found");
                return;
            }
            if reply.await.unwrap_or(false) {
                state.session_matches.insert(session_id, match_id);
            }
        }

        ClientMessage::Roll => state.forward(session_id, MatchCommand::Roll { session_id }),

        ClientMessage::Move { from, to } => {
            state.forward(session_id, MatchCommand::Move { session_id, from, to })
        }

        ClientMessage::Leave => {
            state.forward(session_id, MatchCommand::Leave { session_id });
            state.session_matches.remove(&session_id);
        }

        ClientMessage::ListMatches => {
            let matches = state.list_matches().await;
            state.send_to_session(session_id, ServerMessage::MatchList { matches });
        }

        ClientMessage::Ping => {
            state.send_to_session(session_id, ServerMessage::Pong);
        }
    }
}

/// Handle session disconnect.
fn handle_disconnect(session_id: Uuid, state: &Arc<ServerState>) {
    if let Some((_, match_id)) = state.session_matches.remove(&session_id) {
        if let Some(handle) = state.matches.get(&match_id) {
            handle.send(MatchCommand::Disconnect { session_id });
        }
    }
}
