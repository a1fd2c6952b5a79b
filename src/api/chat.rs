//! Party chat rooms over WebSocket

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::AppState;
use crate::dice::DiceRoll;

/// Upper bound on dice per chat roll
const MAX_CHAT_DICE: u32 = 100;

/// A connected chat participant
#[derive(Debug)]
pub struct ChatSession {
    pub connection_id: String,
    pub room: String,
    pub sender: mpsc::Sender<ServerMessage>,
}

/// All open chat connections, grouped by room
#[derive(Default)]
pub struct ChatRooms {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl ChatRooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session: ChatSession) {
        let connection_id = session.connection_id.clone();
        self.sessions.write().await.insert(connection_id, session);
    }

    pub async fn unregister(&self, connection_id: &str) {
        self.sessions.write().await.remove(connection_id);
    }

    /// Number of connections in a room
    pub async fn occupancy(&self, room: &str) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.room == room)
            .count()
    }

    /// Send a message to one connection
    pub async fn send_to(&self, connection_id: &str, msg: ServerMessage) {
        let sender = self
            .sessions
            .read()
            .await
            .get(connection_id)
            .map(|s| s.sender.clone());
        if let Some(sender) = sender {
            deliver(connection_id, &sender, msg);
        }
    }

    /// Send text to everyone in a room, sender included
    pub async fn broadcast(&self, room: &str, text: String) {
        let senders: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.room == room)
            .map(|s| (s.connection_id.clone(), s.sender.clone()))
            .collect();

        let msg = ServerMessage::Broadcast {
            room: room.to_string(),
            text,
        };
        for (connection_id, sender) in senders {
            deliver(&connection_id, &sender, msg.clone());
        }
    }
}

/// Queue a message without waiting; a full queue drops it
///
/// Connection tasks broadcast into their own queue, so this must never wait.
fn deliver(connection_id: &str, sender: &mpsc::Sender<ServerMessage>, msg: ServerMessage) {
    match sender.try_send(msg) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("Queue full, dropping message for {}", connection_id);
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            warn!("Failed to send message to {}", connection_id);
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Sent once on connect
    #[serde(rename = "welcome")]
    Welcome { connection_id: String },
    /// Room traffic
    #[serde(rename = "broadcast")]
    Broadcast { room: String, text: String },
    /// Error message
    #[serde(rename = "error")]
    Error { message: String },
}

/// Messages sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Chat line, or `/roll <notation>`
    #[serde(rename = "say")]
    Say { text: String },
    /// Ping to keep connection alive
    #[serde(rename = "ping")]
    Ping,
}

/// Handle WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, room, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(mut socket: WebSocket, room: String, state: AppState) {
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);
    let connection_id = uuid::Uuid::new_v4().to_string();

    info!("Chat connected: {} in room {}", connection_id, room);

    let welcome = ServerMessage::Welcome {
        connection_id: connection_id.clone(),
    };
    if let Ok(json) = serde_json::to_string(&welcome) {
        if socket.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    state
        .rooms
        .register(ChatSession {
            connection_id: connection_id.clone(),
            room: room.clone(),
            sender: tx,
        })
        .await;
    state
        .rooms
        .broadcast(&room, format!("{} joined the room.", connection_id))
        .await;

    loop {
        tokio::select! {
            Some(msg) = rx.recv() => {
                if let Ok(json) = serde_json::to_string(&msg) {
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => handle_client_message(&state, &room, &connection_id, msg).await,
                            Err(e) => {
                                state
                                    .rooms
                                    .send_to(&connection_id, ServerMessage::Error {
                                        message: format!("invalid message: {}", e),
                                    })
                                    .await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.rooms.unregister(&connection_id).await;
    state
        .rooms
        .broadcast(&room, format!("{} left the room.", connection_id))
        .await;
    info!("Chat disconnected: {}", connection_id);
}

/// Handle a message from the client
async fn handle_client_message(state: &AppState, room: &str, connection_id: &str, msg: ClientMessage) {
    match msg {
        ClientMessage::Say { text } => {
            debug!("{} in {}: {}", connection_id, room, text);
            match text.strip_prefix("/roll") {
                Some(notation) if notation.is_empty() || notation.starts_with(' ') => {
                    match roll(state, notation) {
                        Ok(result) => {
                            state
                                .rooms
                                .broadcast(room, format!("{} rolls {}", connection_id, result))
                                .await
                        }
                        Err(message) => {
                            state
                                .rooms
                                .send_to(connection_id, ServerMessage::Error { message })
                                .await
                        }
                    }
                }
                _ => {
                    state
                        .rooms
                        .broadcast(room, format!("{} says: {}", connection_id, text))
                        .await
                }
            }
        }
        ClientMessage::Ping => {}
    }
}

/// Roll chat dice notation, returning "2d6+1: [3, 5] = 9"
fn roll(state: &AppState, notation: &str) -> Result<String, String> {
    let dice = notation
        .parse::<DiceRoll>()
        .map_err(|e| e.to_string())?;
    if dice.count > MAX_CHAT_DICE {
        return Err(format!("at most {} dice per roll", MAX_CHAT_DICE));
    }
    let outcome = state.characters.roll(&dice).map_err(|e| e.to_string())?;
    Ok(format!("{}: {:?} = {}", dice, outcome.faces, outcome.total))
}
