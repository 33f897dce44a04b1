//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It drives the connection's `VoiceSession` and forwards the user's fired
//! reminders while the socket is open.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, VoiceSession},
    voice_task::{process_audio, process_transcript, CommandReply},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use bloomie_core::ports::{PortError, PortResult};
use futures::{stream::{SplitSink, StreamExt}, SinkExt};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New WebSocket connection established for user: {}", user_id);

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    if !send_message(&ws_sender, &ServerMessage::Connected { user_id }).await {
        return;
    }

    // --- 1. Reminder forwarding ---
    let forwarder_token = CancellationToken::new();
    let forwarder = {
        let app_state = app_state.clone();
        let ws_sender = ws_sender.clone();
        let token = forwarder_token.clone();
        tokio::spawn(async move { forward_notifications(app_state, user_id, ws_sender, token).await })
    };

    // --- 2. Main Message Loop ---
    let mut session = VoiceSession::new();
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_text_message(text.as_str(), &app_state, user_id, &mut session, &ws_sender).await;
            }
            Ok(Message::Binary(data)) => {
                session.push(&data);
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    session.discard();
    forwarder_token.cancel();
    if let Err(e) = forwarder.await {
        error!("Notification forwarder ended abnormally: {:?}", e);
    }
    info!("WebSocket connection closed for user: {}", user_id);
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    user_id: Uuid,
    session: &mut VoiceSession,
    ws_sender: &WsSender,
) {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            send_message(ws_sender, &ServerMessage::Error { message: "Unrecognized message.".to_string() }).await;
            return;
        }
    };

    match client_msg {
        ClientMessage::RecordingStarted => {
            session.acquire();
            send_message(ws_sender, &ServerMessage::Listening).await;
        }
        ClientMessage::RecordingCancelled => {
            info!("Recording cancelled by the client.");
            session.discard();
        }
        ClientMessage::RecordingEnded => {
            let Some(audio) = session.release() else {
                warn!("RecordingEnded received without an active recording.");
                return;
            };
            send_message(ws_sender, &ServerMessage::Processing).await;
            let result = process_audio(app_state, user_id, &audio).await;
            deliver(app_state, ws_sender, result).await;
        }
        ClientMessage::Command { transcript } => {
            send_message(ws_sender, &ServerMessage::Processing).await;
            let result = process_transcript(app_state, user_id, &transcript).await;
            deliver(app_state, ws_sender, result).await;
        }
    }
}

/// Sends the reply as JSON, then the spoken version as binary audio.
async fn deliver(app_state: &AppState, ws_sender: &WsSender, result: PortResult<CommandReply>) {
    let reply = match result {
        Ok(reply) => reply,
        Err(e) => {
            error!("Voice command failed: {}", e);
            let message = match e {
                PortError::InvalidInput(msg) => msg,
                PortError::NotFound(_) => "I couldn't find that.".to_string(),
                _ => "Something went wrong handling that. Please try again.".to_string(),
            };
            send_message(ws_sender, &ServerMessage::Error { message }).await;
            return;
        }
    };

    let spoken = reply.reply.clone();
    if !send_message(ws_sender, &ServerMessage::CommandHandled { reply }).await {
        return;
    }
    match app_state.tts.synthesize(&spoken, &app_state.voice_params).await {
        Ok(audio) => {
            if ws_sender.lock().await.send(Message::Binary(audio.into())).await.is_err() {
                error!("Failed to send reply audio.");
            }
        }
        Err(e) => warn!("Failed to synthesize reply audio: {}", e),
    }
}

async fn forward_notifications(
    app_state: Arc<AppState>,
    user_id: Uuid,
    ws_sender: WsSender,
    token: CancellationToken,
) {
    let mut notifications = app_state.notifications.subscribe();
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            received = notifications.recv() => match received {
                Ok(notification) if notification.payload.user_id == user_id => {
                    if !send_message(&ws_sender, &ServerMessage::Notification { notification }).await {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!("Notification forwarder lagged by {} messages", n),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

/// Serializes and sends a message. Returns `false` once the socket is gone.
async fn send_message(ws_sender: &WsSender, msg: &ServerMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    if ws_sender.lock().await.send(Message::Text(json.into())).await.is_err() {
        warn!("Failed to send message, client is gone.");
        return false;
    }
    true
}
