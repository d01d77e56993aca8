use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::FromRequest;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot};

use evade_core::action::Command;
use evade_core::net::messages::{ClientMessage, ServerMessage};
use evade_core::net::protocol::{decode_client_message, encode_server_message};
use evade_core::team::{Team, TeamId};

use crate::channel::TeamEvent;
use crate::error::AppError;
use crate::state::{AppState, ConnectionGuard};

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, AppError> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(AppError::Unavailable("too many connections".to_string()));
    }

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The first message decides the role: team or spectator.
    let Some(first_msg) = next_text(&mut ws_receiver).await else {
        return;
    };

    match decode_client_message(&first_msg) {
        Ok(ClientMessage::Register { token }) => {
            handle_team(ws_sender, ws_receiver, &state, &token).await;
        },
        Ok(ClientMessage::Viewer) => {
            handle_viewer(ws_sender, ws_receiver, &state).await;
        },
        Ok(ClientMessage::Command { .. }) => {
            send_error(&mut ws_sender, "REGISTER or VIEWER expected first").await;
        },
        Err(e) => {
            tracing::debug!(error = %e, "Undecodable first message");
            send_error(&mut ws_sender, &e.to_string()).await;
        },
    }
}

async fn handle_team(
    mut ws_sender: WsSender,
    mut ws_receiver: WsReceiver,
    state: &AppState,
    token: &str,
) {
    let Some((name, external_id)) = state.config.teams.resolve(token) else {
        tracing::warn!("Registration with unknown token rejected");
        send_error(&mut ws_sender, "unknown team token").await;
        let _ = ws_sender.send(Message::Close(None)).await;
        return;
    };

    let team = Team::new(state.hub.allocate_team_id(), name, external_id);
    let team_id = team.id.clone();
    let registered = ServerMessage::Registered {
        team_id: team.id.clone(),
        team_name: team.external_name.clone(),
    };
    tracing::info!(team_id = %team_id, team_name = %team.external_name, "Team connected");

    let mut events = state
        .hub
        .register(team, state.config.limits.team_message_buffer)
        .await;

    if send(&mut ws_sender, &registered).await.is_ok() {
        team_loop(&mut ws_sender, &mut ws_receiver, &mut events, &team_id).await;
    }

    state.hub.disconnect(&team_id).await;
    tracing::info!(team_id = %team_id, "Team disconnected");
}

/// Relay prompts to the socket and answers back to the engine until the
/// match ends or either side goes away.
async fn team_loop(
    ws_sender: &mut WsSender,
    ws_receiver: &mut WsReceiver,
    events: &mut mpsc::Receiver<TeamEvent>,
    team_id: &TeamId,
) {
    // View tick of the outstanding prompt, and where its answer goes.
    let mut pending: Option<(u32, oneshot::Sender<Command>)> = None;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(TeamEvent::Prompt(prompt)) => {
                    let view_tick = prompt.state.tick;
                    tracing::trace!(team_id = %team_id, tick = prompt.tick, "Prompting team");
                    if send(ws_sender, &ServerMessage::Tick(prompt.state)).await.is_err() {
                        break;
                    }
                    pending = Some((view_tick, prompt.reply));
                },
                Some(TeamEvent::Results(results)) => {
                    let _ = send(ws_sender, &ServerMessage::GameResults(results)).await;
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                },
                None => break,
            },
            incoming = ws_receiver.next() => {
                let data = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let msg = match decode_client_message(data.as_str()) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::warn!(team_id = %team_id, error = %e, "Invalid team message");
                        continue;
                    },
                };
                let Some((tick, command)) = msg.into_command() else {
                    tracing::warn!(team_id = %team_id, "Unexpected message after registration");
                    continue;
                };
                match pending.take() {
                    Some((expected, reply)) if expected == tick => {
                        if reply.send(command).is_err() {
                            tracing::debug!(team_id = %team_id, tick, "Command arrived after the deadline");
                        }
                    },
                    Some(outstanding) => {
                        tracing::warn!(
                            team_id = %team_id,
                            tick,
                            expected = outstanding.0,
                            "Command for the wrong tick dropped"
                        );
                        pending = Some(outstanding);
                    },
                    None => {
                        tracing::debug!(team_id = %team_id, tick, "Command with no tick pending dropped");
                    },
                }
            },
        }
    }
}

async fn handle_viewer(ws_sender: WsSender, mut ws_receiver: WsReceiver, state: &AppState) {
    let rx = state.spectators.subscribe();
    tracing::info!("Spectator connected");
    let writer = spawn_viewer_writer(ws_sender, rx);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }

    writer.abort();
    tracing::info!("Spectator disconnected");
}

fn spawn_viewer_writer(
    mut ws_sender: WsSender,
    mut rx: broadcast::Receiver<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(data) => {
                    if ws_sender.send(Message::Text(data.into())).await.is_err() {
                        break;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Spectator lagged by {n} ticks");
                },
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Next text frame, skipping control frames. `None` once the peer is gone.
async fn next_text(ws_receiver: &mut WsReceiver) -> Option<String> {
    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => return Some(text.as_str().to_owned()),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
    None
}

async fn send(ws_sender: &mut WsSender, msg: &ServerMessage) -> Result<(), axum::Error> {
    match encode_server_message(msg) {
        Ok(data) => ws_sender.send(Message::Text(data.into())).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode server message");
            Ok(())
        },
    }
}

async fn send_error(ws_sender: &mut WsSender, message: &str) {
    let msg = ServerMessage::Error {
        message: message.to_string(),
    };
    if let Err(e) = send(ws_sender, &msg).await {
        tracing::debug!(error = %e, "Failed to send error message");
    }
}
