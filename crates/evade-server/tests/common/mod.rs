use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use evade_core::geometry::Position;
use evade_core::net::messages::{ClientMessage, ServerMessage};
use evade_core::net::protocol::{decode_server_message, encode_client_message};
use evade_core::tick::GameResults;
use evade_core::views::PlayerState;

use evade_server::config::{GameConfig, ServerConfig, TeamsConfig, TimingConfig};
use evade_server::state::AppState;
use evade_server::{build_app, load_maps, runner};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _server: tokio::task::JoinHandle<()>,
    _runner: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// One match on `open-yard` with a fixed seed, open registration.
    pub async fn new() -> Self {
        Self::from_config(test_config(7, 5)).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let maps = load_maps(&config).unwrap();
        let (app, state) = build_app(config);

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let runner_state = state.clone();
        let runner = tokio::spawn(async move {
            let _ = runner::run(runner_state, maps).await;
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _server: server,
            _runner: runner,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Short ticks, no inter-tick delay, single match.
pub fn test_config(seed: u64, tick_limit: u32) -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        keep_alive: false,
        game: GameConfig {
            random_seed: Some(seed),
            tick_limit: Some(tick_limit),
            map_name: Some("open-yard".to_string()),
            ..GameConfig::default()
        },
        timing: TimingConfig {
            time_per_tick_ms: 500,
            delay_between_ticks_ms: 0,
            game_start_timeout_ms: 10_000,
        },
        ..ServerConfig::default()
    }
}

/// Same as [`test_config`] but only the given tokens may register.
pub fn config_with_tokens(tokens: &[(&str, &str, &str)]) -> ServerConfig {
    let mut names_by_token = HashMap::new();
    let mut ids_by_token = HashMap::new();
    for (token, name, id) in tokens {
        names_by_token.insert(token.to_string(), name.to_string());
        ids_by_token.insert(token.to_string(), id.to_string());
    }
    ServerConfig {
        teams: TeamsConfig {
            expected: 1,
            names_by_token,
            ids_by_token,
        },
        ..test_config(7, 5)
    }
}

pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Text(encoded.into())).await.unwrap();
}

/// Send a raw text frame, for payloads the typed messages cannot express.
pub async fn ws_send_raw(stream: &mut WsStream, data: &str) {
    stream.send(Message::Text(data.to_string().into())).await.unwrap();
}

/// Read the next server message, `None` once the server closed (5s timeout).
pub async fn ws_try_read_server_msg(stream: &mut WsStream) -> Option<ServerMessage> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(data))) => {
                    return Some(decode_server_message(data.as_str()).unwrap());
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    ws_try_read_server_msg(stream)
        .await
        .expect("WebSocket closed unexpectedly")
}

/// Register with `token` and return the confirmation.
pub async fn ws_register(stream: &mut WsStream, token: &str) -> ServerMessage {
    ws_send_client_msg(
        stream,
        &ClientMessage::Register {
            token: token.to_string(),
        },
    )
    .await;
    ws_read_server_msg(stream).await
}

/// Answer a tick view with a list of raw actions.
pub async fn ws_send_actions(stream: &mut WsStream, state: &PlayerState, actions: serde_json::Value) {
    ws_send_client_msg(
        stream,
        &ClientMessage::Command {
            tick: state.tick,
            actions: Some(actions),
        },
    )
    .await;
}

/// What a team saw during one match.
#[derive(Debug)]
pub struct PlayedMatch {
    pub views: Vec<PlayerState>,
    pub results: GameResults,
}

/// Play a whole match, answering every view with `decide(view)`.
pub async fn play_match(
    stream: &mut WsStream,
    mut decide: impl FnMut(&PlayerState) -> serde_json::Value,
) -> PlayedMatch {
    let mut views = Vec::new();
    loop {
        match ws_read_server_msg(stream).await {
            ServerMessage::Tick(state) => {
                let actions = decide(&state);
                ws_send_actions(stream, &state, actions).await;
                views.push(*state);
            },
            ServerMessage::GameResults(results) => return PlayedMatch { views, results },
            other => panic!("Expected TICK or GAME_RESULTS, got: {other:?}"),
        }
    }
}

/// The team's character position in a view.
pub fn character_position(state: &PlayerState) -> Option<Position> {
    state
        .your_character
        .as_ref()
        .map(|c| c.character.position)
}
