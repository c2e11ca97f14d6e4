//! WebSocket upgrade handler and per-connection session wiring

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{GameSession, SessionEffect, SessionInput, Viewport};
use crate::leaderboard::{
    display_rows, empty_placeholder, LeaderboardScope, LeaderboardService, ScoreBackend,
    DEFAULT_LIMIT,
};
use crate::util::rate_limit::SessionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Delay between a submission acknowledgment and the refreshed leaderboard,
/// so the client can show its confirmation first
const POST_SUBMIT_REFRESH_DELAY: Duration = Duration::from_millis(500);

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection: one game session per socket
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        session_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(session_id = %session_id, error = %e, "Failed to send welcome");
        return;
    }

    // The session starts from the configured viewport; the client corrects
    // it with a resize message as soon as it knows better
    let viewport = Viewport::new(state.config.viewport_width, state.config.viewport_height);
    let (session, handle) = GameSession::new(session_id, viewport, rand::random());

    state.sessions.register(handle.id);

    // The simulation and the network effects run as their own tasks; both
    // wind down once the connection drops their channels
    tokio::spawn(session.run());
    tokio::spawn(run_effects(
        handle.effects_rx,
        handle.outbound_tx.clone(),
        state.leaderboard.clone(),
    ));

    let outbound_rx = handle.outbound_tx.subscribe();
    run_connection(session_id, ws_sink, ws_stream, handle.input_tx, outbound_rx).await;

    state.sessions.unregister(&session_id);

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_connection(
    session_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<SessionInput>,
    mut outbound_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = SessionRateLimiter::new();

    // Spawn writer task: session messages -> WebSocket
    let writer_session_id = session_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            match outbound_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(session_id = %writer_session_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        session_id = %writer_session_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session_id = %writer_session_id, "Outbound channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session tick loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(client_msg) => {
                    // Game inputs are limited; leaderboard traffic is not
                    if is_game_input(&client_msg) && !rate_limiter.check_input() {
                        warn!(session_id = %session_id, "Rate limited input message");
                        continue;
                    }

                    let input = SessionInput {
                        msg: client_msg,
                        received_at: unix_millis(),
                    };

                    if input_tx.send(input).await.is_err() {
                        debug!(session_id = %session_id, "Input channel closed");
                        break;
                    }
                }
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(session_id = %session_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(session_id = %session_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Dropping input_tx here ends the session's tick loop
    drop(input_tx);

    // Abort writer task
    writer_handle.abort();
}

/// Simulation-facing messages, subject to the input rate limit
fn is_game_input(msg: &ClientMsg) -> bool {
    matches!(
        msg,
        ClientMsg::MoveLeft
            | ClientMsg::MoveRight
            | ClientMsg::StopMove
            | ClientMsg::Restart
            | ClientMsg::Resize { .. }
            | ClientMsg::Ping { .. }
    )
}

/// Service the session's network effects. Completions land on the outbound
/// channel as ordinary messages; overlapping fetches are allowed and the
/// last one to resolve wins on the display.
async fn run_effects<B>(
    mut effects_rx: mpsc::Receiver<SessionEffect>,
    outbound_tx: broadcast::Sender<ServerMsg>,
    leaderboard: LeaderboardService<B>,
) where
    B: ScoreBackend + Clone + Send + Sync + 'static,
{
    while let Some(effect) = effects_rx.recv().await {
        let leaderboard = leaderboard.clone();
        let outbound_tx = outbound_tx.clone();

        tokio::spawn(async move {
            match effect {
                SessionEffect::FetchLeaderboard { scope } => {
                    send_leaderboard(&leaderboard, scope, &outbound_tx).await;
                }
                SessionEffect::SubmitScore(record) => {
                    match leaderboard.submit_score(&record).await {
                        Ok(()) => {
                            info!(score = record.score, "Score submitted");
                            let _ = outbound_tx.send(ServerMsg::SubmitAccepted);

                            // Let the confirmation land, then refresh the board
                            sleep(POST_SUBMIT_REFRESH_DELAY).await;
                            send_leaderboard(&leaderboard, LeaderboardScope::AllTime, &outbound_tx)
                                .await;
                        }
                        Err(err) => {
                            warn!(error = %err, "Score submission failed");
                            let _ = outbound_tx.send(ServerMsg::SubmitFailed {
                                message:
                                    "There was an error submitting your score. Please try again."
                                        .to_string(),
                            });
                        }
                    }
                }
            }
        });
    }
}

async fn send_leaderboard<B: ScoreBackend>(
    leaderboard: &LeaderboardService<B>,
    scope: LeaderboardScope,
    outbound_tx: &broadcast::Sender<ServerMsg>,
) {
    let entries = leaderboard.fetch_scope(scope, DEFAULT_LIMIT).await;
    let rows = display_rows(&entries);
    let placeholder = empty_placeholder(&rows);
    let _ = outbound_tx.send(ServerMsg::Leaderboard {
        scope,
        rows,
        placeholder,
    });
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
