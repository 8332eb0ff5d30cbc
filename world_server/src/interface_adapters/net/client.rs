use crate::domain::PlayerId;
use crate::interface_adapters::protocol::{
    ActionResultDto, CheckResultDto, ClientMessage, LoginResultDto, MoveDto, ServerMessage,
    WorldUpdateDto,
};
use crate::interface_adapters::state::{AppState, MapBytes};
use crate::interface_adapters::store::InMemoryPlayerStore;
use crate::interface_adapters::utils::ids::next_conn_id;
use crate::use_cases::{CheckOutcome, SessionError, SessionService, SpawnOutcome, WorldUpdate};

use axum::{
    Error,
    extract::{
        ConnectInfo, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, watch};
use tokio::time::timeout_at;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

type Sessions = SessionService<InMemoryPlayerStore>;

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    WorldUnavailable,
    WorldUpdatesClosed,
    LoginRequired,
    LoginTimeout,
    ClosedBeforeLogin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<MapBytes>,
    world_latest_tx: watch::Sender<BTreeMap<Arc<str>, Utf8Bytes>>,
) {
    // Serialize each map update once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let map = update.map.clone();
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, %map, "failed to serialize world update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes per map for lag recovery.
                world_latest_tx.send_modify(|latest| {
                    latest.insert(map.clone(), bytes.clone());
                });
                let _ = world_bytes_tx.send(MapBytes { map, bytes });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        // Separate connection id for correlating logs before/after a player_id exists.
        let conn_id = next_conn_id();
        let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
        handle_socket(socket, state, addr).instrument(span)
    })
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, addr: SocketAddr) {
    let mut ctx = match bootstrap_connection(&mut socket, &state, addr).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeLogin) => {
            info!("client disconnected before login");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            return;
        }
    };

    Span::current().record("player_id", ctx.player_id);
    info!(
        player_id = ctx.player_id,
        name = %ctx.name,
        map = %ctx.map,
        %addr,
        "player logged in"
    );

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: PlayerId,
    pub name: String,
    // Map this player is on; only its updates are forwarded.
    pub map: Arc<str>,
    pub sessions: Sessions,
    pub world_bytes_rx: broadcast::Receiver<MapBytes>,
    pub world_latest_rx: watch::Receiver<BTreeMap<Arc<str>, Utf8Bytes>>,
    // Set once an explicit logoff has persisted the player.
    pub logged_off: bool,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_move_full_log: Instant,
    pub last_world_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct LoginHandshake {
    player_id: PlayerId,
    name: String,
    map: Arc<str>,
    bytes_in: u64,
    msgs_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    addr: SocketAddr,
) -> Result<ConnCtx, NetError> {
    // Subscribe before logging in so the first tick after the spawn is not missed.
    let world_bytes_rx = state.world_bytes_tx.subscribe();
    let world_latest_rx = state.world_latest_tx.subscribe();

    let deadline = tokio::time::Instant::now() + LOGIN_TIMEOUT;
    let login = read_login_handshake(socket, &state.sessions, addr, deadline).await?;

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id: login.player_id,
        name: login.name,
        map: login.map,
        sessions: state.sessions.clone(),
        world_bytes_rx,
        world_latest_rx,
        logged_off: false,
        lag_recovery_count: 0,

        msgs_in: login.msgs_in,
        msgs_out: 0,
        bytes_in: login.bytes_in,
        bytes_out: 0,

        invalid_json: 0,

        last_move_full_log: now,
        last_world_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_CREDENTIAL_LEN: usize = 64;
const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

fn valid_credential(value: &str) -> bool {
    !value.trim().is_empty() && value.len() <= MAX_CREDENTIAL_LEN
}

// Account checks and the login request. Only a name that passed a check on this
// connection may log in. `deadline` bounds the socket reads only, never an in-flight login.
async fn read_login_handshake(
    socket: &mut WebSocket,
    sessions: &Sessions,
    addr: SocketAddr,
    deadline: tokio::time::Instant,
) -> Result<LoginHandshake, NetError> {
    let mut checked: Option<String> = None;
    let mut bytes_in = 0u64;
    let mut msgs_in = 0u64;
    let mut invalid_json = 0u32;

    loop {
        let incoming = match timeout_at(deadline, socket.recv()).await {
            Ok(Some(incoming)) => incoming,
            Ok(None) => return Err(NetError::ClosedBeforeLogin),
            Err(_) => {
                let _ = send_close_with_reason(socket, close_code::POLICY, "login timeout").await;
                return Err(NetError::LoginTimeout);
            }
        };

        let message = incoming.map_err(NetError::Ws)?;
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::LoginRequired);
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => return Err(NetError::ClosedBeforeLogin),
        };
        bytes_in += text.len() as u64;
        msgs_in += 1;

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::CheckPlayer { user, pass }) => {
                let result = if valid_credential(&user) && valid_credential(&pass) {
                    match sessions.check_player(&user, &pass).await {
                        Ok(outcome) => outcome,
                        Err(SessionError::WorldUnavailable) => {
                            let _ = send_close_with_reason(
                                socket,
                                close_code::ERROR,
                                "world unavailable",
                            )
                            .await;
                            return Err(NetError::WorldUnavailable);
                        }
                        Err(e) => {
                            warn!(user = %user, error = %e, "account check failed");
                            CheckOutcome::Bad
                        }
                    }
                } else {
                    CheckOutcome::Bad
                };

                checked = (result == CheckOutcome::Good).then(|| user.clone());
                debug!(user = %user, ?result, "account checked");
                send_message(
                    socket,
                    &ServerMessage::CheckPlayer {
                        result: CheckResultDto::from(result),
                    },
                )
                .await?;
            }
            Ok(ClientMessage::Login { user }) => {
                if checked.as_deref() != Some(user.as_str()) {
                    send_message(socket, &ServerMessage::Login(LoginResultDto::rejected()))
                        .await?;
                    continue;
                }

                let outcome = match sessions.login(&user, addr).await {
                    Ok(outcome) => outcome,
                    Err(SessionError::WorldUnavailable) => {
                        let _ =
                            send_close_with_reason(socket, close_code::ERROR, "world unavailable")
                                .await;
                        return Err(NetError::WorldUnavailable);
                    }
                    Err(e) => {
                        warn!(user = %user, error = %e, "login failed");
                        send_message(socket, &ServerMessage::Login(LoginResultDto::rejected()))
                            .await?;
                        continue;
                    }
                };

                let sent =
                    send_message(socket, &ServerMessage::Login(LoginResultDto::from(&outcome)))
                        .await;
                if let Err(e) = sent {
                    if matches!(outcome, SpawnOutcome::Accepted { .. }) {
                        release_unclaimed_spawn(sessions, &user).await;
                    }
                    return Err(e);
                }
                match outcome {
                    SpawnOutcome::Accepted { player_id, map, .. } => {
                        return Ok(LoginHandshake {
                            player_id,
                            name: user,
                            map: Arc::from(map),
                            bytes_in,
                            msgs_in,
                        });
                    }
                    SpawnOutcome::AlreadyOnline => {
                        info!(user = %user, "login rejected; already online");
                        checked = None;
                    }
                }
            }
            Ok(ClientMessage::Logoff) => {
                let _ = send_close_with_reason(socket, close_code::NORMAL, "logged off").await;
                return Err(NetError::ClosedBeforeLogin);
            }
            Ok(ClientMessage::Move(_)) | Ok(ClientMessage::Actions { .. }) => {
                let _ = send_close_with_reason(socket, close_code::POLICY, "login required").await;
                return Err(NetError::LoginRequired);
            }
            Err(e) => {
                invalid_json += 1;
                debug!(bytes = text.len(), error = %e, "invalid message before login");
                if invalid_json > MAX_INVALID_JSON {
                    let _ = send_close_with_reason(
                        socket,
                        close_code::POLICY,
                        "too many invalid messages",
                    )
                    .await;
                    return Err(NetError::LoginRequired);
                }
            }
        }
    }
}

// The spawn is already applied but no client loop will ever own it.
async fn release_unclaimed_spawn(sessions: &Sessions, name: &str) {
    match sessions.logoff(name).await {
        Ok(removed) => info!(name, removed, "released spawn after failed login reply"),
        Err(e) => warn!(name, error = %e, "failed to release spawn after login reply"),
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn process_move_message(ctx: &mut ConnCtx, step: MoveDto) -> Result<LoopControl, NetError> {
    match ctx.sessions.try_move(ctx.player_id, step.x_speed, step.y_speed) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(SessionError::QueueFull) => {
            if should_log(&mut ctx.last_move_full_log) {
                warn!(player_id = ctx.player_id, "command channel full; dropping move");
            }
            Ok(LoopControl::Continue)
        }
        Err(_) => Err(NetError::WorldUnavailable),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing World Update
            world_msg = ctx.world_bytes_rx.recv() => {
                match world_msg {
                    Ok(MapBytes { map, bytes }) => {
                        if map != ctx.map {
                            false
                        } else {
                            match forward_world_bytes(bytes, socket, ctx).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest snapshot of this map.
                        let latest = ctx.world_latest_rx.borrow().get(&ctx.map).cloned();
                        match latest {
                            None => {
                                if should_log(&mut ctx.last_world_lag_log) {
                                    warn!(map = %ctx.map, "world snapshot unavailable during lag recovery");
                                }
                                false
                            }
                            Some(latest) => {
                                let bytes_len = latest.len();
                                ctx.lag_recovery_count += 1;
                                let outcome = forward_world_bytes(latest, socket, ctx).await;

                                if should_log(&mut ctx.last_world_lag_log) {
                                    debug!(
                                        player_id,
                                        bytes = bytes_len,
                                        count = ctx.lag_recovery_count,
                                        "sent lag recovery snapshot"
                                    );
                                }

                                match outcome {
                                    LoopControl::Continue => false,
                                    LoopControl::Disconnect => true,
                                }
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    disconnect_cleanup(ctx).await;

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Move(step)) => process_move_message(ctx, step),
                    Ok(ClientMessage::Actions { actions }) => {
                        let results = match ctx.sessions.action_batch(&ctx.name, actions).await {
                            Ok(results) => results,
                            Err(_) => return Err(NetError::WorldUnavailable),
                        };
                        let msg = ServerMessage::ActionResults {
                            results: results.iter().map(ActionResultDto::from).collect(),
                        };
                        reply(socket, ctx, &msg).await
                    }
                    Ok(ClientMessage::Logoff) => {
                        let saved = match ctx.sessions.logoff(&ctx.name).await {
                            Ok(was_online) => was_online,
                            Err(e) => {
                                warn!(player_id, error = %e, "logoff failed");
                                false
                            }
                        };
                        ctx.logged_off = true;
                        let _ = reply(socket, ctx, &ServerMessage::LoggedOff { saved }).await;
                        ctx.close_frame = Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: "logged off".into(),
                        });
                        Ok(LoopControl::Disconnect)
                    }
                    Ok(ClientMessage::CheckPlayer { .. }) | Ok(ClientMessage::Login { .. }) => {
                        // One character per connection; a repeated login keeps the session.
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(player_id, "login message after login ignored");
                        }
                        let msg = ServerMessage::Error {
                            message: "already logged in".to_string(),
                        };
                        reply(socket, ctx, &msg).await
                    }
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn reply(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    msg: &ServerMessage,
) -> Result<LoopControl, NetError> {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            Ok(LoopControl::Continue)
        }
        Err(err) => {
            warn!(error = ?err, "failed to send reply");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &mut ConnCtx) {
    // A dropped connection counts as a logoff so the character is saved and leaves the world.
    if !ctx.logged_off {
        match ctx.sessions.logoff(&ctx.name).await {
            Ok(true) => debug!(player_id = ctx.player_id, "player removed after disconnect"),
            Ok(false) => debug!(player_id = ctx.player_id, "player already gone"),
            Err(e) => warn!(player_id = ctx.player_id, error = %e, "disconnect logoff failed"),
        }
    }

    info!(
        player_id = ctx.player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        lag_recovery = ctx.lag_recovery_count,
        "client disconnected"
    );
}
