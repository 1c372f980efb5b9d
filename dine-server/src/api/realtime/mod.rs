//! 实时推送 WebSocket
//!
//! GET /api/realtime/ws?token=<JWT>
//! Auth: JWT 通过 query parameter 传递（浏览器 WebSocket 不支持自定义 headers）
//!
//! 协议:
//! - Server → Client: [`RealtimeMessage`] JSON 文本帧；首帧为 `connected`，携带本连接 ID
//! - Client → Server: 无业务消息，仅处理 Close / Pong
//!
//! 员工连接加入 managers 频道，访客 / 会员加入自己的 actor 频道。

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::message::{RealtimeEvent, RealtimeMessage};
use tokio::time::Duration;

use crate::api::AppError;
use crate::auth::{CurrentUser, authenticate};
use crate::core::ServerState;
use crate::hub::HubFrame;

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/realtime/ws", get(handle_ws))
}

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

/// GET /api/realtime/ws?token=<JWT>
pub async fn handle_ws(
    State(state): State<ServerState>,
    Query(query): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state, &query.token).inspect_err(|e| {
        tracing::debug!("Realtime WS auth failed: {e}");
    })?;

    Ok(ws.on_upgrade(move |socket| ws_session(socket, state, user)))
}

async fn ws_session(socket: WebSocket, state: ServerState, user: CurrentUser) {
    let (mut sink, mut stream) = socket.split();
    let (handle, mut hub_rx) = state.hub.register(user.id, user.role);

    tracing::info!(
        conn_id = %handle.conn_id,
        actor_id = user.id,
        role = user.role.as_str(),
        "Realtime WS connected"
    );

    let connected = RealtimeMessage::from_payload(
        RealtimeEvent::Connected,
        &serde_json::json!({ "connectionId": handle.conn_id }),
    );
    if send_message(&mut sink, &connected).await.is_ok() {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        ping_interval.tick().await; // skip immediate

        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    if sink.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }

                frame = hub_rx.recv() => {
                    match frame {
                        Some(HubFrame::Event(msg)) => {
                            if send_message(&mut sink, &msg).await.is_err() {
                                break;
                            }
                        }
                        Some(HubFrame::Close) | None => {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }

                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        _ => {}
                    }
                }
            }
        }
    }

    state.hub.deregister(&handle.conn_id);
    tracing::info!(conn_id = %handle.conn_id, actor_id = user.id, "Realtime WS disconnected");
}

async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &RealtimeMessage,
) -> Result<(), axum::Error> {
    sink.send(Message::Text(msg.to_json().into())).await
}
