//! WebSocket handling

use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use webterm_protocol::{new_id, ClientMessage, ServerMessage};

use crate::session_command::SessionCommand;
use crate::state::AppContext;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Messages that can be sent through the WebSocket
enum OutboundMessage {
    /// JSON-serialized ServerMessage
    Json(ServerMessage),
    /// Raw pong response
    Pong(Bytes),
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<AppContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, ctx: AppContext) {
    let conn_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
    info!(
        component = "websocket",
        event = "ws.connection.opened",
        connection_id = conn_id,
        "WebSocket connection opened"
    );

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Channel for sending messages to this client
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundMessage>(100);

    // Spawn task to forward messages to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let result = match msg {
                OutboundMessage::Json(server_msg) => match serde_json::to_string(&server_msg) {
                    Ok(json) => ws_tx.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!(
                            component = "websocket",
                            event = "ws.send.serialize_failed",
                            connection_id = conn_id,
                            error = %e,
                            "Failed to serialize server message"
                        );
                        continue;
                    }
                },
                OutboundMessage::Pong(data) => ws_tx.send(Message::Pong(data)).await,
            };

            if result.is_err() {
                debug!(
                    component = "websocket",
                    event = "ws.send.disconnected",
                    connection_id = conn_id,
                    "WebSocket send failed, client disconnected"
                );
                break;
            }
        }
    });

    // Bridge hub deliveries (targeted events + metrics broadcasts) into
    // this connection's outbound channel.
    let (hub_tx, mut hub_rx) = mpsc::channel::<ServerMessage>(100);
    ctx.hub.register_connection(conn_id, hub_tx);
    {
        let outbound_tx = outbound_tx.clone();
        tokio::spawn(async move {
            while let Some(msg) = hub_rx.recv().await {
                if outbound_tx.send(OutboundMessage::Json(msg)).await.is_err() {
                    break;
                }
            }
        });
    }

    // Fresh clients get the latest metrics immediately rather than
    // waiting out the first tick.
    let snapshot = ctx.metrics.latest();
    let _ = outbound_tx
        .send(OutboundMessage::Json(ServerMessage::SystemInfo {
            cpu: snapshot.cpu(),
            memory: snapshot.memory(),
            process_count: snapshot.process_count,
        }))
        .await;

    // Handle incoming messages
    while let Some(result) = ws_rx.next().await {
        let msg = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Ping(data)) => {
                let _ = outbound_tx.send(OutboundMessage::Pong(data)).await;
                continue;
            }
            Ok(Message::Close(_)) => {
                info!(
                    component = "websocket",
                    event = "ws.connection.close_frame",
                    connection_id = conn_id,
                    "Client sent close frame"
                );
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(
                    component = "websocket",
                    event = "ws.connection.error",
                    connection_id = conn_id,
                    error = %e,
                    "WebSocket error"
                );
                break;
            }
        };

        // Parse client message
        let client_msg: ClientMessage = match serde_json::from_str(&msg) {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    component = "websocket",
                    event = "ws.message.parse_failed",
                    connection_id = conn_id,
                    error = %e,
                    payload_bytes = msg.len(),
                    "Failed to parse client message"
                );
                let _ = outbound_tx
                    .send(OutboundMessage::Json(ServerMessage::Error {
                        code: "parse_error".into(),
                        message: e.to_string(),
                        tab_id: None,
                    }))
                    .await;
                continue;
            }
        };

        handle_client_message(client_msg, &ctx, conn_id).await;
    }

    // Connection gone: release its tabs and start their linger windows.
    let owned = ctx.hub.unregister_connection(conn_id);
    for tab_id in owned {
        ctx.sessions.schedule_teardown(tab_id);
    }

    info!(
        component = "websocket",
        event = "ws.connection.closed",
        connection_id = conn_id,
        "WebSocket connection closed"
    );
    send_task.abort();
}

/// Handle a client message
async fn handle_client_message(msg: ClientMessage, ctx: &AppContext, conn_id: u64) {
    debug!(
        component = "websocket",
        event = "ws.message.received",
        connection_id = conn_id,
        message = ?msg,
        "Received client message"
    );

    match msg {
        ClientMessage::Command { command, tab_id } => {
            let (actor, generated) = claim_tab(ctx, conn_id, tab_id);
            if generated {
                actor.send(SessionCommand::Announce).await;
            }
            actor.send(SessionCommand::Execute { raw: command }).await;
        }

        ClientMessage::Autocomplete { command, tab_id } => {
            let (actor, _) = claim_tab(ctx, conn_id, tab_id);
            actor
                .send(SessionCommand::Autocomplete { partial: command })
                .await;
        }

        ClientMessage::GetHistory { tab_id } => {
            let (actor, _) = claim_tab(ctx, conn_id, tab_id);
            actor.send(SessionCommand::History).await;
        }

        ClientMessage::NewTab { tab_id } => {
            let (actor, _) = claim_tab(ctx, conn_id, tab_id);
            actor.send(SessionCommand::Announce).await;
        }

        ClientMessage::CloseTab { tab_id } => {
            ctx.hub.release_tab(&tab_id);
            ctx.sessions.remove(&tab_id).await;
        }
    }
}

/// Look up or create the tab's session and record this connection as its
/// owner. An empty tab id gets a server-generated one; the caller
/// announces it back so the client learns the id.
fn claim_tab(
    ctx: &AppContext,
    conn_id: u64,
    tab_id: String,
) -> (crate::session_actor::SessionActorHandle, bool) {
    let generated = tab_id.trim().is_empty();
    let tab_id = if generated { new_id() } else { tab_id };

    ctx.hub.claim_tab(&tab_id, conn_id);
    (ctx.sessions.get_or_create(&tab_id), generated)
}
