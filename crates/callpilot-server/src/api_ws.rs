//! WebSocket transport for live call sessions.

use crate::events::OutboundEvent;
use crate::session::SessionCoordinator;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade},
        ConnectInfo, Extension,
    },
    http::StatusCode,
    response::IntoResponse,
};
use callpilot_graph::Graph;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handler for `GET /ws`. Each connection is one call.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let Some(graph) = state.session_graph.clone() else {
        tracing::warn!(remote_addr = %addr, "rejecting call session: graph not ready");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    tracing::debug!(remote_addr = %addr, "call session connecting");
    ws.on_upgrade(move |socket| handle_socket(socket, state, graph, addr))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, graph: Arc<Graph>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();

    let buffer = state.session.outbound_buffer.max(1);
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundEvent>(buffer);
    let (in_tx, in_rx) = mpsc::channel::<String>(buffer);

    let coordinator =
        SessionCoordinator::new(graph, state.capabilities.clone(), state.session.clone(), out_tx);
    let session_task = tokio::spawn(coordinator.run(in_rx));

    // Forward coordinator events to the socket in the order they were queued.
    let send_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(kind = event.kind(), "failed to serialize outbound event: {}", e);
                    continue;
                }
            };
            if sender.send(AxumMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            AxumMessage::Text(text) => {
                if in_tx.send(text.to_string()).await.is_err() {
                    break;
                }
            }
            AxumMessage::Close(_) => break,
            _ => {}
        }
    }

    // Closing the inbound queue tells the coordinator the transport is gone.
    drop(in_tx);
    match session_task.await {
        Ok(session) => {
            tracing::info!(
                remote_addr = %addr,
                session_id = %session.id,
                utterances = session.transcript().len(),
                "call session disconnected"
            );
        }
        Err(e) => {
            tracing::error!(remote_addr = %addr, "call session task failed: {}", e);
        }
    }
    send_task.abort();
}
