//! WebSocket transport
//!
//! Each socket gets an outlet on the hub. A writer task drains the outlet
//! into the socket while the read loop feeds text frames to the hub.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::connect_info::MaybeConnectInfo;
use crate::session::SessionHub;

pub async fn ws_handler(
    State(hub): State<Arc<SessionHub>>,
    MaybeConnectInfo(peer): MaybeConnectInfo,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub, peer))
}

async fn handle_socket(socket: WebSocket, hub: Arc<SessionHub>, peer: Option<std::net::SocketAddr>) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut outlet) = hub.connect();
    debug!(connection = %connection, peer = ?peer, "socket upgraded");

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outlet.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(err) => {
                    warn!(connection = %connection, "failed to encode event: {}", err);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            if event.is_terminal() {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => recv_hub.handle_frame(connection, text.as_str()),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.disconnect(connection);
}
