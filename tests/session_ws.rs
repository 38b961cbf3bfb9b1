//! End-to-end session over real WebSocket connections.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use livepoll::server;
use livepoll::session::hub::SessionSettings;
use livepoll::session::SessionHub;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hub = SessionHub::new(SessionSettings::default());
    tokio::spawn(server::serve(listener, hub));
    addr
}

async fn open(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    socket
}

async fn send(socket: &mut Socket, frame: Value) {
    socket
        .send(Message::text(frame.to_string()))
        .await
        .unwrap();
}

/// Next text frame, or `None` when the server closed the socket.
async fn next_frame(socket: &mut Socket) -> Option<Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")?;
        match msg {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// Skip frames until one carries `event`.
async fn wait_for(socket: &mut Socket, event: &str) -> Value {
    loop {
        let frame = next_frame(socket)
            .await
            .unwrap_or_else(|| panic!("socket closed before {}", event));
        if frame["event"] == event {
            return frame;
        }
    }
}

/// Skip frames until the response carrying `id`.
async fn wait_for_response(socket: &mut Socket, id: &str) -> Value {
    loop {
        let frame = wait_for(socket, "response").await;
        if frame["id"] == id {
            return frame;
        }
    }
}

async fn join(addr: SocketAddr, name: &str) -> Socket {
    let mut socket = open(addr).await;
    send(&mut socket, json!({ "id": "join", "type": "join", "name": name })).await;
    let reply = wait_for_response(&mut socket, "join").await;
    assert_eq!(reply["ok"], true, "join failed: {}", reply);
    socket
}

#[tokio::test]
async fn test_connect_sequence() {
    let addr = start_server().await;
    let mut socket = open(addr).await;

    let connected = next_frame(&mut socket).await.unwrap();
    assert_eq!(connected["event"], "connected");
    assert!(connected["connectionId"].is_u64());

    let snapshot = next_frame(&mut socket).await.unwrap();
    assert_eq!(snapshot["event"], "snapshot");
    assert_eq!(snapshot["state"], "idle");
    assert!(snapshot.get("poll").is_none());

    let participants = next_frame(&mut socket).await.unwrap();
    assert_eq!(participants["event"], "participantsChanged");
    assert_eq!(participants["names"], json!([]));
}

#[tokio::test]
async fn test_poll_closes_when_everyone_voted() {
    let addr = start_server().await;
    let mut presenter = open(addr).await;
    let mut ada = join(addr, "ada").await;
    let mut bob = join(addr, "bob").await;

    send(
        &mut presenter,
        json!({
            "id": "p1",
            "type": "createPoll",
            "question": "Tabs or spaces?",
            "options": [{ "text": "tabs" }, { "text": "spaces" }],
            "durationSecs": 60
        }),
    )
    .await;
    let created = wait_for_response(&mut presenter, "p1").await;
    assert_eq!(created["ok"], true);
    let poll_id = created["result"]["poll"]["id"].as_u64().unwrap();

    let started = wait_for(&mut ada, "pollStarted").await;
    assert_eq!(started["poll"]["question"], "Tabs or spaces?");
    assert_eq!(started["poll"]["state"], "voting");

    send(&mut ada, json!({ "id": "v", "type": "vote", "pollId": poll_id, "optionIndex": 0 })).await;
    let reply = wait_for_response(&mut ada, "v").await;
    assert_eq!(reply["ok"], true);

    send(&mut ada, json!({ "id": "v2", "type": "vote", "pollId": poll_id, "optionIndex": 1 })).await;
    let reply = wait_for_response(&mut ada, "v2").await;
    assert_eq!(reply["ok"], false);
    assert_eq!(reply["error"]["code"], "DUPLICATE_VOTE");

    send(&mut bob, json!({ "id": "v", "type": "vote", "pollId": poll_id, "optionIndex": 1 })).await;

    let closed = wait_for(&mut presenter, "votingClosed").await;
    assert_eq!(closed["pollId"], poll_id);
    assert_eq!(closed["reason"], "allVoted");
    assert_eq!(closed["tally"]["counts"], json!([1, 1]));

    send(&mut presenter, json!({ "id": "h", "type": "fetchHistory" })).await;
    let history = wait_for_response(&mut presenter, "h").await;
    assert_eq!(history["result"]["history"].as_array().unwrap().len(), 1);

    // A late joiner sees the results that are on screen
    let mut late = open(addr).await;
    let snapshot = wait_for(&mut late, "snapshot").await;
    assert_eq!(snapshot["state"], "showingResults");
    let tally = next_frame(&mut late).await.unwrap();
    assert_eq!(tally["event"], "tallyUpdated");
    assert_eq!(tally["tally"]["counts"], json!([1, 1]));
}

#[tokio::test]
async fn test_kick_closes_socket() {
    let addr = start_server().await;
    let mut presenter = open(addr).await;
    let mut ada = join(addr, "ada").await;

    send(&mut presenter, json!({ "id": "k", "type": "kick", "name": "ada" })).await;
    // The participant broadcast is queued ahead of the reply
    let mut last_names = None;
    let reply = loop {
        let frame = next_frame(&mut presenter).await.unwrap();
        if frame["event"] == "participantsChanged" {
            last_names = Some(frame["names"].clone());
        } else if frame["event"] == "response" && frame["id"] == "k" {
            break frame;
        }
    };
    assert_eq!(reply["result"]["kicked"], true);
    assert_eq!(last_names, Some(json!([])));

    wait_for(&mut ada, "removedFromSession").await;
    assert!(next_frame(&mut ada).await.is_none());

    // Unknown names are ignored
    send(&mut presenter, json!({ "id": "k2", "type": "kick", "name": "nobody" })).await;
    let reply = wait_for_response(&mut presenter, "k2").await;
    assert_eq!(reply["ok"], true);
    assert_eq!(reply["result"]["kicked"], false);
}

#[tokio::test]
async fn test_malformed_frame_rejected() {
    let addr = start_server().await;
    let mut socket = open(addr).await;

    socket.send(Message::text("not json")).await.unwrap();
    let reply = wait_for(&mut socket, "response").await;
    assert_eq!(reply["ok"], false);
    assert_eq!(reply["error"]["code"], "INVALID_REQUEST");

    // The request id survives a frame that fails typed parsing
    send(&mut socket, json!({ "id": "bad", "type": "vote", "pollId": "nine" })).await;
    let reply = wait_for_response(&mut socket, "bad").await;
    assert_eq!(reply["error"]["code"], "INVALID_REQUEST");

    send(&mut socket, json!({ "id": "x", "type": "vote", "pollId": 9, "optionIndex": 0 })).await;
    let reply = wait_for_response(&mut socket, "x").await;
    assert_eq!(reply["error"]["code"], "NO_ACTIVE_POLL");
}
