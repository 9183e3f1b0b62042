use async_trait::async_trait;
use callpilot_capability::{Capabilities, CapabilityError, IntentClassifier};
use callpilot_server::config::Config;
use callpilot_server::{app, AppState};
use callpilot_types::IntentResult;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("failed to connect");
    socket
}

async fn send(socket: &mut Socket, frame: Value) {
    socket
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

async fn recv(socket: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn recv_until(socket: &mut Socket, kind: &str) -> Vec<Value> {
    let mut events = Vec::new();
    loop {
        let event = recv(socket).await;
        let done = event["type"] == kind;
        events.push(event);
        if done {
            return events;
        }
    }
}

fn kinds(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .map(|e| e["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_policy_and_accident_utterance_end_to_end() {
    let addr = spawn_server(AppState::from_config(&Config::default())).await;
    let mut socket = connect(addr).await;

    send(
        &mut socket,
        json!({
            "type": "transcript",
            "text": "My policy is CAR-100002 and I was in an accident",
            "is_finalized": true,
            "speaker": "Customer",
            "offset": 1.0
        }),
    )
    .await;

    let events = recv_until(&mut socket, "suggestion").await;
    let kinds = kinds(&events);

    assert_eq!(kinds[0], "transcript");
    assert_eq!(events[0]["data"]["timestamp"].as_str().map(str::len), Some(8));

    // Fast path: the profile arrives before the slow path even starts.
    assert_eq!(kinds[1], "member_profile");
    assert_eq!(events[1]["data"]["policyId"], "CAR-100002");
    assert_eq!(kinds[2], "processing");

    let slow: Vec<&str> = kinds[3..]
        .iter()
        .map(String::as_str)
        .filter(|k| *k != "member_profile")
        .collect();
    assert_eq!(
        slow,
        vec![
            "intent",
            "knowledge",
            "compliance",
            "clear_suggestion",
            "suggestion_chunk",
            "suggestion"
        ]
    );

    let streamed: String = events
        .iter()
        .filter(|e| e["type"] == "suggestion_chunk")
        .filter_map(|e| e["data"]["text"].as_str())
        .collect();
    let suggestion = events.last().unwrap();
    assert_eq!(suggestion["data"]["text"].as_str(), Some(streamed.as_str()));

    let intent = events.iter().find(|e| e["type"] == "intent").unwrap();
    assert_eq!(intent["data"]["intent"], "car_accident");
    assert_eq!(intent["data"]["claim_type"], "car_insurance");

    let knowledge = events.iter().find(|e| e["type"] == "knowledge").unwrap();
    let first_tags = knowledge["data"][0]["tags"].as_array().unwrap();
    assert!(first_tags.iter().any(|t| t == "accident"));

    let compliance = events.iter().find(|e| e["type"] == "compliance").unwrap();
    let categories: Vec<&str> = compliance["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["category"].as_str())
        .collect();
    assert!(categories.contains(&"car"));
    assert!(!categories.contains(&"life"));
}

#[tokio::test]
async fn test_end_call_emits_scorecard_and_ignores_later_messages() {
    let addr = spawn_server(AppState::from_config(&Config::default())).await;
    let mut socket = connect(addr).await;

    send(
        &mut socket,
        json!({"text": "Thank you for calling, how can I help?", "speaker": "Agent", "offset": 0.0}),
    )
    .await;
    send(
        &mut socket,
        json!({"text": "My car was stolen last night", "speaker": "Customer", "offset": 2.5}),
    )
    .await;
    send(&mut socket, json!({"type": "end_call"})).await;

    let events = recv_until(&mut socket, "post_call_evaluation").await;
    assert_eq!(
        kinds(&events).iter().filter(|k| *k == "suggestion").count(),
        2
    );
    let card = &events.last().unwrap()["data"];
    assert_eq!(card["total_utterances"], 2);
    assert_eq!(card["agent_utterances"], 1);
    assert_eq!(card["customer_utterances"], 1);
    assert!(card["overall_score"].as_u64().unwrap() <= 100);

    send(&mut socket, json!({"text": "hello?", "speaker": "Customer"})).await;
    let quiet = tokio::time::timeout(Duration::from_millis(300), socket.next()).await;
    assert!(quiet.is_err(), "no events expected after the call closed");
}

#[tokio::test]
async fn test_invalid_frames_keep_connection_open() {
    let addr = spawn_server(AppState::from_config(&Config::default())).await;
    let mut socket = connect(addr).await;

    socket
        .send(Message::Text("not json".to_string().into()))
        .await
        .unwrap();
    send(&mut socket, json!({"type": "transcript"})).await;
    send(&mut socket, json!({"type": "hold_music"})).await;
    send(&mut socket, json!({"text": "still there?", "is_finalized": false})).await;

    let event = recv(&mut socket).await;
    assert_eq!(event["type"], "transcript");
    assert_eq!(event["data"]["text"], "still there?");
    assert_eq!(event["data"]["speaker"], "Unknown");
}

#[tokio::test]
async fn test_offsets_arrive_as_ticks_and_oversized_ones_are_dropped() {
    let addr = spawn_server(AppState::from_config(&Config::default())).await;
    let mut socket = connect(addr).await;

    send(&mut socket, json!({"text": "far future", "is_finalized": false, "offset": 1.0e300})).await;
    send(&mut socket, json!({"text": "hello", "is_finalized": false, "offset": 25_000_000})).await;

    let echo = recv(&mut socket).await;
    assert_eq!(echo["type"], "transcript");
    assert_eq!(echo["data"]["text"], "hello");
    assert_eq!(echo["data"]["offset"], 2.5);
}

struct FailingClassifier;

#[async_trait]
impl IntentClassifier for FailingClassifier {
    async fn classify(&self, _transcript: &str) -> Result<IntentResult, CapabilityError> {
        Err(CapabilityError::Backend("model overloaded".to_string()))
    }
}

#[tokio::test]
async fn test_capability_failure_emits_error_and_session_continues() {
    let caps = Capabilities {
        classifier: Arc::new(FailingClassifier),
        ..Capabilities::rule_based()
    };
    let state = AppState::with_capabilities(&Config::default(), caps);
    let addr = spawn_server(state).await;
    let mut socket = connect(addr).await;

    send(&mut socket, json!({"text": "I had an accident"})).await;
    let events = recv_until(&mut socket, "error").await;
    assert!(events.iter().all(|e| e["type"] != "intent"));
    let message = events.last().unwrap()["data"]["message"].as_str().unwrap();
    assert!(message.contains("intent"));

    send(&mut socket, json!({"text": "my number is 8765432109", "is_finalized": false})).await;
    let echo = recv(&mut socket).await;
    assert_eq!(echo["type"], "transcript");
    let profile = recv(&mut socket).await;
    assert_eq!(profile["type"], "member_profile");
}

struct SlowClassifier;

#[async_trait]
impl IntentClassifier for SlowClassifier {
    async fn classify(&self, _transcript: &str) -> Result<IntentResult, CapabilityError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(IntentResult {
            intent: "general_inquiry".to_string(),
            claim_type: None,
        })
    }
}

#[tokio::test]
async fn test_disconnect_mid_invocation_is_quiet() {
    let caps = Capabilities {
        classifier: Arc::new(SlowClassifier),
        ..Capabilities::rule_based()
    };
    let state = AppState::with_capabilities(&Config::default(), caps);
    let addr = spawn_server(state).await;
    let mut socket = connect(addr).await;

    send(&mut socket, json!({"text": "I need some help"})).await;
    assert_eq!(recv(&mut socket).await["type"], "transcript");
    assert_eq!(recv(&mut socket).await["type"], "processing");

    socket.close(None).await.unwrap();

    // The server finishes the close handshake without sending anything else.
    let rest: Vec<_> = tokio::time::timeout(Duration::from_secs(2), socket.collect::<Vec<_>>())
        .await
        .expect("stream should end");
    assert!(rest
        .iter()
        .all(|m| !matches!(m, Ok(Message::Text(_)))));
}
