//! End-to-end tests over real WebSocket connections

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use frame_relay::classifier::{Classifier, ClassifierConfig, FixedClassifier, ProcessClassifier};
use frame_relay::store::DetectionLog;
use frame_relay::{RelayServer, ServerConfig};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    log_path: PathBuf,
    _dir: TempDir,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start<C: Classifier>(classifier: C) -> Self {
        Self::start_with(classifier, |config| config.disable_static_files()).await
    }

    async fn start_with<C, F>(classifier: C, configure: F) -> Self
    where
        C: Classifier,
        F: FnOnce(ServerConfig) -> ServerConfig,
    {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        let log_path = static_dir.join("detection.json");

        let config = ServerConfig::default()
            .detection_log_path(&log_path)
            .static_dir(&static_dir);
        let server = RelayServer::with_classifier(configure(config), classifier);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();

        tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            log_path,
            _dir: dir,
            _shutdown: shutdown,
        }
    }

    async fn connect(&self) -> Client {
        let (ws, _) = connect_async(format!("ws://{}/ws", self.addr)).await.unwrap();
        ws
    }

    async fn records(&self) -> Vec<frame_relay::store::DetectionRecord> {
        DetectionLog::new(&self.log_path).load().await.unwrap()
    }
}

/// Plain HTTP GET, returning the status line and body
async fn http_get(addr: SocketAddr, path: &str) -> (String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    let (head, body) = response.split_once("\r\n\r\n").unwrap();
    let status_line = head.lines().next().unwrap().to_string();
    (status_line, body.to_string())
}

async fn recv_event(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed")
            .expect("receive failed");

        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

async fn send_frame(ws: &mut Client, id: &str, frame: &str) {
    send_json(ws, json!({"event": "video-frame", "data": {"id": id, "frame": frame}})).await;
}

fn status(active: bool) -> Value {
    json!({"event": "stream-status", "data": {"active": active}})
}

#[tokio::test]
async fn test_frame_relayed_and_classified() {
    let server = TestServer::start(FixedClassifier::verdict("bottle")).await;

    let mut producer = server.connect().await;
    let mut viewer = server.connect().await;
    assert_eq!(recv_event(&mut producer).await, status(false));
    assert_eq!(recv_event(&mut viewer).await, status(false));

    send_frame(&mut producer, "f1", "AAAA").await;

    assert_eq!(recv_event(&mut viewer).await, status(true));
    assert_eq!(
        recv_event(&mut viewer).await,
        json!({"event": "stream", "data": {"id": "f1", "frame": "AAAA"}})
    );
    assert_eq!(
        recv_event(&mut viewer).await,
        json!({"event": "detection", "data": {"id": "f1", "detection": "bottle"}})
    );

    // The producer receives its own broadcasts too
    assert_eq!(recv_event(&mut producer).await, status(true));
    assert_eq!(recv_event(&mut producer).await["event"], "stream");

    let records = server.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "f1");
    assert_eq!(records[0].detection.as_deref(), Some("bottle"));
}

#[tokio::test]
async fn test_late_viewer_and_producer_leaving() {
    let server = TestServer::start(FixedClassifier::verdict("cup")).await;

    let mut producer = server.connect().await;
    assert_eq!(recv_event(&mut producer).await, status(false));
    send_frame(&mut producer, "f1", "AAAA").await;
    assert_eq!(recv_event(&mut producer).await, status(true));

    let mut viewer = server.connect().await;
    assert_eq!(recv_event(&mut viewer).await, status(true));

    producer.close(None).await.unwrap();

    // Skip any detection still in flight
    loop {
        let event = recv_event(&mut viewer).await;
        if event["event"] == "stream-status" {
            assert_eq!(event, status(false));
            break;
        }
        assert_eq!(event["event"], "detection");
    }
}

#[tokio::test]
async fn test_malformed_messages_ignored() {
    let server = TestServer::start(FixedClassifier::verdict("cup")).await;

    let mut sender = server.connect().await;
    let mut viewer = server.connect().await;
    assert_eq!(recv_event(&mut sender).await, status(false));
    assert_eq!(recv_event(&mut viewer).await, status(false));

    sender
        .send(Message::Text("not json".to_string()))
        .await
        .unwrap();
    send_json(&mut sender, json!({"event": "video-frame", "data": {"id": 7, "frame": "AAAA"}})).await;
    send_json(&mut sender, json!({"event": "video-frame", "data": {"id": "x"}})).await;
    send_json(&mut sender, json!({"event": "chat", "data": "hello"})).await;
    sender.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    send_frame(&mut sender, "ok", "BBBB").await;

    // Nothing before the valid frame reaches the viewer
    assert_eq!(recv_event(&mut viewer).await, status(true));
    assert_eq!(
        recv_event(&mut viewer).await,
        json!({"event": "stream", "data": {"id": "ok", "frame": "BBBB"}})
    );
    assert_eq!(recv_event(&mut viewer).await["data"]["id"], "ok");

    let records = server.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "ok");
}

#[tokio::test]
async fn test_external_classifier_process() {
    let config = ClassifierConfig::new("sh")
        .arg("-c")
        .arg("test \"$1\" = QUJD && echo person || exit 3")
        .arg("classifier");
    let server = TestServer::start(ProcessClassifier::new(config)).await;

    let mut client = server.connect().await;
    assert_eq!(recv_event(&mut client).await, status(false));

    send_frame(&mut client, "good", "QUJD").await;
    send_frame(&mut client, "bad", "ZZZZ").await;

    let mut detections = Vec::new();
    while detections.len() < 2 {
        let event = recv_event(&mut client).await;
        if event["event"] == "detection" {
            detections.push(event["data"].clone());
        }
    }
    detections.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));

    assert_eq!(detections[0], json!({"id": "bad", "detection": null}));
    assert_eq!(detections[1], json!({"id": "good", "detection": "person"}));

    let records = server.records().await;
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r.id == "bad" && r.detection.is_none()));
}

#[tokio::test]
async fn test_status_endpoint() {
    let server = TestServer::start(FixedClassifier::verdict("cup")).await;

    let mut client = server.connect().await;
    assert_eq!(recv_event(&mut client).await, status(false));
    send_frame(&mut client, "f1", "AAAA").await;
    assert_eq!(recv_event(&mut client).await, status(true));

    let (status_line, body) = http_get(server.addr, "/api/status").await;
    assert!(status_line.starts_with("HTTP/1.1 200"), "{}", status_line);
    let body: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(body["active"], true);
    assert_eq!(body["producers"], 1);
    assert_eq!(body["connections"], 1);
    assert_eq!(body["stats"]["frames_relayed"], 1);
}

#[tokio::test]
async fn test_connection_limit_rejects_excess_clients() {
    let server =
        TestServer::start_with(FixedClassifier::verdict("cup"), |config| {
            config.disable_static_files().max_connections(1)
        })
        .await;

    let mut first = server.connect().await;
    assert_eq!(recv_event(&mut first).await, status(false));

    let err = connect_async(format!("ws://{}/ws", server.addr))
        .await
        .err()
        .expect("second connection should be refused");
    match err {
        WsError::Http(response) => assert_eq!(response.status().as_u16(), 503),
        other => panic!("unexpected error: {}", other),
    }

    // The admitted client is unaffected
    send_frame(&mut first, "f1", "AAAA").await;
    assert_eq!(recv_event(&mut first).await, status(true));
}

#[tokio::test]
async fn test_detection_log_served_as_static_file() {
    let server = TestServer::start_with(FixedClassifier::verdict("bottle"), |config| config).await;

    let (status_line, _) = http_get(server.addr, "/detection.json").await;
    assert!(status_line.starts_with("HTTP/1.1 404"), "{}", status_line);

    let mut client = server.connect().await;
    assert_eq!(recv_event(&mut client).await, status(false));
    send_frame(&mut client, "f1", "AAAA").await;
    loop {
        if recv_event(&mut client).await["event"] == "detection" {
            break;
        }
    }

    let (status_line, body) = http_get(server.addr, "/detection.json").await;
    assert!(status_line.starts_with("HTTP/1.1 200"), "{}", status_line);

    let records: Value = serde_json::from_str(&body).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "f1");
    assert_eq!(records[0]["detection"], "bottle");
    assert!(records[0]["timestamp"].is_i64());
}
