//! Lifecycle and event fan-out tests for `LiveClient`, driven by the mock transport.

use async_trait::async_trait;
use bytes::Bytes;
use mirror_realtime::mock::{MockTransport, Outbound};
use mirror_realtime::{
    Blob, ConnectionStatus, LiveClient, LiveConfig, LiveError, LiveEvent, LiveEventListener,
    ServerMessage,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<LiveEvent>>,
    notify: Notify,
}

impl Recorder {
    fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(LiveEvent::kind).collect()
    }

    async fn wait_for_kind(&self, kind: &str, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.notify.notified();
                if self.kinds().iter().filter(|k| **k == kind).count() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {} x{}; saw {:?}", kind, count, self.kinds()));
    }
}

#[async_trait]
impl LiveEventListener for Recorder {
    async fn on_event(&self, event: &LiveEvent) -> mirror_realtime::Result<()> {
        self.events.lock().push(event.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

fn setup() -> (Arc<MockTransport>, LiveClient, Arc<Recorder>) {
    let transport = Arc::new(MockTransport::new());
    let client = LiveClient::new(transport.clone());
    let recorder = Arc::new(Recorder::default());
    client.subscribe(recorder.clone());
    (transport, client, recorder)
}

#[tokio::test]
async fn test_connect_emits_open() {
    let (transport, client, recorder) = setup();

    client.connect("models/test", LiveConfig::new().with_voice("Aoede")).await.unwrap();

    assert_eq!(client.status(), ConnectionStatus::Connected);
    assert_eq!(recorder.kinds(), ["open"]);
    let connection = transport.last_connection().unwrap();
    assert_eq!(connection.model(), "models/test");
    assert_eq!(connection.config().voice.as_deref(), Some("Aoede"));
    assert_eq!(client.session_id().as_deref(), Some("mock-0"));
}

#[tokio::test]
async fn test_reconnect_closes_then_opens_once() {
    let (transport, client, recorder) = setup();

    client.connect("m", LiveConfig::new()).await.unwrap();
    client.connect("m", LiveConfig::new()).await.unwrap();

    assert_eq!(recorder.kinds(), ["open", "close", "open"]);
    let connections = transport.connections();
    assert_eq!(connections.len(), 2);
    assert!(connections[0].is_closed());
    assert!(!connections[1].is_closed());
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (_transport, client, recorder) = setup();

    client.disconnect().await.unwrap();
    client.connect("m", LiveConfig::new()).await.unwrap();
    client.disconnect().await.unwrap();
    client.disconnect().await.unwrap();

    assert_eq!(recorder.kinds(), ["open", "close"]);
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_connect_failure_emits_error() {
    let (transport, client, recorder) = setup();
    transport.fail_next_connect("handshake refused");

    let err = client.connect("m", LiveConfig::new()).await.unwrap_err();

    assert!(matches!(err, LiveError::ConnectionError(_)));
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
    assert_eq!(recorder.kinds(), ["error"]);
}

#[tokio::test]
async fn test_send_requires_connection() {
    let (_transport, client, _recorder) = setup();

    assert!(matches!(client.send_text("hi").await, Err(LiveError::NotConnected)));
    assert!(matches!(
        client.send_realtime_input(vec![Blob::jpeg(&[0xff])]).await,
        Err(LiveError::NotConnected)
    ));
}

#[tokio::test]
async fn test_sends_reach_connection() {
    let (transport, client, _recorder) = setup();
    client.connect("m", LiveConfig::new()).await.unwrap();

    client.send_text("Bonjour").await.unwrap();
    client.send_realtime_input(vec![Blob::jpeg(&[1, 2, 3])]).await.unwrap();

    let sent = transport.last_connection().unwrap().sent();
    assert_eq!(sent.len(), 2);
    match &sent[0] {
        Outbound::ClientContent { turns, turn_complete } => {
            assert!(*turn_complete);
            assert_eq!(turns[0].parts[0].text.as_deref(), Some("Bonjour"));
        }
        other => panic!("Expected ClientContent, got {:?}", other),
    }
    assert!(matches!(&sent[1], Outbound::RealtimeInput(media) if media[0].mime_type == "image/jpeg"));
}

#[tokio::test]
async fn test_server_messages_fan_out_in_order() {
    let (transport, client, recorder) = setup();
    client.connect("m", LiveConfig::new()).await.unwrap();
    let connection = transport.last_connection().unwrap();

    connection.push(ServerMessage::SetupComplete);
    connection.push(ServerMessage::Audio {
        data: Bytes::from_static(&[0, 0]),
        mime_type: "audio/pcm;rate=24000".into(),
    });
    connection.push(ServerMessage::Text("salut".into()));
    connection.push(ServerMessage::TurnComplete);

    recorder.wait_for_kind("turncomplete", 1).await;
    assert_eq!(recorder.kinds(), ["open", "setupcomplete", "audio", "content", "turncomplete"]);
    assert!(client.is_setup_complete());
}

#[tokio::test]
async fn test_interrupted_status_until_model_resumes() {
    let (transport, client, recorder) = setup();
    client.connect("m", LiveConfig::new()).await.unwrap();
    let connection = transport.last_connection().unwrap();

    connection.push(ServerMessage::Interrupted);
    recorder.wait_for_kind("interrupted", 1).await;
    assert_eq!(client.status(), ConnectionStatus::Interrupted);
    assert!(client.is_connected());

    connection.push(ServerMessage::TurnComplete);
    recorder.wait_for_kind("turncomplete", 1).await;
    assert_eq!(client.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_server_hangup_closes_session() {
    let (transport, client, recorder) = setup();
    client.connect("m", LiveConfig::new()).await.unwrap();

    transport.last_connection().unwrap().end_stream();

    recorder.wait_for_kind("close", 1).await;
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
    let events = recorder.events.lock().clone();
    assert_eq!(events.last(), Some(&LiveEvent::Close { reason: Some("closed by server".into()) }));
}

#[tokio::test]
async fn test_fatal_receive_error_closes_session() {
    let (transport, client, recorder) = setup();
    client.connect("m", LiveConfig::new()).await.unwrap();

    transport.last_connection().unwrap().push_error(LiveError::connection("reset by peer"));

    recorder.wait_for_kind("close", 1).await;
    assert_eq!(recorder.kinds(), ["open", "error", "close"]);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_protocol_error_keeps_session() {
    let (transport, client, recorder) = setup();
    client.connect("m", LiveConfig::new()).await.unwrap();
    let connection = transport.last_connection().unwrap();

    connection.push_error(LiveError::protocol("garbled frame"));
    connection.push(ServerMessage::TurnComplete);

    recorder.wait_for_kind("turncomplete", 1).await;
    assert_eq!(recorder.kinds(), ["open", "error", "turncomplete"]);
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let (_transport, client, recorder) = setup();
    let other = Arc::new(Recorder::default());
    let id = client.subscribe(other.clone());

    assert!(client.unsubscribe(id));
    assert!(!client.unsubscribe(id));
    client.connect("m", LiveConfig::new()).await.unwrap();

    assert_eq!(recorder.kinds(), ["open"]);
    assert!(other.kinds().is_empty());
}

#[tokio::test]
async fn test_stale_session_messages_are_ignored() {
    let (transport, client, recorder) = setup();
    client.connect("m", LiveConfig::new()).await.unwrap();
    let first = transport.last_connection().unwrap();
    client.connect("m", LiveConfig::new()).await.unwrap();

    first.push(ServerMessage::Text("from the past".into()));
    let second = transport.last_connection().unwrap();
    second.push(ServerMessage::Text("fresh".into()));

    recorder.wait_for_kind("content", 1).await;
    let texts: Vec<String> = recorder
        .events
        .lock()
        .iter()
        .filter_map(|e| match e {
            LiveEvent::Text(t) => Some(t.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, ["fresh"]);
}
