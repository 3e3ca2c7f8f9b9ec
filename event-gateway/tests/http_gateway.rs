//! HTTP-level tests for the signed event endpoint.
//!
//! The router runs against recording publisher and notifier fakes, driven with
//! `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{json, Value};
use tower::ServiceExt;

use eventgate::web::router;
use eventgate::{
    sign, AppState, EventGateway, EventPublisher, EventRecord, GatewaySettings, Notifier,
    NotifyError, PublishAck, PublishError, SharedSecret,
};

const SECRET: &str = "integration-secret";

#[derive(Default)]
struct FakePublisher {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    fail: bool,
}

#[async_trait]
impl EventPublisher for FakePublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<PublishAck, PublishError> {
        if self.fail {
            return Err(PublishError::Nacked(topic.to_string()));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec()));
        Ok(PublishAck {
            topic: topic.to_string(),
            body_length: payload.len(),
        })
    }
}

#[derive(Default)]
struct FakeNotifier {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, _channel: &str, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct Harness {
    app: Router,
    publisher: Arc<FakePublisher>,
    notifier: Arc<FakeNotifier>,
}

fn harness_with(publisher: FakePublisher) -> Harness {
    let publisher = Arc::new(publisher);
    let notifier = Arc::new(FakeNotifier::default());
    let gateway = EventGateway::new(
        GatewaySettings {
            secret: SharedSecret::new(SECRET),
            topic: "project-pub-task.my-topic".to_string(),
            alert_channel: "#testapi".to_string(),
        },
        publisher.clone(),
        notifier.clone(),
    );
    Harness {
        app: router(AppState::new(gateway), Duration::from_secs(5)),
        publisher,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(FakePublisher::default())
}

fn random_event() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(15)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

fn record(event: &str) -> EventRecord {
    EventRecord::new(event, "58483181", "2022-01-05T01:26:09")
}

fn signature_for(record: &EventRecord) -> String {
    sign(record, &SharedSecret::new(SECRET))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn valid_signature_with_identity_is_created() {
    let h = harness();

    for _ in 0..5 {
        let rec = record(&random_event());
        let uri = format!(
            "/test?signature={}&appId=casino&accountId=58483181&sessionId=1",
            signature_for(&rec)
        );
        let body = serde_json::to_value(&rec).unwrap();

        let (status, response) = send(&h.app, post(&uri, body.clone())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response, body);
    }

    assert_eq!(h.publisher.published.lock().unwrap().len(), 5);
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn valid_signature_without_identity_is_created() {
    let h = harness();
    let rec = record("abc");
    let uri = format!("/test?signature={}", signature_for(&rec));
    let body = json!({
        "event": "abc",
        "character_id": "58483181",
        "utc_timestamp": "2022-01-05T01:26:09"
    });

    let (status, response) = send(&h.app, post(&uri, body.clone())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response, body);

    let published = h.publisher.published.lock().unwrap();
    assert_eq!(published[0].0, "project-pub-task.my-topic");
    assert_eq!(
        published[0].1,
        b"{'event': 'abc', 'character_id': '58483181', 'utc_timestamp': '2022-01-05T01:26:09'}"
    );
}

#[tokio::test]
async fn wrong_signature_is_rejected_and_alerted() {
    let h = harness();
    let rec = record("abc");
    let forged: String = (0..128)
        .map(|_| char::from_digit(rand::thread_rng().gen_range(0..16), 16).unwrap())
        .collect();
    assert_ne!(forged, signature_for(&rec));
    let uri = format!("/test?signature={forged}&appId=casino&accountId=58483181&sessionId=1");

    let (status, response) =
        send(&h.app, post(&uri, serde_json::to_value(&rec).unwrap())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, json!({"detail": "Invalid signature!"}));
    assert!(h.publisher.published.lock().unwrap().is_empty());

    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("server_event=test"));
    assert!(sent[0].contains(&forged));
}

#[tokio::test]
async fn signature_over_other_record_is_rejected() {
    let h = harness();
    let sig = signature_for(&record("abc"));
    let uri = format!("/test?signature={sig}");

    let (status, _) = send(&h.app, post(&uri, serde_json::to_value(record("abd")).unwrap())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn replayed_request_is_accepted_twice() {
    let h = harness();
    let rec = record("replay");
    let uri = format!("/login?signature={}", signature_for(&rec));
    let body = serde_json::to_value(&rec).unwrap();

    for _ in 0..2 {
        let (status, _) = send(&h.app, post(&uri, body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    assert_eq!(h.publisher.published.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_signature_is_unprocessable() {
    let h = harness();
    let body = serde_json::to_value(record("abc")).unwrap();

    let (status, response) = send(&h.app, post("/test", body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response["detail"].is_string());
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_integer_account_id_is_unprocessable() {
    let h = harness();
    let rec = record("abc");
    let uri = format!("/test?signature={}&accountId=casino", signature_for(&rec));

    let (status, _) = send(&h.app, post(&uri, serde_json::to_value(&rec).unwrap())).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(h.publisher.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_integer_session_id_is_unprocessable() {
    let h = harness();
    let rec = record("abc");
    let uri = format!("/test?signature={}&sessionId=abc", signature_for(&rec));

    let (status, response) = send(&h.app, post(&uri, serde_json::to_value(&rec).unwrap())).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response["detail"].is_string());
    assert!(h.publisher.published.lock().unwrap().is_empty());
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_payloads_never_reach_the_notifier() {
    let h = harness();
    let bodies = [
        json!({"event": "abc", "character_id": "58483181"}),
        json!({"event": 1, "character_id": "58483181", "utc_timestamp": "t"}),
        json!({"event": "abc", "character_id": "1", "utc_timestamp": "t", "extra": true}),
        json!({"event": "abc", "character_id": "1", "utc_timestap": "t"}),
        json!(["not", "an", "object"]),
    ];

    for body in bodies {
        let (status, _) = send(&h.app, post("/test?signature=abc", body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    assert!(h.notifier.sent.lock().unwrap().is_empty());
    assert!(h.publisher.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn publisher_failure_is_server_error() {
    let h = harness_with(FakePublisher {
        fail: true,
        ..Default::default()
    });
    let rec = record("abc");
    let uri = format!("/test?signature={}", signature_for(&rec));

    let (status, response) = send(&h.app, post(&uri, serde_json::to_value(&rec).unwrap())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, json!({"detail": "Internal server error"}));
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn health_check() {
    let h = harness();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, response) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"status": "ok"}));
}
