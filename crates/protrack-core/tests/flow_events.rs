//! Flow-level tests for the optimistic submission contract.

use chrono::Utc;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use protrack_core::api::{ApiClient, ApiErrorKind};
use protrack_core::auth::{AuthPhase, AuthSession, RestoreOutcome};
use protrack_core::config::Config;
use protrack_core::flow::{self, FlowEvent};
use protrack_core::session::{SessionStore, SharedToken};
use protrack_types::{ManualEntry, ProteinLevel, SubmissionStatus};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Builds an authenticated client/session pair against a mock server.
/// Mounts the profile endpoint so `restore` validates cleanly.
async fn harness(home: &TempDir, mock_server: &MockServer) -> (ApiClient, AuthSession) {
    Mock::given(method("GET"))
        .and(path("/accounts/profile/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "ada@example.org"
        })))
        .mount(mock_server)
        .await;

    let store = SessionStore::at(home.path().join("session.json"));
    store.save("tok-1").expect("seed session");

    let token = SharedToken::new();
    let config = Config {
        base_url: Some(mock_server.uri()),
        request_timeout_secs: 5,
    };
    let api = ApiClient::from_config(&config, token.clone()).expect("build client");
    let session = AuthSession::new(store, token);
    assert_eq!(session.restore(&api).await, RestoreOutcome::Active);
    (api, session)
}

fn entry(level: ProteinLevel) -> ManualEntry {
    ManualEntry {
        result: Some(level),
        notes: None,
        timestamp: Utc::now(),
    }
}

fn drain(mut rx: mpsc::UnboundedReceiver<FlowEvent>) -> Vec<FlowEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn result_posts(requests: &[Request]) -> Vec<&Request> {
    requests
        .iter()
        .filter(|req| req.url.path() == "/test-results/")
        .collect()
}

fn created_response(id: i64, level: &str) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({
        "id": id,
        "result": level,
        "entry_method": "manual",
        "timestamp": "2026-08-01T09:00:00Z"
    }))
}

#[tokio::test]
async fn test_manual_submit_emits_visible_before_dispatch() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let (api, session) = harness(&home, &mock_server).await;

    Mock::given(method("POST"))
        .and(path("/test-results/"))
        .respond_with(created_response(9, "+1"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    let local = flow::submit_manual(&api, &session, entry(ProteinLevel::PlusOne), &tx)
        .await
        .expect("valid entry");
    drop(tx);

    assert_eq!(local.status, SubmissionStatus::Confirmed);
    assert_eq!(local.record.id, Some(9));

    let events = drain(rx);
    assert_eq!(events.len(), 3);
    let FlowEvent::RecordVisible { record } = &events[0] else {
        panic!("first event must be RecordVisible, got {:?}", events[0]);
    };
    assert_eq!(record.record.id, None);
    assert_eq!(record.status, SubmissionStatus::Pending);
    assert_eq!(record.client_ref, local.client_ref);

    let FlowEvent::RequestDispatched { client_ref } = &events[1] else {
        panic!("second event must be RequestDispatched, got {:?}", events[1]);
    };
    assert_eq!(*client_ref, local.client_ref);

    let FlowEvent::Confirmed { record, .. } = &events[2] else {
        panic!("third event must be Confirmed, got {:?}", events[2]);
    };
    assert_eq!(record.id, Some(9));
}

#[tokio::test]
async fn test_manual_submit_without_level_issues_no_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let (api, session) = harness(&home, &mock_server).await;

    let (tx, rx) = mpsc::unbounded_channel();
    let err = flow::submit_manual(
        &api,
        &session,
        ManualEntry {
            result: None,
            notes: Some("forgot the level".to_string()),
            timestamp: Utc::now(),
        },
        &tx,
    )
    .await
    .expect_err("missing level must fail");
    drop(tx);

    assert_eq!(err.kind, ApiErrorKind::Validation);
    assert!(drain(rx).is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    assert!(result_posts(&requests).is_empty());
}

#[tokio::test]
async fn test_manual_submit_failure_keeps_record_without_rollback() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let (api, session) = harness(&home, &mock_server).await;

    Mock::given(method("POST"))
        .and(path("/test-results/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "boom" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    let local = flow::submit_manual(&api, &session, entry(ProteinLevel::Trace), &tx)
        .await
        .expect("valid entry");
    drop(tx);

    // The record stands in Failed state; the session is untouched.
    assert_eq!(local.status, SubmissionStatus::Failed);
    assert_eq!(local.record.result, ProteinLevel::Trace);
    assert_eq!(session.snapshot().phase, AuthPhase::Authenticated);
    assert!(home.path().join("session.json").exists());

    let events = drain(rx);
    assert!(matches!(events[0], FlowEvent::RecordVisible { .. }));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, FlowEvent::SubmitFailed { .. }))
    );
    assert!(!events.iter().any(|e| matches!(e, FlowEvent::SessionEnded)));
}

#[tokio::test]
async fn test_manual_submit_auth_rejection_ends_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let (api, session) = harness(&home, &mock_server).await;

    Mock::given(method("POST"))
        .and(path("/test-results/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid token." })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    let local = flow::submit_manual(&api, &session, entry(ProteinLevel::PlusTwo), &tx)
        .await
        .expect("valid entry");
    drop(tx);

    assert_eq!(local.status, SubmissionStatus::Failed);
    assert_eq!(session.snapshot().phase, AuthPhase::Unauthenticated);
    assert!(!home.path().join("session.json").exists());

    let events = drain(rx);
    assert!(matches!(events.last(), Some(FlowEvent::SessionEnded)));
}

#[tokio::test]
async fn test_manual_submit_sends_exact_wire_levels() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let (api, session) = harness(&home, &mock_server).await;

    Mock::given(method("POST"))
        .and(path("/test-results/"))
        .respond_with(created_response(1, "Negative"))
        .expect(5)
        .mount(&mock_server)
        .await;

    for level in ProteinLevel::all() {
        let (tx, _rx) = mpsc::unbounded_channel();
        flow::submit_manual(&api, &session, entry(*level), &tx)
            .await
            .expect("valid entry");
    }

    let requests = mock_server.received_requests().await.unwrap();
    let sent: Vec<String> = result_posts(&requests)
        .iter()
        .map(|req| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            assert_eq!(body["entry_method"], "manual");
            body["result"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(sent, vec!["Negative", "Trace", "+1", "+2", "+3"]);
}

#[tokio::test]
async fn test_photo_submit_empty_image_issues_no_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let (api, session) = harness(&home, &mock_server).await;

    let (tx, rx) = mpsc::unbounded_channel();
    let err = flow::submit_photo(&api, &session, Vec::new(), "strip.jpg", "image/jpeg", &tx)
        .await
        .expect_err("empty image must fail");
    drop(tx);

    assert_eq!(err.kind, ApiErrorKind::Validation);
    assert!(drain(rx).is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    assert!(result_posts(&requests).is_empty());
}

#[tokio::test]
async fn test_photo_submit_auth_rejection_ends_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let (api, session) = harness(&home, &mock_server).await;

    Mock::given(method("POST"))
        .and(path("/test-results/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid token." })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    let outcome = flow::submit_photo(
        &api,
        &session,
        b"fake".to_vec(),
        "strip.jpg",
        "image/jpeg",
        &tx,
    )
    .await;
    drop(tx);

    assert!(outcome.is_err());
    assert_eq!(session.snapshot().phase, AuthPhase::Unauthenticated);
    assert!(!home.path().join("session.json").exists());

    let events = drain(rx);
    assert!(matches!(events.first(), Some(FlowEvent::UploadStarted)));
    assert!(matches!(events.last(), Some(FlowEvent::SessionEnded)));
}

#[tokio::test]
async fn test_photo_submit_returns_inferred_record() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let (api, session) = harness(&home, &mock_server).await;

    Mock::given(method("POST"))
        .and(path("/test-results/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 5,
            "result": "Trace",
            "entry_method": "auto"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    let record = flow::submit_photo(
        &api,
        &session,
        b"fake".to_vec(),
        "strip.jpg",
        "image/jpeg",
        &tx,
    )
    .await
    .expect("upload succeeds");
    drop(tx);

    // The server's reading is authoritative; nothing was shown locally
    // before it arrived.
    assert_eq!(record.id, Some(5));
    assert_eq!(record.result, ProteinLevel::Trace);
    assert_eq!(session.snapshot().phase, AuthPhase::Authenticated);

    let events = drain(rx);
    assert!(matches!(events.first(), Some(FlowEvent::UploadStarted)));
    assert!(matches!(events.last(), Some(FlowEvent::UploadFinished)));
}
