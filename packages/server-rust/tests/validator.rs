mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use conduit_server::AppKind;
use serde_json::json;

#[tokio::test]
async fn example_one_reads_first_entry() {
    let app = TestApp::new(AppKind::Validator);
    let valid = json!({"object": "page", "entry": [{"messaging": "hello world"}]});
    assert_eq!(
        app.call("example_one", vec![valid]).await,
        json!("received: hello world")
    );

    let (status, body) = app
        .exec("example_one", vec![json!({"object": "page", "entries": []})])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!("error"));
}

#[tokio::test]
async fn example_two_checks_verify_token() {
    let app = TestApp::new(AppKind::Validator);
    let valid = json!({"hub": {"mode": "subscribe", "verify_token": "AFIDOH1H41V"}});
    assert_eq!(app.call("example_two", vec![valid]).await, json!("success"));

    let invalid = json!({"ham": {"mode": "subscribe", "verify_token": "AFIDOH1H41V"}});
    assert_eq!(app.call("example_two", vec![invalid]).await, json!("error"));
}

#[tokio::test]
async fn validators_are_deterministic() {
    let app = TestApp::new(AppKind::Validator);
    let payload = json!({"entry": [{"messaging": {"text": "x"}}]});
    let first = app.exec("example_one", vec![payload.clone()]).await;
    let second = app.exec("example_one", vec![payload]).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn query_shorthand_runs_handshake() {
    let app = TestApp::new(AppKind::Validator);
    let (status, body) = app
        .send(
            Method::GET,
            "/example_two?hub.mode=subscribe&hub.verify_token=AFIDOH1H41V",
            "",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("success"));
}

#[tokio::test]
async fn body_shorthand_runs_validator() {
    let app = TestApp::new(AppKind::Validator);
    let payload = json!({"entry": [{"messaging": "hey"}]});
    let (status, body) = app
        .send(Method::POST, "/example_one", payload.to_string())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("received: hey"));
}
