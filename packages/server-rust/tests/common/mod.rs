//! Drives a full in-process router the way the demo clients do.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use conduit_server::{AppKind, Dispatcher, NetworkConfig, NetworkModule, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new(app: AppKind) -> Self {
        Self::with_config(app, ServerConfig::default())
    }

    pub fn with_config(app: AppKind, config: ServerConfig) -> Self {
        let dispatcher = Dispatcher::for_app(app, config).unwrap();
        let module = NetworkModule::new(NetworkConfig::default(), dispatcher);
        module.shutdown_controller().set_ready();
        Self {
            router: module.build_router(),
        }
    }

    /// `PUT /` with an `Exec` envelope.
    pub async fn exec(&self, proc: &str, args: Vec<Value>) -> (StatusCode, Value) {
        let envelope = json!({"kind": "Exec", "data": {"proc": proc, "arg": args}});
        self.send(Method::PUT, "/", envelope.to_string()).await
    }

    /// Like `exec`, collapsing failures to `"error"` as the demo clients do.
    pub async fn call(&self, proc: &str, args: Vec<Value>) -> Value {
        match self.exec(proc, args).await {
            (StatusCode::OK, body) => body,
            _ => json!("error"),
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

pub fn no_value() -> Value {
    json!({"isNone": true, "val": null})
}
