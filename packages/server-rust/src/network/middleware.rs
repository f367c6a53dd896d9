//! Transport middleware wrapped around every route.
//!
//! Layers, outermost first:
//! 1. `SetRequestId` -- UUID v4 `x-request-id` on each request
//! 2. `Trace` -- one span per HTTP request
//! 3. `Compression` -- gzip when the client accepts it
//! 4. error body -- rewrites failures produced below dispatch to `"error"`
//! 5. `Cors` -- GET, POST and PUT from the configured origins
//! 6. `Timeout` -- whole-request deadline, 408 on expiry
//! 7. `PropagateRequestId` -- echoes `x-request-id` on the response
//!
//! Load shedding, per-operation deadlines and metrics belong to the operation
//! pipeline, not to this stack.

use axum::http::header::{self, HeaderName};
use axum::http::{Method, StatusCode};
use axum::middleware::map_response;
use axum::response::Response;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;
use super::handlers::error_response;

const REQUEST_ID: &str = "x-request-id";

/// Wraps every route of `router`, including the fallback, in the transport
/// layers.
pub fn with_http_layers<S>(router: Router<S>, config: &NetworkConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let request_id = HeaderName::from_static(REQUEST_ID);
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(map_response(uniform_error_body))
            .layer(cors_layer(&config.cors_origins))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout,
            ))
            .layer(PropagateRequestIdLayer::new(request_id)),
    )
}

/// Gives failures raised outside the dispatcher (405 from method routing,
/// 408 from the request deadline, extractor rejections) the JSON `"error"`
/// body every dispatch failure carries. Other headers, such as `allow`, are
/// kept.
async fn uniform_error_body(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if !(status.is_client_error() || status.is_server_error()) || is_json {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut replaced = error_response(status);
    for (name, value) in &parts.headers {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            replaced.headers_mut().append(name, value.clone());
        }
    }
    replaced
}

/// A `"*"` entry allows any origin; otherwise unparsable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::response::IntoResponse;
    use axum::routing::put;
    use tower::ServiceExt;

    use super::*;

    fn app(request_timeout: Duration) -> Router {
        let config = NetworkConfig {
            request_timeout,
            cors_origins: vec!["http://localhost:3000".to_string()],
            ..NetworkConfig::default()
        };
        let router = Router::new()
            .route("/", put(|| async { "\"ok\"" }))
            .route(
                "/slow",
                put(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    "\"late\""
                }),
            );
        with_http_layers(router, &config)
    }

    async fn send(router: Router, method: Method, uri: &str) -> (StatusCode, Response) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        (response.status(), response)
    }

    async fn body_of(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn wrong_method_gets_error_body_and_allow_header() {
        let (status, response) = send(app(Duration::from_secs(5)), Method::GET, "/").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key(header::ALLOW));
        assert!(response.headers().contains_key(REQUEST_ID));
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_of(response).await, "\"error\"");
    }

    #[tokio::test(start_paused = true)]
    async fn request_deadline_gets_error_body() {
        let (status, response) = send(app(Duration::from_millis(50)), Method::PUT, "/slow").await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body_of(response).await, "\"error\"");
    }

    #[tokio::test]
    async fn successful_responses_pass_untouched() {
        let (status, response) = send(app(Duration::from_secs(5)), Method::PUT, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID));
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
        assert_eq!(body_of(response).await, "\"ok\"");
    }

    #[tokio::test]
    async fn json_failures_are_left_alone() {
        let original = (StatusCode::CONFLICT, axum::Json(serde_json::json!({"k": 1})));
        let response = uniform_error_body(original.into_response()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_of(response).await, r#"{"k":1}"#);
    }

    #[test]
    fn wildcard_and_listed_origins_build() {
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["https://example.com".to_string(), "not a header\n".to_string()]);
    }
}
