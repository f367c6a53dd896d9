//! Procedure endpoints.
//!
//! `PUT /` carries a full envelope. `GET /{proc}` and `POST /{proc}` are
//! shorthands that build an `Exec` with a single argument: the query string
//! as an object, or the JSON body.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use conduit_core::{Envelope, Reply};
use serde_json::{Map, Value};

use super::{error_response, AppState, DispatchError};

/// `PUT /`: decode the envelope and dispatch it.
pub async fn exec_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, DispatchError> {
    let envelope = Envelope::decode(&body)?;
    run(&state, envelope).await
}

/// `GET /{proc}?k=v`: call `proc` with `{k: v, ...}`.
///
/// Query values stay strings. A repeated key keeps its last value.
pub async fn query_handler(
    State(state): State<AppState>,
    Path(proc_name): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, DispatchError> {
    let arg: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    run(&state, Envelope::exec(proc_name, vec![Value::Object(arg)])).await
}

/// `POST /{proc}`: call `proc` with the JSON body as its only argument.
pub async fn body_handler(
    State(state): State<AppState>,
    Path(proc_name): Path<String>,
    body: Bytes,
) -> Result<Response, DispatchError> {
    let arg: Value = serde_json::from_slice(&body).map_err(DispatchError::Body)?;
    run(&state, Envelope::exec(proc_name, vec![arg])).await
}

/// Fallback for paths no route matches.
pub async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND)
}

async fn run(state: &AppState, envelope: Envelope) -> Result<Response, DispatchError> {
    let _guard = state.shutdown.try_enter().ok_or(DispatchError::Draining)?;
    let reply = state.dispatcher.dispatch(envelope).await?;
    reply_response(&reply)
}

fn reply_response(reply: &Reply) -> Result<Response, DispatchError> {
    let body = reply.encode().map_err(DispatchError::Encode)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
