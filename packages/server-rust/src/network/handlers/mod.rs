//! HTTP handler definitions for the Conduit server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors), the [`Dispatcher`] that feeds decoded envelopes into the
//! operation pipeline, and [`DispatchError`], the single place where pipeline
//! failures become HTTP statuses.

pub mod exec;
pub mod health;

pub use exec::{body_handler, exec_handler, not_found_handler, query_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use conduit_core::{Envelope, EnvelopeError, Reply};
use tower::ServiceExt;

use super::ShutdownController;
use crate::service::{
    build_operation_pipeline, build_registry, AppKind, ClassifyError, CommandRouter,
    OperationError, OperationPipeline, OperationService, ProcedureError, RegistryError,
    ServerConfig,
};

/// Body written for every non-success response.
pub const ERROR_BODY: &str = "\"error\"";

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

/// Classifies envelopes and drives them through the operation pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    pipeline: OperationPipeline,
    classifier: Arc<OperationService>,
    app: AppKind,
    procedures: usize,
}

impl Dispatcher {
    /// Builds the registry for `app` and wraps it in the full pipeline.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if the app registers a procedure name twice.
    pub fn for_app(app: AppKind, config: ServerConfig) -> Result<Self, RegistryError> {
        let config = Arc::new(config);
        let registry = build_registry(app, &config)?;
        let procedures = registry.len();
        let router = CommandRouter::new(Arc::new(registry));
        let pipeline = build_operation_pipeline(router, &config);
        Ok(Self {
            pipeline,
            classifier: Arc::new(OperationService::new(config)),
            app,
            procedures,
        })
    }

    #[must_use]
    pub fn app(&self) -> AppKind {
        self.app
    }

    /// Number of procedures the hosted app registered.
    #[must_use]
    pub fn procedure_count(&self) -> usize {
        self.procedures
    }

    /// Runs one envelope to completion.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` for classification or pipeline failures.
    /// Domain failures arrive as `Ok` replies.
    pub async fn dispatch(&self, envelope: Envelope) -> Result<Reply, DispatchError> {
        let op = self.classifier.classify(envelope)?;
        let reply = self.pipeline.clone().oneshot(op).await?;
        Ok(reply)
    }
}

/// Everything that turns a request into a non-success response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("server is draining")]
    Draining,
    #[error("request body is not JSON: {0}")]
    Body(#[source] serde_json::Error),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error("reply could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

impl DispatchError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(_) | Self::Envelope(_) | Self::Classify(_) => StatusCode::BAD_REQUEST,
            Self::Draining => StatusCode::SERVICE_UNAVAILABLE,
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Operation(err) => operation_status(err),
        }
    }
}

fn operation_status(err: &OperationError) -> StatusCode {
    match err {
        OperationError::UnknownProcedure { .. } => StatusCode::NOT_FOUND,
        OperationError::ArityMismatch { .. } => StatusCode::BAD_REQUEST,
        OperationError::Procedure { source, .. } => match source {
            ProcedureError::BadArgument(_) | ProcedureError::Rejected { .. } => {
                StatusCode::BAD_REQUEST
            }
            ProcedureError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        OperationError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
        OperationError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        OperationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request refused");
        }
        error_response(status)
    }
}

/// A response with `status` and the JSON string `"error"` as its body.
#[must_use]
pub fn error_response(status: StatusCode) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        ERROR_BODY,
    )
        .into_response()
}
