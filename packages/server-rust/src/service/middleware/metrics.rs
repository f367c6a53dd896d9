//! Metrics middleware for operations.
//!
//! Records operation duration and outcome in a `tracing` span and through the
//! `metrics` facade (`conduit_operations_total`,
//! `conduit_operation_duration_seconds`). Without an installed recorder the
//! facade calls are no-ops.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::{Operation, OperationError, OperationResponse};

/// Label used in place of client-supplied names that resolved to nothing,
/// so arbitrary input cannot grow label cardinality.
const UNKNOWN_PROC_LABEL: &str = "<unknown>";

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments operations with timing and counting.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records operation duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<Operation> for MetricsService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let proc_name = op.ctx().proc_name.clone();
        let call_id = op.ctx().call_id;

        let span = info_span!(
            "operation",
            proc = %proc_name,
            call_id = call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(op);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(e) => e.label(),
                };
                let proc_label = match &result {
                    Err(OperationError::UnknownProcedure { .. }) => UNKNOWN_PROC_LABEL.to_string(),
                    _ => proc_name,
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                ::metrics::counter!(
                    "conduit_operations_total",
                    "proc" => proc_label.clone(),
                    "outcome" => outcome
                )
                .increment(1);
                ::metrics::histogram!("conduit_operation_duration_seconds", "proc" => proc_label)
                    .record(elapsed.as_secs_f64());

                tracing::debug!(call_id, duration_ms, outcome, "operation complete");

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
