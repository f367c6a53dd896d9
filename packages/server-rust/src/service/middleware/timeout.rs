//! Per-operation deadline.
//!
//! Each operation carries its own `call_timeout_ms`, assigned at
//! classification. Past it the call fails with `OperationError::Timeout`
//! (408). The metrics layer sits inside this one and is dropped with the
//! call, so the timeout is counted here.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::{Layer, Service};
use tracing::warn;

use crate::service::operation::{Operation, OperationError, OperationResponse};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

#[derive(Debug, Clone)]
pub struct TimeoutLayer;

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
}

impl<S> Service<Operation> for TimeoutService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let ctx = op.ctx();
        let (proc_name, call_id, timeout_ms) = (ctx.proc_name.clone(), ctx.call_id, ctx.call_timeout_ms);
        let fut = self.inner.call(op);
        Box::pin(async move {
            if let Ok(result) = tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
                return result;
            }
            let err = OperationError::Timeout { timeout_ms };
            warn!(proc = %proc_name, call_id, timeout_ms, "operation deadline passed");
            ::metrics::counter!(
                "conduit_operations_total",
                "proc" => proc_name,
                "outcome" => err.label()
            )
            .increment(1);
            Err(err)
        })
    }
}
