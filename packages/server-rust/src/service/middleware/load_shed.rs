//! Load shedding for `Exec` operations.
//!
//! At most `max_concurrent_operations` procedure calls run at once. A call
//! arriving when every slot is taken fails with `OperationError::Overloaded`
//! (503) instead of waiting. `Noop` envelopes never reach a procedure and are
//! not counted.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::Semaphore;
use tower::{Layer, Service};
use tracing::warn;

use crate::service::operation::{Operation, OperationError, OperationResponse};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

/// Shares one slot pool between every service it wraps.
#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    slots: Arc<Semaphore>,
    limit: u32,
}

impl LoadShedLayer {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(limit as usize)),
            limit,
        }
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            slots: Arc::clone(&self.slots),
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    slots: Arc<Semaphore>,
    limit: u32,
}

impl<S> LoadShedService<S> {
    /// Slots not currently held by a running call.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

impl<S> Service<Operation> for LoadShedService<S>
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
        if let Operation::Noop { .. } = op {
            return Box::pin(self.inner.call(op));
        }

        // The slot is taken here, before the future is first polled.
        let Ok(slot) = Arc::clone(&self.slots).try_acquire_owned() else {
            let ctx = op.ctx();
            warn!(
                proc = %ctx.proc_name,
                call_id = ctx.call_id,
                limit = self.limit,
                "shedding call"
            );
            ::metrics::counter!("conduit_operations_shed_total").increment(1);
            return Box::pin(async { Err(OperationError::Overloaded) });
        };

        let fut = self.inner.call(op);
        Box::pin(async move {
            let _slot = slot;
            fut.await
        })
    }
}
