//! Command routing: resolves the named procedure and invokes it positionally.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use conduit_core::Reply;
use tower::Service;
use tracing::{debug, warn};

use super::operation::{Operation, OperationError, OperationResponse};
use super::registry::{ProcedureRegistry, Visibility};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

// ---------------------------------------------------------------------------
// CommandRouter
// ---------------------------------------------------------------------------

/// Routes `Operation` values to the procedure registered under their name.
///
/// - `Noop` answers `Reply::Unit` without touching the registry.
/// - `Exec` with an unregistered or private name returns
///   `OperationError::UnknownProcedure`.
/// - `Exec` with the wrong number of arguments returns
///   `OperationError::ArityMismatch`; the handler never sees it.
///
/// The handler's reply is passed through unchanged.
#[derive(Clone)]
pub struct CommandRouter {
    registry: Arc<ProcedureRegistry>,
}

impl CommandRouter {
    #[must_use]
    pub fn new(registry: Arc<ProcedureRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ProcedureRegistry> {
        &self.registry
    }

    /// Dispatches one operation synchronously.
    ///
    /// # Errors
    ///
    /// Returns a routing error or the handler's refusal, see the type docs.
    pub fn dispatch(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        let (ctx, args) = match op {
            Operation::Noop { .. } => return Ok(Reply::Unit),
            Operation::Exec { ctx, args } => (ctx, args),
        };

        let handler = match self.registry.visibility(&ctx.proc_name) {
            Some(Visibility::Public) => self.registry.resolve(&ctx.proc_name),
            Some(Visibility::Private) => {
                warn!(
                    proc = %ctx.proc_name,
                    call_id = ctx.call_id,
                    "private procedure invoked externally"
                );
                None
            }
            None => {
                warn!(proc = %ctx.proc_name, call_id = ctx.call_id, "unknown procedure");
                None
            }
        };
        let Some(handler) = handler else {
            return Err(OperationError::UnknownProcedure {
                name: ctx.proc_name,
            });
        };

        let expected = handler.arity();
        if args.len() != expected {
            warn!(
                proc = %ctx.proc_name,
                expected,
                got = args.len(),
                "argument count mismatch"
            );
            return Err(OperationError::ArityMismatch {
                name: ctx.proc_name,
                expected,
                got: args.len(),
            });
        }

        handler.call(&args).map_err(|source| {
            debug!(proc = %ctx.proc_name, error = %source, "procedure refused call");
            OperationError::Procedure {
                name: ctx.proc_name,
                source,
            }
        })
    }
}

impl Service<Operation> for CommandRouter {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let router = self.clone();
        Box::pin(async move { router.dispatch(op) })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
