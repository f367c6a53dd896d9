//! Operation types flowing through the dispatch pipeline.

use conduit_core::{ArgError, Args, Reply};

/// Context carried with every operation through the pipeline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Process-unique id, assigned at classification.
    pub call_id: u64,
    /// Procedure name, or `"noop"` for `Noop` envelopes.
    pub proc_name: String,
    /// Deadline for the whole operation.
    pub call_timeout_ms: u64,
}

impl OperationContext {
    #[must_use]
    pub fn new(call_id: u64, proc_name: impl Into<String>, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            proc_name: proc_name.into(),
            call_timeout_ms,
        }
    }
}

/// Name recorded in the context of a `Noop` operation.
pub const NOOP_NAME: &str = "noop";

/// Typed operation variants dispatched through the pipeline.
#[derive(Debug)]
pub enum Operation {
    /// Invoke a registered procedure with positional arguments.
    Exec { ctx: OperationContext, args: Args },
    /// Dispatch nothing.
    Noop { ctx: OperationContext },
}

impl Operation {
    /// Returns the operation's context.
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Self::Exec { ctx, .. } | Self::Noop { ctx } => ctx,
        }
    }
}

/// Successful operations answer with the procedure's reply, unchanged.
pub type OperationResponse = Reply;

/// Failures a procedure handler may signal.
///
/// Domain failures are NOT errors; they are returned as [`Reply`] values.
/// These variants mean the call itself was refused.
#[derive(Debug, thiserror::Error)]
pub enum ProcedureError {
    #[error(transparent)]
    BadArgument(#[from] ArgError),
    #[error("rejected: {reason}")]
    Rejected { reason: String },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ProcedureError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Errors returned by the operation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unknown procedure: {name}")]
    UnknownProcedure { name: String },
    #[error("procedure {name} takes {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("procedure {name} refused the call: {source}")]
    Procedure {
        name: String,
        #[source]
        source: ProcedureError,
    },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl OperationError {
    /// Short label used for logs and metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnknownProcedure { .. } => "unknown_procedure",
            Self::ArityMismatch { .. } => "arity_mismatch",
            Self::Procedure {
                source: ProcedureError::Internal(_),
                ..
            }
            | Self::Internal(_) => "internal",
            Self::Procedure { .. } => "rejected",
            Self::Timeout { .. } => "timeout",
            Self::Overloaded => "overloaded",
        }
    }
}

/// Errors from turning a decoded envelope into an `Operation`.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("procedure name must not be empty")]
    EmptyProcedureName,
}
