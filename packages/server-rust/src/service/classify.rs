//! Envelope classification: converts a decoded `Envelope` into an `Operation`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use conduit_core::{Args, Envelope};

use super::config::ServerConfig;
use super::operation::{ClassifyError, Operation, OperationContext, NOOP_NAME};

/// Classifies decoded envelopes into typed `Operation` values.
///
/// Each call gets a unique call ID and the configured default timeout.
pub struct OperationService {
    config: Arc<ServerConfig>,
    call_id_counter: AtomicU64,
}

impl OperationService {
    #[must_use]
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            config,
            call_id_counter: AtomicU64::new(1),
        }
    }

    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn make_ctx(&self, proc_name: impl Into<String>) -> OperationContext {
        OperationContext::new(
            self.next_call_id(),
            proc_name,
            self.config.default_operation_timeout_ms,
        )
    }

    /// Classify an `Envelope` into an `Operation`.
    ///
    /// # Errors
    ///
    /// Returns `ClassifyError::EmptyProcedureName` for an `Exec` naming no
    /// procedure.
    pub fn classify(&self, envelope: Envelope) -> Result<Operation, ClassifyError> {
        match envelope {
            Envelope::Noop => Ok(Operation::Noop {
                ctx: self.make_ctx(NOOP_NAME),
            }),
            Envelope::Exec(req) => {
                if req.proc.is_empty() {
                    return Err(ClassifyError::EmptyProcedureName);
                }
                Ok(Operation::Exec {
                    ctx: self.make_ctx(req.proc),
                    args: Args::new(req.arg),
                })
            }
        }
    }
}
