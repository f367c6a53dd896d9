//! `try_fib(depth)`: a stateless arithmetic procedure.

use conduit_core::Reply;
use serde_json::json;

use crate::service::operation::ProcedureError;
use crate::service::registry::{procedure, ProcedureRegistry, RegistryError};

/// Walks the Fibonacci pair `(left, right)` forward `depth` steps and returns
/// `right`. Starting from `(1, 1)`, depth 4 gives 8.
///
/// Returns `None` on overflow.
#[must_use]
pub fn fib(mut left: i64, mut right: i64, depth: u32) -> Option<i64> {
    for _ in 0..depth {
        let next = left.checked_add(right)?;
        left = right;
        right = next;
    }
    Some(right)
}

/// `try_fib(depth)`.
///
/// # Errors
///
/// Fails if the name is already registered.
pub fn register(registry: &mut ProcedureRegistry) -> Result<(), RegistryError> {
    registry.register(
        "try_fib",
        procedure(1, |args| {
            let depth = u32::try_from(args.i64(0)?)
                .map_err(|_| ProcedureError::rejected("depth must be non-negative"))?;
            let value = fib(1, 1, depth).ok_or_else(|| ProcedureError::rejected("overflow"))?;
            Ok(Reply::Json(json!(value)))
        }),
    )
}

#[cfg(test)]
mod tests {
    use conduit_core::Args;

    use super::*;

    #[test]
    fn matches_client_reference() {
        assert_eq!(fib(1, 1, 0), Some(1));
        assert_eq!(fib(1, 1, 1), Some(2));
        assert_eq!(fib(1, 1, 4), Some(8));
        assert_eq!(fib(1, 1, 10), Some(144));
    }

    #[test]
    fn overflow_is_detected() {
        assert_eq!(fib(1, 1, 200), None);
    }

    #[test]
    fn procedure_validates_depth() {
        let mut registry = ProcedureRegistry::new();
        register(&mut registry).unwrap();
        let handler = registry.resolve("try_fib").unwrap();

        assert_eq!(
            handler.call(&Args::new(vec![json!(4)])).unwrap(),
            Reply::Json(json!(8))
        );
        assert!(handler.call(&Args::new(vec![json!(-1)])).is_err());
        assert!(handler.call(&Args::new(vec![json!(500)])).is_err());
        assert!(handler.call(&Args::new(vec![json!("4")])).is_err());
    }
}
