//! Procedure registry: name -> handler, filled at startup and frozen after.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use conduit_core::{Args, Reply};

use super::credential::CredentialError;
use super::operation::ProcedureError;

// ---------------------------------------------------------------------------
// Procedure trait
// ---------------------------------------------------------------------------

/// A named unit of server-side logic invoked through `Exec`.
///
/// Handlers are synchronous: every store keeps its state in memory behind its
/// own lock, so no call needs to await anything. The router runs them inside
/// the operation future.
pub trait Procedure: Send + Sync + 'static {
    /// Number of positional arguments the procedure takes. The router rejects
    /// calls with any other count before `call` runs.
    fn arity(&self) -> usize;

    /// Runs the procedure.
    ///
    /// # Errors
    ///
    /// Returns `ProcedureError` when the call itself is refused (bad argument
    /// shape, failed validation). Domain failures are `Ok` replies.
    fn call(&self, args: &Args) -> Result<Reply, ProcedureError>;
}

/// Adapter turning a closure into a [`Procedure`] with a fixed arity.
pub struct FnProcedure<F> {
    arity: usize,
    f: F,
}

impl<F> Procedure for FnProcedure<F>
where
    F: Fn(&Args) -> Result<Reply, ProcedureError> + Send + Sync + 'static,
{
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, args: &Args) -> Result<Reply, ProcedureError> {
        (self.f)(args)
    }
}

/// Wraps a closure as a procedure taking exactly `arity` arguments.
pub fn procedure<F>(arity: usize, f: F) -> FnProcedure<F>
where
    F: Fn(&Args) -> Result<Reply, ProcedureError> + Send + Sync + 'static,
{
    FnProcedure { arity, f }
}

// ---------------------------------------------------------------------------
// ProcedureRegistry
// ---------------------------------------------------------------------------

/// Errors raised while building a registry. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("procedure {name} is registered twice")]
    Duplicate { name: String },
    #[error("procedure name must not be empty")]
    EmptyName,
    #[error("cannot make unregistered procedure {name} private")]
    Unknown { name: String },
    #[error("could not derive a startup credential: {0}")]
    Credential(#[from] CredentialError),
}

/// Whether an external `Exec` may name a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    /// Callable in-process only. The router answers an external call as if
    /// the name were unregistered.
    Private,
}

struct Entry {
    handler: Arc<dyn Procedure>,
    visibility: Visibility,
}

/// Maps procedure names to handlers.
///
/// Built mutably at startup, then shared as `Arc<ProcedureRegistry>`; nothing
/// mutates it afterwards. Lookup is exact and case-sensitive.
#[derive(Default)]
pub struct ProcedureRegistry {
    procs: HashMap<String, Entry>,
}

impl ProcedureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name` as a public procedure.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Duplicate` if the name is taken and
    /// `RegistryError::EmptyName` for an empty name.
    pub fn register<P: Procedure>(
        &mut self,
        name: impl Into<String>,
        handler: P,
    ) -> Result<(), RegistryError> {
        self.register_with(name, Visibility::Public, handler)
    }

    /// Registers `handler` under `name` with the given visibility.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_with<P: Procedure>(
        &mut self,
        name: impl Into<String>,
        visibility: Visibility,
        handler: P,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.procs.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        let handler: Arc<dyn Procedure> = Arc::new(handler);
        self.procs.insert(name, Entry { handler, visibility });
        Ok(())
    }

    /// Marks an already registered procedure private.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unknown` if nothing is registered under `name`.
    pub fn make_private(&mut self, name: &str) -> Result<(), RegistryError> {
        let entry = self.procs.get_mut(name).ok_or_else(|| RegistryError::Unknown {
            name: name.to_string(),
        })?;
        entry.visibility = Visibility::Private;
        Ok(())
    }

    /// Looks up the handler registered under `name`, whatever its visibility.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Procedure>> {
        self.procs.get(name).map(|e| Arc::clone(&e.handler))
    }

    #[must_use]
    pub fn visibility(&self, name: &str) -> Option<Visibility> {
        self.procs.get(name).map(|e| e.visibility)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.procs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.procs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }
}

impl fmt::Debug for ProcedureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureRegistry")
            .field("procs", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo() -> impl Procedure {
        procedure(1, |args| Ok(Reply::Json(args.get(0)?.clone())))
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = ProcedureRegistry::new();
        registry.register("echo", echo()).unwrap();

        let handler = registry.resolve("echo").unwrap();
        assert_eq!(handler.arity(), 1);
        let reply = handler.call(&Args::new(vec![json!(7)])).unwrap();
        assert_eq!(reply, Reply::Json(json!(7)));
    }

    #[test]
    fn resolve_unregistered_returns_none() {
        let registry = ProcedureRegistry::new();
        assert!(registry.resolve("nonexistent").is_none());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut registry = ProcedureRegistry::new();
        registry.register("get_user", echo()).unwrap();
        assert!(registry.resolve("Get_User").is_none());
        assert!(registry.resolve("get_user ").is_none());
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = ProcedureRegistry::new();
        registry.register("echo", echo()).unwrap();
        let err = registry.register("echo", echo()).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { name } if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_name_fails() {
        let mut registry = ProcedureRegistry::new();
        assert!(matches!(
            registry.register("", echo()),
            Err(RegistryError::EmptyName)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn registration_order_does_not_matter() {
        let mut a = ProcedureRegistry::new();
        a.register("x", echo()).unwrap();
        a.register("y", echo()).unwrap();
        let mut b = ProcedureRegistry::new();
        b.register("y", echo()).unwrap();
        b.register("x", echo()).unwrap();
        assert_eq!(a.names(), b.names());
        assert_eq!(a.names(), vec!["x", "y"]);
    }

    #[test]
    fn visibility_is_recorded_per_procedure() {
        let mut registry = ProcedureRegistry::new();
        registry.register("open", echo()).unwrap();
        registry.register_with("hidden", Visibility::Private, echo()).unwrap();
        assert_eq!(registry.visibility("open"), Some(Visibility::Public));
        assert_eq!(registry.visibility("hidden"), Some(Visibility::Private));
        assert_eq!(registry.visibility("missing"), None);
        assert!(registry.resolve("hidden").is_some());
        assert_eq!(registry.names(), vec!["hidden", "open"]);
    }

    #[test]
    fn make_private_requires_a_registered_name() {
        let mut registry = ProcedureRegistry::new();
        registry.register("echo", echo()).unwrap();
        registry.make_private("echo").unwrap();
        assert_eq!(registry.visibility("echo"), Some(Visibility::Private));
        assert!(matches!(
            registry.make_private("ehco"),
            Err(RegistryError::Unknown { name }) if name == "ehco"
        ));
    }
}
