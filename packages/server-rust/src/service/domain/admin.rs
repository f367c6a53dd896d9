//! Admin credential: one shared password traded for one shared admin token.

use std::sync::Arc;

use conduit_core::Reply;
use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::info;

use super::{ERROR, NOT_ADMIN, YES};
use crate::service::credential::{Claims, CredentialError, CredentialIssuer, ROLE_ADMIN};
use crate::service::registry::{procedure, ProcedureRegistry, RegistryError};

const ADMIN_NAME: &str = "admin";

/// Holds the admin password and the single admin token derived from it.
///
/// The token is signed once, at construction, over fixed claims. Every
/// correct `get_admin` hands out that same value and
/// [`is_admin`](Self::is_admin) accepts nothing else.
pub struct AdminStore {
    password: String,
    token: String,
}

impl AdminStore {
    /// Derives the admin token with `issuer`.
    ///
    /// # Errors
    ///
    /// Propagates signing failures.
    pub fn new(
        password: impl Into<String>,
        issuer: &CredentialIssuer,
    ) -> Result<Self, CredentialError> {
        let token = issuer.issue(&Claims::new(ROLE_ADMIN, ADMIN_NAME, ADMIN_NAME))?;
        Ok(Self {
            password: password.into(),
            token,
        })
    }

    /// Returns the admin token if `password` is correct.
    #[must_use]
    pub fn grant(&self, password: &str) -> Option<&str> {
        if !bool::from(self.password.as_bytes().ct_eq(password.as_bytes())) {
            return None;
        }
        info!("admin credential granted");
        Some(&self.token)
    }

    /// Binary capability check against the admin token.
    #[must_use]
    pub fn is_admin(&self, presented: &Value) -> bool {
        let Value::String(token) = presented else {
            return false;
        };
        bool::from(self.token.as_bytes().ct_eq(token.as_bytes()))
    }
}

/// `get_admin(password)` and `am_i_admin(credential)`.
///
/// # Errors
///
/// Fails if a name is already registered.
pub fn register(
    registry: &mut ProcedureRegistry,
    store: &Arc<AdminStore>,
) -> Result<(), RegistryError> {
    let grant = Arc::clone(store);
    registry.register(
        "get_admin",
        procedure(1, move |args| {
            // Anything other than a string is simply not the password.
            let granted = args.get(0)?.as_str().and_then(|p| grant.grant(p));
            Ok(granted.map_or_else(|| Reply::text(NOT_ADMIN), Reply::text))
        }),
    )?;

    let check = Arc::clone(store);
    registry.register(
        "am_i_admin",
        procedure(1, move |args| {
            Ok(Reply::text(if check.is_admin(args.get(0)?) { YES } else { ERROR }))
        }),
    )
}
