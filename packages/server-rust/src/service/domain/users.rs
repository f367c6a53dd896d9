//! User registry and the account procedures built on it.
//!
//! Three account flavours share one store type:
//! - token accounts: `create_user(name)` answers a credential
//! - named accounts: `create_user(name)` answers `"user created"`
//! - password accounts: `create_user(name, password)` / `sign_in(name, password)`
//!
//! Every created user gets a fresh `uid`. Credentials embed it, and
//! [`UserStore::authenticate`] requires it to match the live record, so
//! deleting a user retracts every credential issued for it, including after
//! the name is registered again.

use std::sync::Arc;

use conduit_core::Reply;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use super::{credential_reply, INVALID_CREDENTIALS, USER_ALREADY_EXISTS, USER_CREATED};
use crate::service::credential::{Claims, CredentialError, CredentialIssuer, ROLE_USER};
use crate::service::registry::{procedure, ProcedureRegistry, RegistryError};

/// A registered identity.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub name: String,
    pub uid: String,
    password_digest: Option<[u8; 32]>,
}

impl UserRecord {
    /// Public view returned by `get_user`.
    #[must_use]
    pub fn to_reply(&self) -> Reply {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        Reply::Record(map)
    }
}

fn password_digest(uid: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(uid.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Users keyed by name.
///
/// `create` is an atomic check-and-insert on the name's map entry: of any
/// number of concurrent creations of one name, exactly one succeeds.
pub struct UserStore {
    users: DashMap<String, UserRecord>,
    issuer: Arc<CredentialIssuer>,
}

impl UserStore {
    #[must_use]
    pub fn new(issuer: Arc<CredentialIssuer>) -> Self {
        Self {
            users: DashMap::new(),
            issuer,
        }
    }

    /// Creates `name`, or returns `None` if it is taken.
    pub fn create(&self, name: &str, password: Option<&str>) -> Option<UserRecord> {
        match self.users.entry(name.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let uid = uuid::Uuid::new_v4().to_string();
                let record = UserRecord {
                    name: name.to_string(),
                    password_digest: password.map(|p| password_digest(&uid, p)),
                    uid,
                };
                slot.insert(record.clone());
                debug!(user = name, "user created");
                Some(record)
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<UserRecord> {
        self.users.get(name).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.users.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Issues the credential for `record`. Same record, same credential.
    ///
    /// # Errors
    ///
    /// Propagates signing failures.
    pub fn credential_for(&self, record: &UserRecord) -> Result<String, CredentialError> {
        self.issuer
            .issue(&Claims::new(ROLE_USER, &record.name, &record.uid))
    }

    /// Checks `password` against the stored digest of `name`.
    ///
    /// Unknown users, password-less users, and wrong passwords all give `None`.
    #[must_use]
    pub fn sign_in(&self, name: &str, password: &str) -> Option<UserRecord> {
        let record = self.get(name)?;
        let stored = record.password_digest?;
        let presented = password_digest(&record.uid, password);
        if bool::from(stored[..].ct_eq(&presented[..])) {
            Some(record)
        } else {
            None
        }
    }

    /// Resolves a presented credential to its live user.
    ///
    /// Fails for forged tokens, non-user roles, deleted users, and users
    /// re-created after the token was issued.
    #[must_use]
    pub fn authenticate(&self, credential: &Value) -> Option<UserRecord> {
        let claims = self.issuer.verify_value(credential).ok()?;
        if claims.role != ROLE_USER {
            return None;
        }
        self.get(&claims.name).filter(|record| record.uid == claims.uid)
    }

    /// Deletes the user a credential was issued for.
    ///
    /// Returns `false`, changing nothing, if the credential does not match a
    /// live user.
    pub fn delete(&self, credential: &Value) -> bool {
        let Ok(claims) = self.issuer.verify_value(credential) else {
            return false;
        };
        if claims.role != ROLE_USER {
            return false;
        }
        let removed = self
            .users
            .remove_if(&claims.name, |_, record| record.uid == claims.uid)
            .is_some();
        if removed {
            debug!(user = %claims.name, "user deleted");
        }
        removed
    }
}

// ---------------------------------------------------------------------------
// Procedures
// ---------------------------------------------------------------------------

/// `get_user(name)`: the user record, or the no-value marker.
///
/// # Errors
///
/// Fails if the name is already registered.
pub fn register_get_user(
    registry: &mut ProcedureRegistry,
    store: &Arc<UserStore>,
) -> Result<(), RegistryError> {
    let store = Arc::clone(store);
    registry.register(
        "get_user",
        procedure(1, move |args| {
            Ok(store
                .get(args.str(0)?)
                .map_or(Reply::NoValue, |record| record.to_reply()))
        }),
    )
}

/// Token accounts: `create_user(name)` and `delete_user(credential)`.
///
/// # Errors
///
/// Fails if a name is already registered.
pub fn register_token_accounts(
    registry: &mut ProcedureRegistry,
    store: &Arc<UserStore>,
) -> Result<(), RegistryError> {
    let create = Arc::clone(store);
    registry.register(
        "create_user",
        procedure(1, move |args| match create.create(args.str(0)?, None) {
            Some(record) => credential_reply(create.credential_for(&record)),
            None => Ok(Reply::text(USER_ALREADY_EXISTS)),
        }),
    )?;

    let delete = Arc::clone(store);
    registry.register(
        "delete_user",
        procedure(1, move |args| {
            if delete.delete(args.get(0)?) {
                Ok(Reply::Unit)
            } else {
                Ok(Reply::text(INVALID_CREDENTIALS))
            }
        }),
    )
}

/// Named accounts: `create_user(name)` answering `"user created"`.
///
/// # Errors
///
/// Fails if the name is already registered.
pub fn register_named_accounts(
    registry: &mut ProcedureRegistry,
    store: &Arc<UserStore>,
) -> Result<(), RegistryError> {
    let store = Arc::clone(store);
    registry.register(
        "create_user",
        procedure(1, move |args| {
            Ok(match store.create(args.str(0)?, None) {
                Some(_) => Reply::text(USER_CREATED),
                None => Reply::text(USER_ALREADY_EXISTS),
            })
        }),
    )
}

/// Password accounts: `create_user(name, password)` and
/// `sign_in(name, password)`, both answering the same credential.
///
/// # Errors
///
/// Fails if a name is already registered.
pub fn register_password_accounts(
    registry: &mut ProcedureRegistry,
    store: &Arc<UserStore>,
) -> Result<(), RegistryError> {
    let create = Arc::clone(store);
    registry.register(
        "create_user",
        procedure(2, move |args| {
            match create.create(args.str(0)?, Some(args.str(1)?)) {
                Some(record) => credential_reply(create.credential_for(&record)),
                None => Ok(Reply::text(USER_ALREADY_EXISTS)),
            }
        }),
    )?;

    let sign_in = Arc::clone(store);
    registry.register(
        "sign_in",
        procedure(2, move |args| {
            match sign_in.sign_in(args.str(0)?, args.str(1)?) {
                Some(record) => credential_reply(sign_in.credential_for(&record)),
                None => Ok(Reply::text(INVALID_CREDENTIALS)),
            }
        }),
    )
}
