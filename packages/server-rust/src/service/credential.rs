//! Capability credentials.
//!
//! A credential is an HS256 JWT over `{role, name, uid}` with no time claims.
//! Signing is deterministic, so issuing for the same claims twice yields the
//! same string; that is what lets `sign_in` hand back exactly the value
//! `create_user` returned. Whether the identity behind a verified token still
//! exists is the issuing store's concern, not this module's.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role claim for user credentials.
pub const ROLE_USER: &str = "user";
/// Role claim for admin credentials.
pub const ROLE_ADMIN: &str = "admin";

/// Claims carried by a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub role: String,
    pub name: String,
    /// Per-identity id, regenerated when an identity is re-created.
    pub uid: String,
}

impl Claims {
    #[must_use]
    pub fn new(role: &str, name: &str, uid: &str) -> Self {
        Self {
            role: role.to_string(),
            name: name.to_string(),
            uid: uid.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential must be a string, got {found}")]
    NotAToken { found: &'static str },
    #[error("invalid credential: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies credentials with one process-wide key.
pub struct CredentialIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl CredentialIssuer {
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_aud = false;
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    /// Signs `claims` into a credential string.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Invalid` if encoding fails.
    pub fn issue(&self, claims: &Claims) -> Result<String, CredentialError> {
        Ok(jsonwebtoken::encode(&Header::default(), claims, &self.encoding)?)
    }

    /// Checks the signature of `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Invalid` for malformed or forged tokens.
    pub fn verify(&self, token: &str) -> Result<Claims, CredentialError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    /// Like [`verify`](Self::verify), for a raw argument value.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NotAToken` for non-string values.
    pub fn verify_value(&self, value: &Value) -> Result<Claims, CredentialError> {
        match value {
            Value::String(token) => self.verify(token),
            other => Err(CredentialError::NotAToken {
                found: conduit_core::args::type_name(other),
            }),
        }
    }
}
