//! Procedure handlers and the stores they own.
//!
//! Each store keeps its state behind its own lock, so unrelated stores never
//! contend. Domain failures are returned as plain string replies; the
//! strings below are part of the wire contract.

pub mod admin;
pub mod feed;
pub mod fib;
pub mod messaging;
pub mod users;
pub mod validators;

use conduit_core::Reply;

use super::credential::CredentialError;
use super::operation::ProcedureError;

pub const USER_ALREADY_EXISTS: &str = "user already exists";
pub const USER_CREATED: &str = "user created";
pub const USER_DOES_NOT_EXIST: &str = "user does not exist";
pub const INVALID_CREDENTIALS: &str = "invalid credentials";
pub const CREATED: &str = "created";
pub const GROUP_ALREADY_EXISTS: &str = "group already exists";
pub const GROUP_DOES_NOT_EXIST: &str = "group does not exist";
pub const NOT_A_GROUP_MEMBER: &str = "not a group member";
pub const NOT_ADMIN: &str = "not admin";
pub const YES: &str = "yes";
pub const ERROR: &str = "error";

/// Turns a freshly issued credential into a reply. Signing failures are
/// server faults, not domain outcomes.
fn credential_reply(issued: Result<String, CredentialError>) -> Result<Reply, ProcedureError> {
    issued
        .map(Reply::Str)
        .map_err(|e| ProcedureError::Internal(e.into()))
}
