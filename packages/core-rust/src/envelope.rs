//! The command envelope every client sends: `{"kind": ..., "data": ...}`.
//!
//! Decoding happens in two steps. The outer shape is read with `kind` as a
//! free string so that an unrecognised kind surfaces as
//! [`EnvelopeError::UnknownKind`] instead of a generic parse failure; the
//! `data` payload is then decoded according to the kind.

use serde::Deserialize;
use serde_json::Value;

/// Kind tag for [`Envelope::Exec`].
pub const KIND_EXEC: &str = "Exec";
/// Kind tag for [`Envelope::Noop`].
pub const KIND_NOOP: &str = "Noop";

/// A decoded command envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Does nothing; answered with `null`.
    Noop,
    /// Invoke a named procedure with positional arguments.
    Exec(ExecRequest),
}

/// Payload of an `Exec` envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecRequest {
    /// Registered procedure name. Matched exactly, case-sensitive.
    pub proc: String,
    /// Positional arguments, in call order.
    pub arg: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    kind: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Errors from decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown command kind: {kind}")]
    UnknownKind { kind: String },
    #[error("`{kind}` envelope is missing its data payload")]
    MissingData { kind: &'static str },
}

impl Envelope {
    /// Builds an `Exec` envelope.
    #[must_use]
    pub fn exec(proc: impl Into<String>, arg: Vec<Value>) -> Self {
        Self::Exec(ExecRequest {
            proc: proc.into(),
            arg,
        })
    }

    /// Decodes an envelope from a raw JSON request body.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::Malformed`] if the body is not JSON, lacks `kind`,
    ///   or an `Exec` payload lacks `proc` or a sequence-typed `arg`
    /// - [`EnvelopeError::UnknownKind`] for any kind other than `Exec`/`Noop`
    /// - [`EnvelopeError::MissingData`] for an `Exec` without `data`
    pub fn decode(body: &[u8]) -> Result<Self, EnvelopeError> {
        let raw: RawEnvelope = serde_json::from_slice(body)?;
        match raw.kind.as_str() {
            KIND_NOOP => Ok(Self::Noop),
            KIND_EXEC => {
                let data = raw
                    .data
                    .ok_or(EnvelopeError::MissingData { kind: KIND_EXEC })?;
                Ok(Self::Exec(serde_json::from_value(data)?))
            }
            _ => Err(EnvelopeError::UnknownKind { kind: raw.kind }),
        }
    }
}
