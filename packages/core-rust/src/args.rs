//! Positional procedure arguments.
//!
//! The router checks the argument count before a handler runs, so handlers
//! only deal with per-position shape. Accessors report the offending
//! position so the failure can be logged meaningfully.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Errors from reading a positional argument.
#[derive(Debug, thiserror::Error)]
pub enum ArgError {
    #[error("missing argument at position {index}")]
    Missing { index: usize },
    #[error("argument {index} must be {expected}, got {found}")]
    WrongType {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("argument {index} has the wrong shape: {source}")]
    Shape {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Ordered positional arguments of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the raw value at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgError::Missing`] if there is no argument at `index`.
    pub fn get(&self, index: usize) -> Result<&Value, ArgError> {
        self.0.get(index).ok_or(ArgError::Missing { index })
    }

    /// Borrows the argument at `index` as a string.
    ///
    /// # Errors
    ///
    /// Returns [`ArgError::WrongType`] if the argument is not a JSON string.
    pub fn str(&self, index: usize) -> Result<&str, ArgError> {
        let value = self.get(index)?;
        value.as_str().ok_or(ArgError::WrongType {
            index,
            expected: "a string",
            found: type_name(value),
        })
    }

    /// Reads the argument at `index` as a signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`ArgError::WrongType`] unless the argument is an integer that
    /// fits in `i64`.
    pub fn i64(&self, index: usize) -> Result<i64, ArgError> {
        let value = self.get(index)?;
        value.as_i64().ok_or(ArgError::WrongType {
            index,
            expected: "an integer",
            found: type_name(value),
        })
    }

    /// Deserializes the argument at `index` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgError::Shape`] when the value does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgError> {
        let value = self.get(index)?.clone();
        serde_json::from_value(value).map_err(|source| ArgError::Shape { index, source })
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Short JSON type name used in error messages.
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
