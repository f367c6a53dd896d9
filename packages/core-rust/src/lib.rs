//! Conduit Core: command envelope, reply encoding, and positional arguments.
//!
//! These are the wire types of the Conduit protocol: a client sends an
//! [`Envelope`], the server answers with an encoded [`Reply`].

pub mod args;
pub mod envelope;
pub mod reply;

pub use args::{ArgError, Args};
pub use envelope::{Envelope, EnvelopeError, ExecRequest};
pub use reply::{no_value_marker, Reply};
