//! # parley-core
//!
//! Foundation types shared by every Parley crate.
//!
//! - **Identity pairs**: [`ConnectionId`], [`Role`], [`SessionIds`] for the two
//!   endpoints of a relayed session
//! - **Envelopes**: [`Envelope`] and [`EnvelopeKind`], the unit routed by the hub
//! - **Errors**: [`RelayError`] with a [`ErrorCategory`] per failure class
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber
//! - **Constants**: queue capacity and keepalive timing defaults

#![deny(unsafe_code)]

pub mod constants;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod logging;

pub use envelope::{Envelope, EnvelopeKind};
pub use errors::{ErrorCategory, RelayError, Result};
pub use ids::{ConnectionId, Role, SessionIds};
