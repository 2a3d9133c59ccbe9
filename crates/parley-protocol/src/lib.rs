//! # parley-protocol
//!
//! Wire schemas for both sides of a relayed session and the pure logic that
//! connects them.
//!
//! - [`client`]: messages the end-user socket sends ([`ClientRequest`])
//! - [`upstream`]: commands sent to the realtime service ([`UpstreamCommand`])
//!   and events received from it ([`ServerEvent`])
//! - [`translate`]: client request to upstream command mapping
//! - [`bootstrap`]: per-session configuration state machine
//! - [`templates`]: default session instructions

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod client;
pub mod templates;
pub mod translate;
pub mod upstream;

pub use bootstrap::{SessionBootstrap, SessionState};
pub use client::ClientRequest;
pub use translate::{session_update, translate};
pub use upstream::{
    ErrorDetail, ResponseOptions, ServerEvent, SessionConfig, TurnDetection, UpstreamCommand,
};
