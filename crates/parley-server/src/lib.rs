//! # parley-server
//!
//! Relays realtime conversation traffic between end-user WebSocket clients
//! and an upstream realtime AI service.
//!
//! - [`hub`]: the control loop that owns session registration and routes
//!   envelopes between paired endpoints with a bounded, never-blocking
//!   dispatch
//! - [`websocket`]: frame adapters, generic read/write pumps and the
//!   role-specific policies plugged into them
//! - [`dial`]: the upstream connection seam
//! - [`server`]: Axum router, upgrade entry point, health and metrics routes
//! - [`shutdown`]: cancellation and bounded draining of live sessions

#![deny(unsafe_code)]

pub mod config;
pub mod dial;
pub mod health;
pub mod hub;
pub mod keepalive;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use dial::{UpstreamDialer, WsDialer};
pub use hub::{Hub, HubHandle, HubStats};
pub use server::ParleyServer;
