//! WebSocket endpoints.
//!
//! Every session has two endpoints, each driven by a read pump and a write
//! pump from [`endpoint`]. What differs between the client side and the
//! upstream side is plugged in as a policy:
//!
//! - [`client`]: forwards client frames untouched, writes upstream events back
//! - [`upstream`]: decodes service events, translates client requests and
//!   runs the session bootstrap
//!
//! [`session`] wires the four pumps together; [`frame`] hides the two socket
//! libraries behind one frame type.

pub mod client;
pub mod endpoint;
pub mod frame;
pub mod session;
pub mod upstream;
