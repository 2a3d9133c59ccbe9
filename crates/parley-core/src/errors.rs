//! Error hierarchy for the relay.
//!
//! [`RelayError`] covers every failure a session can hit. Each variant maps to
//! an [`ErrorCategory`] that decides how far the failure travels:
//!
//! | Category | Effect |
//! |---|---|
//! | `Transport` | tears down the owning session |
//! | `Decode` | drops one message, pump continues |
//! | `Routing` | unknown receiver is dropped; full queue tears down the slow peer |
//! | `Upstream` | logged and forwarded to the client, session continues |
//! | `Setup` | fails one session-creation attempt, never the process |

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure class of a [`RelayError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Socket read/write failure or unexpected close.
    Transport,
    /// Malformed payload.
    Decode,
    /// Unknown receiver or full outbound queue.
    Routing,
    /// Error event reported by the upstream service.
    Upstream,
    /// Dial, upgrade, or configuration failure while creating a session.
    Setup,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::Routing => "routing",
            Self::Upstream => "upstream",
            Self::Setup => "setup",
        };
        f.write_str(s)
    }
}

/// Top-level error type for the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Socket read or write failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A socket write did not complete within the write timeout.
    #[error("write timed out after {0:?}")]
    WriteTimeout(std::time::Duration),

    /// A payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Receiver id is not registered.
    #[error("unknown receiver: {0}")]
    UnknownReceiver(String),

    /// Receiver's outbound queue is full.
    #[error("outbound queue full for {0}")]
    QueueFull(String),

    /// The upstream service reported an error event.
    #[error("upstream reported error: {0}")]
    Upstream(String),

    /// Could not connect to the upstream service.
    #[error("upstream dial failed: {0}")]
    Dial(String),

    /// Configuration unusable for session creation.
    #[error("configuration error: {0}")]
    Config(String),

    /// The hub control loop has stopped.
    #[error("hub control loop is not running")]
    HubClosed,
}

impl RelayError {
    /// Build a transport error from any displayable error.
    pub fn transport(err: impl fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// Build a dial error from any displayable error.
    pub fn dial(err: impl fmt::Display) -> Self {
        Self::Dial(err.to_string())
    }

    /// Failure class for logging and teardown decisions.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) | Self::WriteTimeout(_) | Self::HubClosed => {
                ErrorCategory::Transport
            }
            Self::Decode(_) => ErrorCategory::Decode,
            Self::UnknownReceiver(_) | Self::QueueFull(_) => ErrorCategory::Routing,
            Self::Upstream(_) => ErrorCategory::Upstream,
            Self::Dial(_) | Self::Config(_) => ErrorCategory::Setup,
        }
    }

    /// Whether this error ends the session that hit it.
    #[must_use]
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::Setup
        )
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
