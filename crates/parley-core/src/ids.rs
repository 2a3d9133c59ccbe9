//! Connection identifiers and the per-session identity pair.
//!
//! Every endpoint gets a [`ConnectionId`] of the form
//! `{PREFIX}_{YYYYmmddHHMMSS}_{suffix}` where the prefix names the role
//! (`CLI` for the client-facing side, `AI` for the upstream side) and the
//! suffix is eight random hex characters. The two ids of a session are
//! generated together as a [`SessionIds`] and never change afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which side of a session an endpoint sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user socket accepted by the HTTP upgrade.
    Client,
    /// Socket dialed to the realtime AI service.
    Upstream,
}

impl Role {
    /// The other side of the session.
    #[must_use]
    pub fn counterpart(self) -> Self {
        match self {
            Self::Client => Self::Upstream,
            Self::Upstream => Self::Client,
        }
    }

    /// Identifier prefix for this role.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Client => "CLI",
            Self::Upstream => "AI",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("client"),
            Self::Upstream => f.write_str("upstream"),
        }
    }
}

/// Opaque identifier for one endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh role-prefixed identifier.
    #[must_use]
    pub fn generate(role: Role) -> Self {
        let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{}_{timestamp}_{}", role.prefix(), &random[..8]))
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for ConnectionId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ConnectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<ConnectionId> for String {
    fn from(id: ConnectionId) -> Self {
        id.0
    }
}

/// The identity pair shared by one client endpoint and one upstream endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionIds {
    /// Identifier of the client-facing endpoint.
    pub client: ConnectionId,
    /// Identifier of the upstream-facing endpoint.
    pub upstream: ConnectionId,
}

impl SessionIds {
    /// Generate a fresh pair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            client: ConnectionId::generate(Role::Client),
            upstream: ConnectionId::generate(Role::Upstream),
        }
    }

    /// Identifier of the endpoint playing `role`.
    #[must_use]
    pub fn own(&self, role: Role) -> &ConnectionId {
        match role {
            Role::Client => &self.client,
            Role::Upstream => &self.upstream,
        }
    }

    /// Identifier of the peer of the endpoint playing `role`.
    #[must_use]
    pub fn peer(&self, role: Role) -> &ConnectionId {
        self.own(role.counterpart())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
