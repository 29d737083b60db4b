use serde::{Deserialize, Serialize};
use std::fmt;

/// Id carried by the sentinel identity of a session that could not sign in.
pub const FAILED_IDENTITY_ID: &str = "unresolved";

/// A principal as reported by a credential provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// How an identity was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityOrigin {
    Existing,
    TokenExchanged,
    Anonymous,
    Failed,
}

impl fmt::Display for IdentityOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IdentityOrigin::Existing => "existing",
            IdentityOrigin::TokenExchanged => "token-exchanged",
            IdentityOrigin::Anonymous => "anonymous",
            IdentityOrigin::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// The resolved user principal of this process.
///
/// Immutable once built; a new sign-in produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    id: String,
    origin: IdentityOrigin,
}

impl Identity {
    pub fn new(principal: Principal, origin: IdentityOrigin) -> Self {
        Self {
            id: principal.id,
            origin,
        }
    }

    /// Sentinel presented when every resolution strategy failed.
    pub fn failed() -> Self {
        Self {
            id: FAILED_IDENTITY_ID.to_string(),
            origin: IdentityOrigin::Failed,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn origin(&self) -> IdentityOrigin {
        self.origin
    }

    pub fn is_failed(&self) -> bool {
        self.origin == IdentityOrigin::Failed
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.origin)
    }
}
