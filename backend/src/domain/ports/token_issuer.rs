//! Port for session token issuance.

use chrono::{DateTime, Utc};

use crate::domain::{EntityId, Role};

/// Claims embedded in an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: EntityId,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Whether the token is a long-lived refresh token.
    pub is_refresh: bool,
}

/// An opaque, serialisable token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Serialised token handed to the client and stored as the active token.
    pub token: String,
    /// Instant after which the token is no longer accepted.
    pub expires_at: DateTime<Utc>,
}

/// Token issuing collaborator; `None` signals that issuance failed.
#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    /// Issue a token for `claims`.
    fn generate(&self, claims: &TokenClaims) -> Option<IssuedToken>;
}
