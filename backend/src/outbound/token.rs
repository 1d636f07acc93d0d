//! Opaque random session tokens.

use std::sync::Arc;

use chrono::TimeDelta;
use mockable::Clock;
use rand::Rng;

use crate::domain::ports::{IssuedToken, TokenClaims, TokenIssuer};

const TOKEN_BYTES: usize = 32;

/// [`TokenIssuer`] handing out random hex tokens.
///
/// Tokens carry no claims; the account's stored active token is the source
/// of truth for session lookups.
pub struct OpaqueTokenIssuer {
    clock: Arc<dyn Clock>,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl OpaqueTokenIssuer {
    /// Issuer with one-hour access tokens and thirty-day refresh tokens.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            access_ttl: TimeDelta::hours(1),
            refresh_ttl: TimeDelta::days(30),
        }
    }

    /// Override the token lifetimes.
    pub fn with_lifetimes(mut self, access_ttl: TimeDelta, refresh_ttl: TimeDelta) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }
}

impl TokenIssuer for OpaqueTokenIssuer {
    fn generate(&self, claims: &TokenClaims) -> Option<IssuedToken> {
        if !claims.user_id.is_assigned() {
            return None;
        }
        let ttl = if claims.is_refresh {
            self.refresh_ttl
        } else {
            self.access_ttl
        };
        let expires_at = self.clock.utc().checked_add_signed(ttl)?;
        let mut bytes = [0_u8; TOKEN_BYTES];
        rand::thread_rng().fill(&mut bytes);
        Some(IssuedToken {
            token: hex::encode(bytes),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for token expiry and uniqueness.
    use super::*;
    use crate::domain::{EntityId, Role};
    use crate::test_support::{MutableClock, sample_now};
    use rstest::rstest;

    fn claims(user_id: EntityId, is_refresh: bool) -> TokenClaims {
        TokenClaims {
            user_id,
            username: "ada".to_owned(),
            email: "ada@example.com".to_owned(),
            role: Role::Member,
            is_refresh,
        }
    }

    #[rstest]
    #[case(false, TimeDelta::hours(1))]
    #[case(true, TimeDelta::days(30))]
    fn expiry_follows_token_kind(#[case] is_refresh: bool, #[case] ttl: TimeDelta) {
        let issuer = OpaqueTokenIssuer::new(Arc::new(MutableClock::new(sample_now())));

        let issued = issuer
            .generate(&claims(EntityId::random(), is_refresh))
            .expect("token");

        assert_eq!(issued.expires_at, sample_now() + ttl);
        assert_eq!(issued.token.len(), TOKEN_BYTES * 2);
    }

    #[rstest]
    fn tokens_are_unique() {
        let issuer = OpaqueTokenIssuer::new(Arc::new(MutableClock::new(sample_now())));
        let user = EntityId::random();

        let first = issuer.generate(&claims(user, false)).expect("token");
        let second = issuer.generate(&claims(user, false)).expect("token");

        assert_ne!(first.token, second.token);
    }

    #[rstest]
    fn unassigned_users_get_no_token() {
        let issuer = OpaqueTokenIssuer::new(Arc::new(MutableClock::new(sample_now())));
        assert!(issuer.generate(&claims(EntityId::unassigned(), false)).is_none());
    }
}
