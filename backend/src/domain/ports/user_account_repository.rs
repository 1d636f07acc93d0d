//! Port for user account persistence.
//!
//! Accounts use the generic [`Repository`] contract plus two targeted
//! writes: an atomic compare-and-clear for one-time codes, so two concurrent
//! redemptions of the same code cannot both succeed, and column-level
//! changes that never write back a stale copy of the whole row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AccountChanges, CodePurpose, EntityId, UserAccount};

use super::{Repository, RepositoryError};

/// User account repository.
#[async_trait]
pub trait UserAccountRepository: Repository<UserAccount> {
    /// Clear the `purpose` code of a live account if it equals `code` and has
    /// not expired at `now`, in one atomic step.
    ///
    /// Returns `false` when the stored code is absent, different or expired,
    /// including when a concurrent caller redeemed it first.
    async fn consume_code(
        &self,
        user_id: EntityId,
        purpose: CodePurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Write only the columns `changes` sets on a live account, stamping the
    /// update audit columns, and return the stored account.
    ///
    /// Fails with [`RepositoryError::NotFound`] when the account is missing
    /// or soft-deleted.
    async fn apply_changes(
        &self,
        user_id: EntityId,
        changes: &AccountChanges,
        actor: Option<EntityId>,
    ) -> Result<UserAccount, RepositoryError>;
}
