//! PostgreSQL-backed [`UserAccountRepository`] adapter.
//!
//! Deletion policy is enforced by foreign keys declared in the migrations;
//! a delete blocked by a restricting key surfaces as
//! [`RepositoryError::Restricted`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;
use mockable::Clock;
use pagination::{PageRequest, Paginated};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{Repository, RepositoryError, UserAccountRepository};
use crate::domain::{
    AccountChanges, CodePurpose, Entity, EntityId, Filter, QueryOptions, UserAccount,
    UserAccountField,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{UserAccountRow, UserAccountUpdate};
use super::pool::DbPool;
use super::schema::users;
use super::user_account_query::{check_includes, filtered, ordered, windowed};

type Result<T> = std::result::Result<T, RepositoryError>;

/// Diesel-backed user account repository.
#[derive(Clone)]
pub struct DieselUserAccountRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselUserAccountRepository {
    /// Create a new repository backed by `pool`, stamping audit columns from
    /// `clock`.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn diesel_error(error: DieselError) -> RepositoryError {
    map_diesel_error(error, UserAccount::KIND, None)
}

fn to_domain(rows: Vec<UserAccountRow>) -> Result<Vec<UserAccount>> {
    rows.into_iter()
        .map(UserAccount::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(RepositoryError::query)
}

fn uuids(ids: &[EntityId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

fn count_of(rows: usize) -> u64 {
    u64::try_from(rows).unwrap_or(u64::MAX)
}

fn stamp_new(mut account: UserAccount, now: DateTime<Utc>, actor: Option<EntityId>) -> UserAccount {
    if !account.id.is_assigned() {
        account.id = EntityId::random();
    }
    account.audit.mark_created(now, actor);
    account
}

/// Conditional update clearing a code slot only while it still holds `code`
/// and has not expired.
macro_rules! consume_slot {
    ($conn:expr, $target:expr, $code_column:expr, $expiry_column:expr, $code:expr, $now:expr) => {
        diesel::update(
            $target
                .filter($code_column.eq($code))
                .filter($expiry_column.ge($now)),
        )
        .set((
            $code_column.eq(None::<String>),
            $expiry_column.eq(None::<DateTime<Utc>>),
        ))
        .execute($conn)
        .await
    };
}

#[async_trait]
impl Repository<UserAccount> for DieselUserAccountRepository {
    async fn get_all(
        &self,
        filter: &Filter<UserAccountField>,
        options: &QueryOptions<UserAccountField>,
    ) -> Result<Vec<UserAccount>> {
        check_includes(options)?;
        let query = ordered(filtered(filter)?, options);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserAccountRow> = query
            .select(UserAccountRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        to_domain(rows)
    }

    async fn get_all_paginated(
        &self,
        filter: &Filter<UserAccountField>,
        options: &QueryOptions<UserAccountField>,
        page: PageRequest,
    ) -> Result<Paginated<UserAccount>> {
        check_includes(options)?;
        let total = self.count(filter).await?;
        let Some(query) = windowed(ordered(filtered(filter)?, options), page.window()) else {
            return Ok(Paginated::new(Vec::new(), page, total));
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserAccountRow> = query
            .select(UserAccountRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(Paginated::new(to_domain(rows)?, page, total))
    }

    async fn get(
        &self,
        filter: &Filter<UserAccountField>,
        options: &QueryOptions<UserAccountField>,
    ) -> Result<Option<UserAccount>> {
        check_includes(options)?;
        let query = ordered(filtered(filter)?, options);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserAccountRow> = query
            .select(UserAccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(UserAccount::try_from)
            .transpose()
            .map_err(RepositoryError::query)
    }

    async fn count(&self, filter: &Filter<UserAccountField>) -> Result<u64> {
        let query = filtered(filter)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = query
            .select(diesel::dsl::count_star())
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn add(&self, account: UserAccount, actor: Option<EntityId>) -> Result<UserAccount> {
        let account = stamp_new(account, self.clock.utc(), actor);
        let row = UserAccountRow::from(&account);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(account)
    }

    async fn add_range(
        &self,
        accounts: Vec<UserAccount>,
        actor: Option<EntityId>,
    ) -> Result<Vec<UserAccount>> {
        if accounts.is_empty() {
            return Ok(accounts);
        }
        let now = self.clock.utc();
        let accounts: Vec<UserAccount> = accounts
            .into_iter()
            .map(|account| stamp_new(account, now, actor))
            .collect();
        let rows: Vec<UserAccountRow> = accounts.iter().map(UserAccountRow::from).collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(&rows)
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(accounts)
    }

    async fn update(&self, mut account: UserAccount, actor: Option<EntityId>) -> Result<UserAccount> {
        account.audit.mark_updated(self.clock.utc(), actor);
        let changes = UserAccountUpdate::of(&account);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserAccountRow> = diesel::update(
            users::table
                .filter(users::id.eq(*account.id.as_uuid()))
                .filter(users::is_deleted.eq(false)),
        )
        .set(&changes)
        .returning(UserAccountRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(diesel_error)?;
        let row = row.ok_or_else(|| RepositoryError::not_found(UserAccount::KIND, account.id))?;
        UserAccount::try_from(row).map_err(RepositoryError::query)
    }

    async fn soft_delete(&self, id: EntityId, actor: Option<EntityId>) -> Result<()> {
        match self.soft_delete_matching(&[id], actor).await? {
            0 => Err(RepositoryError::not_found(UserAccount::KIND, id)),
            _ => Ok(()),
        }
    }

    async fn soft_delete_matching(
        &self,
        ids: &[EntityId],
        actor: Option<EntityId>,
    ) -> Result<u64> {
        let now = self.clock.utc();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let flagged = diesel::update(
            users::table
                .filter(users::id.eq_any(uuids(ids)))
                .filter(users::is_deleted.eq(false)),
        )
        .set((
            users::is_deleted.eq(true),
            users::deleted_at.eq(Some(now)),
            users::deleted_by.eq(actor.map(|actor| *actor.as_uuid())),
        ))
        .execute(&mut conn)
        .await
        .map_err(diesel_error)?;
        debug!(flagged, "soft deleted user accounts");
        Ok(count_of(flagged))
    }

    async fn hard_delete(&self, id: EntityId) -> Result<()> {
        match self.hard_delete_matching(&[id]).await? {
            0 => Err(RepositoryError::not_found(UserAccount::KIND, id)),
            _ => Ok(()),
        }
    }

    async fn hard_delete_matching(&self, ids: &[EntityId]) -> Result<u64> {
        let Some(first) = ids.first().copied() else {
            return Ok(0);
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(users::table.filter(users::id.eq_any(uuids(ids))))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, UserAccount::KIND, Some(first)))?;
        debug!(removed, "hard deleted user accounts");
        Ok(count_of(removed))
    }
}

#[async_trait]
impl UserAccountRepository for DieselUserAccountRepository {
    async fn consume_code(
        &self,
        user_id: EntityId,
        purpose: CodePurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let target = users::table
            .filter(users::id.eq(*user_id.as_uuid()))
            .filter(users::is_deleted.eq(false));
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let cleared = match purpose {
            CodePurpose::Mfa => consume_slot!(
                &mut conn,
                target,
                users::mfa_code,
                users::mfa_code_expires_at,
                code,
                now
            ),
            CodePurpose::EmailVerification => consume_slot!(
                &mut conn,
                target,
                users::verification_code,
                users::verification_code_expires_at,
                code,
                now
            ),
            CodePurpose::PasswordReset => consume_slot!(
                &mut conn,
                target,
                users::reset_code,
                users::reset_code_expires_at,
                code,
                now
            ),
        }
        .map_err(diesel_error)?;
        Ok(cleared == 1)
    }

    async fn apply_changes(
        &self,
        user_id: EntityId,
        changes: &AccountChanges,
        actor: Option<EntityId>,
    ) -> Result<UserAccount> {
        let code = |purpose| {
            changes
                .code_for(purpose)
                .map(|code| (code.value.as_str(), code.expires_at))
        };
        let mfa = code(CodePurpose::Mfa);
        let verification = code(CodePurpose::EmailVerification);
        let reset = code(CodePurpose::PasswordReset);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserAccountRow> = diesel::update(
            users::table
                .filter(users::id.eq(*user_id.as_uuid()))
                .filter(users::is_deleted.eq(false)),
        )
        .set((
            changes
                .active_token
                .as_ref()
                .map(|token| users::active_token.eq(token.as_deref())),
            changes
                .email_confirmed
                .map(|confirmed| users::email_confirmed.eq(confirmed)),
            changes.credentials.as_ref().map(|(hash, salt)| {
                (
                    users::password_hash.eq(hash.as_str()),
                    users::password_salt.eq(salt.as_str()),
                )
            }),
            mfa.map(|(value, expires_at)| {
                (
                    users::mfa_code.eq(Some(value)),
                    users::mfa_code_expires_at.eq(Some(expires_at)),
                )
            }),
            verification.map(|(value, expires_at)| {
                (
                    users::verification_code.eq(Some(value)),
                    users::verification_code_expires_at.eq(Some(expires_at)),
                )
            }),
            reset.map(|(value, expires_at)| {
                (
                    users::reset_code.eq(Some(value)),
                    users::reset_code_expires_at.eq(Some(expires_at)),
                )
            }),
            users::updated_at.eq(Some(self.clock.utc())),
            users::updated_by.eq(actor.map(|actor| *actor.as_uuid())),
        ))
        .returning(UserAccountRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(diesel_error)?;
        let row = row.ok_or_else(|| RepositoryError::not_found(UserAccount::KIND, user_id))?;
        debug!(user_id = %user_id, "applied account changes");
        UserAccount::try_from(row).map_err(RepositoryError::query)
    }
}
