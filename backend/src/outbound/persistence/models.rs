//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{Audit, EntityId, OneTimeCode, Role, UserAccount};

use super::schema::users;

/// Row struct for reading and inserting user accounts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserAccountRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: String,
    pub mfa_enabled: bool,
    pub email_confirmed: bool,
    pub mfa_code: Option<String>,
    pub mfa_code_expires_at: Option<DateTime<Utc>>,
    pub verification_code: Option<String>,
    pub verification_code_expires_at: Option<DateTime<Utc>>,
    pub reset_code: Option<String>,
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    pub active_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub is_deleted: bool,
}

/// Changeset written by `update`; creation and deletion columns are never
/// touched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserAccountUpdate<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub password_salt: &'a str,
    pub role: &'a str,
    pub mfa_enabled: bool,
    pub email_confirmed: bool,
    pub mfa_code: Option<&'a str>,
    pub mfa_code_expires_at: Option<DateTime<Utc>>,
    pub verification_code: Option<&'a str>,
    pub verification_code_expires_at: Option<DateTime<Utc>>,
    pub reset_code: Option<&'a str>,
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    pub active_token: Option<&'a str>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
}

fn split_code(code: Option<&OneTimeCode>) -> (Option<String>, Option<DateTime<Utc>>) {
    code.map_or((None, None), |code| {
        (Some(code.value.clone()), Some(code.expires_at))
    })
}

fn join_code(value: Option<String>, expires_at: Option<DateTime<Utc>>) -> Option<OneTimeCode> {
    value
        .zip(expires_at)
        .map(|(value, expires_at)| OneTimeCode { value, expires_at })
}

fn uuid_of(id: Option<EntityId>) -> Option<Uuid> {
    id.map(|id| *id.as_uuid())
}

impl From<&UserAccount> for UserAccountRow {
    fn from(account: &UserAccount) -> Self {
        let (mfa_code, mfa_code_expires_at) = split_code(account.mfa_code.as_ref());
        let (verification_code, verification_code_expires_at) =
            split_code(account.verification_code.as_ref());
        let (reset_code, reset_code_expires_at) = split_code(account.reset_code.as_ref());
        let audit = &account.audit;
        Self {
            id: *account.id.as_uuid(),
            username: account.username.clone(),
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            password_salt: account.password_salt.clone(),
            role: account.role.as_str().to_owned(),
            mfa_enabled: account.mfa_enabled,
            email_confirmed: account.email_confirmed,
            mfa_code,
            mfa_code_expires_at,
            verification_code,
            verification_code_expires_at,
            reset_code,
            reset_code_expires_at,
            active_token: account.active_token.clone(),
            created_at: audit.created_at,
            created_by: uuid_of(audit.created_by),
            updated_at: audit.updated_at,
            updated_by: uuid_of(audit.updated_by),
            deleted_at: audit.deleted_at,
            deleted_by: uuid_of(audit.deleted_by),
            is_deleted: audit.is_deleted,
        }
    }
}

impl<'a> UserAccountUpdate<'a> {
    pub(crate) fn of(account: &'a UserAccount) -> Self {
        let code = |slot: Option<&'a OneTimeCode>| {
            (
                slot.map(|code| code.value.as_str()),
                slot.map(|code| code.expires_at),
            )
        };
        let (mfa_code, mfa_code_expires_at) = code(account.mfa_code.as_ref());
        let (verification_code, verification_code_expires_at) =
            code(account.verification_code.as_ref());
        let (reset_code, reset_code_expires_at) = code(account.reset_code.as_ref());
        Self {
            username: &account.username,
            email: &account.email,
            password_hash: &account.password_hash,
            password_salt: &account.password_salt,
            role: account.role.as_str(),
            mfa_enabled: account.mfa_enabled,
            email_confirmed: account.email_confirmed,
            mfa_code,
            mfa_code_expires_at,
            verification_code,
            verification_code_expires_at,
            reset_code,
            reset_code_expires_at,
            active_token: account.active_token.as_deref(),
            updated_at: account.audit.updated_at,
            updated_by: uuid_of(account.audit.updated_by),
        }
    }
}

impl TryFrom<UserAccountRow> for UserAccount {
    type Error = String;

    fn try_from(row: UserAccountRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| format!("unknown role {:?} on user {}", row.role, row.id))?;
        Ok(Self {
            id: EntityId::from_uuid(row.id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            password_salt: row.password_salt,
            role,
            mfa_enabled: row.mfa_enabled,
            email_confirmed: row.email_confirmed,
            mfa_code: join_code(row.mfa_code, row.mfa_code_expires_at),
            verification_code: join_code(
                row.verification_code,
                row.verification_code_expires_at,
            ),
            reset_code: join_code(row.reset_code, row.reset_code_expires_at),
            active_token: row.active_token,
            audit: Audit {
                created_at: row.created_at,
                created_by: row.created_by.map(EntityId::from_uuid),
                updated_at: row.updated_at,
                updated_by: row.updated_by.map(EntityId::from_uuid),
                deleted_at: row.deleted_at,
                deleted_by: row.deleted_by.map(EntityId::from_uuid),
                is_deleted: row.is_deleted,
            },
        })
    }
}
