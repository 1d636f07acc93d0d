//! Translation of the enumerable query vocabulary into boxed Diesel queries
//! over the `users` table.
//!
//! Nullable columns are compared through `assume_not_null`, which keeps SQL
//! three-valued logic in line with the in-memory rule that ordered and
//! not-equal comparisons never match a null column.

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use pagination::Window;
use uuid::Uuid;

use crate::domain::ports::RepositoryError;
use crate::domain::{
    AuditField, DeletionScope, Direction, EntityField, FieldValue, Filter, Predicate,
    QueryOptions, UserAccountField,
};

use super::schema::users;

pub(super) type BoxedCondition = Box<dyn BoxableExpression<users::table, Pg, SqlType = Bool>>;
pub(super) type BoxedUsers = users::BoxedQuery<'static, Pg>;

fn mismatch(expected: &str, value: &FieldValue) -> RepositoryError {
    RepositoryError::query(format!("expected a {expected} value, got {value:?}"))
}

fn text(value: &FieldValue) -> Result<String, RepositoryError> {
    match value {
        FieldValue::Text(text) => Ok(text.clone()),
        other => Err(mismatch("text", other)),
    }
}

fn uuid(value: &FieldValue) -> Result<Uuid, RepositoryError> {
    match value {
        FieldValue::Id(id) => Ok(*id.as_uuid()),
        other => Err(mismatch("id", other)),
    }
}

fn boolean(value: &FieldValue) -> Result<bool, RepositoryError> {
    match value {
        FieldValue::Bool(flag) => Ok(*flag),
        other => Err(mismatch("boolean", other)),
    }
}

fn timestamp(value: &FieldValue) -> Result<DateTime<Utc>, RepositoryError> {
    match value {
        FieldValue::Timestamp(at) => Ok(*at),
        other => Err(mismatch("timestamp", other)),
    }
}

/// `ILIKE` pattern matching `needle` anywhere, with wildcards escaped.
pub(super) fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Build a condition for a column. `$raw` is the column as declared and
/// `$cmp` the same column with a non-null SQL type.
macro_rules! compare {
    ($raw:expr, $cmp:expr, $predicate:expr, $convert:ident) => {{
        let condition: BoxedCondition = match $predicate {
            Predicate::Eq(FieldValue::Null) | Predicate::IsNull => Box::new($raw.is_null()),
            Predicate::NotEq(FieldValue::Null) | Predicate::IsNotNull => {
                Box::new($raw.is_not_null())
            }
            Predicate::Eq(value) => Box::new($cmp.eq($convert(value)?)),
            Predicate::NotEq(value) => Box::new($cmp.ne($convert(value)?)),
            Predicate::Lt(value) => Box::new($cmp.lt($convert(value)?)),
            Predicate::Lte(value) => Box::new($cmp.le($convert(value)?)),
            Predicate::Gt(value) => Box::new($cmp.gt($convert(value)?)),
            Predicate::Gte(value) => Box::new($cmp.ge($convert(value)?)),
            Predicate::AnyOf(values) => {
                let with_null = values.iter().any(FieldValue::is_null);
                let present = values
                    .iter()
                    .filter(|value| !value.is_null())
                    .map($convert)
                    .collect::<Result<Vec<_>, _>>()?;
                if with_null {
                    Box::new($raw.is_null().or($cmp.eq_any(present)))
                } else {
                    Box::new($cmp.eq_any(present))
                }
            }
            Predicate::Contains(_) => {
                return Err(RepositoryError::query("contains applies to text columns only"));
            }
        };
        Ok(condition)
    }};
}

fn audit_condition(field: AuditField, predicate: &Predicate) -> Result<BoxedCondition, RepositoryError> {
    match field {
        AuditField::CreatedAt => compare!(users::created_at, users::created_at, predicate, timestamp),
        AuditField::CreatedBy => compare!(
            users::created_by,
            users::created_by.assume_not_null(),
            predicate,
            uuid
        ),
        AuditField::UpdatedAt => compare!(
            users::updated_at,
            users::updated_at.assume_not_null(),
            predicate,
            timestamp
        ),
        AuditField::UpdatedBy => compare!(
            users::updated_by,
            users::updated_by.assume_not_null(),
            predicate,
            uuid
        ),
        AuditField::DeletedAt => compare!(
            users::deleted_at,
            users::deleted_at.assume_not_null(),
            predicate,
            timestamp
        ),
        AuditField::DeletedBy => compare!(
            users::deleted_by,
            users::deleted_by.assume_not_null(),
            predicate,
            uuid
        ),
        AuditField::IsDeleted => compare!(users::is_deleted, users::is_deleted, predicate, boolean),
    }
}

fn condition(field: UserAccountField, predicate: &Predicate) -> Result<BoxedCondition, RepositoryError> {
    use UserAccountField as F;

    match (field, predicate) {
        (F::Username, Predicate::Contains(needle)) => {
            Ok(Box::new(users::username.ilike(like_pattern(needle))))
        }
        (F::Email, Predicate::Contains(needle)) => {
            Ok(Box::new(users::email.ilike(like_pattern(needle))))
        }
        (F::Role, Predicate::Contains(needle)) => {
            Ok(Box::new(users::role.ilike(like_pattern(needle))))
        }
        (F::ActiveToken, Predicate::Contains(needle)) => Ok(Box::new(
            users::active_token
                .assume_not_null()
                .ilike(like_pattern(needle)),
        )),
        (F::Id, p) => compare!(users::id, users::id, p, uuid),
        (F::Username, p) => compare!(users::username, users::username, p, text),
        (F::Email, p) => compare!(users::email, users::email, p, text),
        (F::Role, p) => compare!(users::role, users::role, p, text),
        (F::MfaEnabled, p) => compare!(users::mfa_enabled, users::mfa_enabled, p, boolean),
        (F::EmailConfirmed, p) => {
            compare!(users::email_confirmed, users::email_confirmed, p, boolean)
        }
        (F::ActiveToken, p) => compare!(
            users::active_token,
            users::active_token.assume_not_null(),
            p,
            text
        ),
        (F::Audit(audit), p) => audit_condition(audit, p),
    }
}

/// Rows admitted by `filter`, unordered.
pub(super) fn filtered(filter: &Filter<UserAccountField>) -> Result<BoxedUsers, RepositoryError> {
    let mut query = users::table.into_boxed();
    query = match filter.deletion() {
        DeletionScope::Active => query.filter(users::is_deleted.eq(false)),
        DeletionScope::DeletedOnly => query.filter(users::is_deleted.eq(true)),
        DeletionScope::IncludeDeleted => query,
    };
    for item in filter.conditions() {
        query = query.filter(condition(item.field, &item.predicate)?);
    }
    Ok(query)
}

macro_rules! order_key {
    ($query:expr, $column:expr, $direction:expr) => {
        match $direction {
            Direction::Ascending => $query.then_order_by($column.asc().nulls_first()),
            Direction::Descending => $query.then_order_by($column.desc().nulls_last()),
        }
    };
}

fn then_order(
    query: BoxedUsers,
    field: UserAccountField,
    direction: Direction,
) -> BoxedUsers {
    use UserAccountField as F;

    match field {
        F::Id => order_key!(query, users::id, direction),
        F::Username => order_key!(query, users::username, direction),
        F::Email => order_key!(query, users::email, direction),
        F::Role => order_key!(query, users::role, direction),
        F::MfaEnabled => order_key!(query, users::mfa_enabled, direction),
        F::EmailConfirmed => order_key!(query, users::email_confirmed, direction),
        F::ActiveToken => order_key!(query, users::active_token, direction),
        F::Audit(AuditField::CreatedAt) => order_key!(query, users::created_at, direction),
        F::Audit(AuditField::CreatedBy) => order_key!(query, users::created_by, direction),
        F::Audit(AuditField::UpdatedAt) => order_key!(query, users::updated_at, direction),
        F::Audit(AuditField::UpdatedBy) => order_key!(query, users::updated_by, direction),
        F::Audit(AuditField::DeletedAt) => order_key!(query, users::deleted_at, direction),
        F::Audit(AuditField::DeletedBy) => order_key!(query, users::deleted_by, direction),
        F::Audit(AuditField::IsDeleted) => order_key!(query, users::is_deleted, direction),
    }
}

/// Apply the ordering keys, falling back to creation order. The identity
/// column always breaks remaining ties.
pub(super) fn ordered(query: BoxedUsers, options: &QueryOptions<UserAccountField>) -> BoxedUsers {
    let query = if options.ordering().is_empty() {
        query.order(users::created_at.asc())
    } else {
        options
            .ordering()
            .iter()
            .fold(query, |query, key| then_order(query, key.field, key.direction))
    };
    query.then_order_by(users::id.asc())
}

/// Restrict a query to a page window; `None` means the window is empty.
pub(super) fn windowed(query: BoxedUsers, window: Window) -> Option<BoxedUsers> {
    match window {
        Window::All => Some(query),
        Window::Empty => None,
        Window::Slice { offset, limit } => Some(
            query
                .offset(i64::try_from(offset).unwrap_or(i64::MAX))
                .limit(i64::try_from(limit).unwrap_or(i64::MAX)),
        ),
    }
}

/// Reject includes; accounts declare no reference columns.
pub(super) fn check_includes(
    options: &QueryOptions<UserAccountField>,
) -> Result<(), RepositoryError> {
    match options.includes().first() {
        Some(field) => Err(RepositoryError::invalid_include("users", field.name())),
        None => Ok(()),
    }
}
