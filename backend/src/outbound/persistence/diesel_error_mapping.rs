//! Diesel and pool error mapping into [`RepositoryError`].

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::EntityId;
use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

/// Map pool failures to connection errors.
pub(super) fn map_pool_error(error: PoolError) -> RepositoryError {
    RepositoryError::connection(error.message())
}

/// Map Diesel failures for a statement on `entity`.
///
/// `target` names the row a delete was aimed at, so foreign-key violations
/// raised by that delete can be reported as [`RepositoryError::Restricted`].
pub(super) fn map_diesel_error(
    error: DieselError,
    entity: &'static str,
    target: Option<EntityId>,
) -> RepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => RepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => RepositoryError::query("database query error"),
        DieselError::DatabaseError(kind, info) => match (kind, target) {
            (DatabaseErrorKind::ForeignKeyViolation, Some(id)) => RepositoryError::restricted(
                entity,
                id,
                info.table_name().unwrap_or("dependent rows"),
            ),
            (DatabaseErrorKind::ForeignKeyViolation, None) => RepositoryError::conflict(format!(
                "{entity} references a missing row"
            )),
            (DatabaseErrorKind::UniqueViolation, _) => RepositoryError::conflict(format!(
                "{entity} violates {}",
                info.constraint_name().unwrap_or("a unique constraint")
            )),
            (DatabaseErrorKind::ClosedConnection, _) => {
                RepositoryError::connection("database connection error")
            }
            _ => RepositoryError::query("database error"),
        },
        _ => RepositoryError::query("database error"),
    }
}
