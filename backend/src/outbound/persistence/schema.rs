//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered user accounts.
    ///
    /// One-time codes are stored as value/expiry column pairs; a slot is
    /// empty when both are null.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique login name.
        username -> Varchar,
        /// Unique, lower-cased email address.
        email -> Varchar,
        /// Hex SHA-256 digest of salt and password.
        password_hash -> Varchar,
        /// Hex salt.
        password_salt -> Varchar,
        /// `member` or `admin`.
        role -> Varchar,
        mfa_enabled -> Bool,
        email_confirmed -> Bool,
        mfa_code -> Nullable<Varchar>,
        mfa_code_expires_at -> Nullable<Timestamptz>,
        verification_code -> Nullable<Varchar>,
        verification_code_expires_at -> Nullable<Timestamptz>,
        reset_code -> Nullable<Varchar>,
        reset_code_expires_at -> Nullable<Timestamptz>,
        /// Token of the current session.
        active_token -> Nullable<Varchar>,
        created_at -> Timestamptz,
        created_by -> Nullable<Uuid>,
        updated_at -> Nullable<Timestamptz>,
        updated_by -> Nullable<Uuid>,
        deleted_at -> Nullable<Timestamptz>,
        deleted_by -> Nullable<Uuid>,
        /// Soft-delete flag.
        is_deleted -> Bool,
    }
}
