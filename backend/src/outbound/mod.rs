//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **memory**: in-process repositories over a shared table store, used by
//!   tests and single-node deployments
//! - **persistence**: PostgreSQL-backed user accounts using Diesel ORM
//! - **mail**: delivery to the trace log
//! - **token**: opaque random session tokens
//! - **hashing**: salted SHA-256 password digests
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod hashing;
pub mod mail;
pub mod memory;
pub mod persistence;
pub mod token;
