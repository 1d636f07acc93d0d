//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of domain repository ports backed by PostgreSQL
//! via Diesel with async support through `diesel-async` and `bb8` pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain entities. No business logic resides here.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never reach the domain layer.
//! - **Enumerable queries**: domain filters and orderings are translated to
//!   boxed Diesel queries; no SQL text is built from caller input.
//! - **Strongly typed errors**: every database failure maps to a
//!   [`RepositoryError`](crate::domain::ports::RepositoryError).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use duty_backend::outbound::persistence::{DbPool, DieselUserAccountRepository, PoolConfig};
//! use mockable::DefaultClock;
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/duties")).await?;
//! let users = DieselUserAccountRepository::new(pool, Arc::new(DefaultClock));
//! ```

mod diesel_error_mapping;
mod diesel_user_account_repository;
mod models;
mod pool;
mod schema;
mod user_account_query;

pub use diesel_user_account_repository::DieselUserAccountRepository;
pub use pool::{DbPool, PoolConfig, PoolError, PoolStage};
