//! Duty management backend library.
//!
//! - [`domain`]: entities, query vocabulary, message model, result envelope,
//!   business rules, relationship policy and services.
//! - [`outbound`]: repository, mail, token and hashing adapters.
//! - [`settings`] / [`telemetry`]: configuration and tracing setup.

pub mod domain;
pub mod outbound;
pub mod settings;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
