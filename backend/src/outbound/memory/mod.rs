//! In-process repository adapters.
//!
//! A [`MemoryStore`] holds one table per entity type and enforces the
//! declared relationship policy on hard deletes. Each
//! [`MemoryRepository`] is a typed view over a shared store, so services
//! wired against several repositories observe one consistent dataset.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use duty_backend::domain::Project;
//! use duty_backend::outbound::memory::{MemoryRepository, MemoryStore};
//! use mockable::DefaultClock;
//!
//! let store = Arc::new(MemoryStore::new(Arc::new(DefaultClock)));
//! let projects = MemoryRepository::<Project>::new(Arc::clone(&store));
//! # let _ = projects;
//! ```

mod repository;
mod store;

pub use repository::MemoryRepository;
pub use store::MemoryStore;
