//! Repository implementations.
//!
//! PostgreSQL repositories use runtime-checked SQLx queries against the schema
//! in `migrations/`. The in-memory variants back the integration tests.
//!
//! # Repositories
//!
//! - [`PgUrlRepository`] / [`InMemoryUrlRepository`] - short URL records
//! - [`PgAnalyticsRepository`] / [`InMemoryAnalyticsRepository`] - click events and aggregates

pub mod memory;
pub mod pg_analytics_repository;
pub mod pg_url_repository;

pub use memory::{InMemoryAnalyticsRepository, InMemoryUrlRepository};
pub use pg_analytics_repository::PgAnalyticsRepository;
pub use pg_url_repository::PgUrlRepository;
