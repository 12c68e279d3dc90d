//! Repository trait definitions for the domain layer.
//!
//! The core (allocation loop, click pipeline, URL service) depends only on
//! these traits. Implementations live in `crate::infrastructure::persistence`;
//! mock implementations are generated via `mockall` for unit tests.
//!
//! - [`UrlRepository`] - short URL records and click counters
//! - [`AnalyticsRepository`] - raw click events and aggregates

pub mod analytics_repository;
pub mod url_repository;

pub use analytics_repository::AnalyticsRepository;
pub use url_repository::UrlRepository;

#[cfg(test)]
pub use analytics_repository::MockAnalyticsRepository;
#[cfg(test)]
pub use url_repository::MockUrlRepository;
