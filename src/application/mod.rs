//! Application layer services.
//!
//! Services consume the domain repository traits and give HTTP handlers a
//! small, storage-agnostic API.
//!
//! - [`services::CodeAllocator`] - bounded search for an unused short code
//! - [`services::UrlService`] - create, resolve, stats, delete and click recording

pub mod services;
