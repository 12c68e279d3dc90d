//! Data Transfer Objects for API requests and responses.
//!
//! Request DTOs are validated with `validator` before they reach a service.
//! Statistics and pipeline snapshots are serialized straight from
//! [`crate::application::services::UrlStats`] and
//! [`crate::domain::click_pipeline::PipelineStats`].

pub mod health;
pub mod shorten;
pub mod urls;
