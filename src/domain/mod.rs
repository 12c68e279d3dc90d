//! Domain layer: entities, repository contracts and the click pipeline.
//!
//! Nothing in here knows about HTTP, Postgres or Redis. Storage is reached
//! through the traits in [`repositories`], implemented by
//! [`crate::infrastructure::persistence`].
//!
//! # Click flow
//!
//! 1. The redirect handler builds a [`click_event::ClickEvent`]
//! 2. [`click_pipeline::ClickPipeline::enqueue`] queues it without waiting
//! 3. Pipeline workers batch events and persist them through
//!    [`repositories::AnalyticsRepository`], then bump the per-URL counter
//!    via [`repositories::UrlRepository`]

pub mod click_event;
pub mod click_pipeline;
pub mod entities;
pub mod repositories;
