//! Click event model for asynchronous click tracking.

use chrono::{DateTime, Utc};

/// A redirect observed on the hot path, waiting to be persisted.
///
/// Created by the redirect handler and moved into the
/// [`crate::domain::click_pipeline::ClickPipeline`] queue; the worker that
/// dequeues it owns it until its batch is flushed.
///
/// Missing client metadata is stored as an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub short_code: String,
    pub ip_address: String,
    pub user_agent: String,
    pub referer: String,
    pub created_at: DateTime<Utc>,
}

impl ClickEvent {
    /// Creates an event stamped with the current time.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let event = ClickEvent::new("aB3xYz", "192.168.1.1", "Mozilla/5.0", "");
    /// ```
    pub fn new(
        short_code: impl Into<String>,
        ip_address: impl Into<String>,
        user_agent: impl Into<String>,
        referer: impl Into<String>,
    ) -> Self {
        Self {
            short_code: short_code.into(),
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
            referer: referer.into(),
            created_at: Utc::now(),
        }
    }
}
