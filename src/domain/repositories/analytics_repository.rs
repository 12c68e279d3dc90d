//! Repository trait for click analytics.

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{DailyClicks, RefererStats};
use crate::error::AppError;
use async_trait::async_trait;

/// Storage for raw click events and the aggregates derived from them.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgAnalyticsRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryAnalyticsRepository`] - in-process fake
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Persists one raw click event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the short code has no record.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn save_click_event(&self, event: &ClickEvent) -> Result<(), AppError>;

    /// Clicks per UTC day over the last `days` days, newest first.
    async fn clicks_by_date(&self, short_code: &str, days: u32)
    -> Result<Vec<DailyClicks>, AppError>;

    /// Most frequent non-empty referers, highest count first.
    async fn top_referers(&self, short_code: &str, limit: u32)
    -> Result<Vec<RefererStats>, AppError>;
}
