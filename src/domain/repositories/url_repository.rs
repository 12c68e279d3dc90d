//! Repository trait for short URL records.

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::error::AppError;
use async_trait::async_trait;

/// Storage for short URL records.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryUrlRepository`] - in-process fake
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Persists a new record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the short code is already taken.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError>;

    /// Finds a live (not deleted) record by short code.
    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Finds the newest record pointing at `original_url` that is neither
    /// deleted nor expired.
    async fn find_by_original_url(&self, original_url: &str)
    -> Result<Option<ShortUrl>, AppError>;

    /// Reports whether `short_code` is taken, deleted records included.
    async fn exists_by_code(&self, short_code: &str) -> Result<bool, AppError>;

    /// Adds one to the click counter of `short_code`.
    async fn increment_click_count(&self, short_code: &str) -> Result<(), AppError>;

    /// Deletes a record.
    ///
    /// Returns `Ok(false)` if no live record matched.
    async fn delete(&self, short_code: &str) -> Result<bool, AppError>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<(), AppError>;
}
