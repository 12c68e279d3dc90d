//! Bounded retry loop that turns candidate codes into a free one.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::generator::CodeSource;

/// Attempts made before allocation gives up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 10;

/// Draws candidates from a [`CodeSource`] until storage reports one as unused.
///
/// The existence check and the later insert are not atomic; the unique index
/// on `urls.short_code` is what finally rejects a racing duplicate.
pub struct CodeAllocator {
    source: Arc<dyn CodeSource>,
    url_repository: Arc<dyn UrlRepository>,
    max_attempts: usize,
}

impl CodeAllocator {
    pub fn new(source: Arc<dyn CodeSource>, url_repository: Arc<dyn UrlRepository>) -> Self {
        Self {
            source,
            url_repository,
            max_attempts: MAX_ALLOCATION_ATTEMPTS,
        }
    }

    /// Returns the first candidate not present in storage.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AllocationExhausted`] after [`MAX_ALLOCATION_ATTEMPTS`]
    /// collisions. Storage errors from the existence check are returned as-is.
    pub async fn allocate_code(&self) -> Result<String, AppError> {
        for attempt in 1..=self.max_attempts {
            let code = self.source.next_code();

            if !self.url_repository.exists_by_code(&code).await? {
                debug!(attempt, "Allocated short code {}", code);
                return Ok(code);
            }

            metrics::counter!("short_code_collisions_total").increment(1);
            warn!(
                attempt,
                max_attempts = self.max_attempts,
                "Short code collision on {}",
                code
            );
        }

        Err(AppError::AllocationExhausted {
            attempts: self.max_attempts,
        })
    }
}
