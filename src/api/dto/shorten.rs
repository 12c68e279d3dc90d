//! DTOs for the link shortening endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::{CreateShortUrl, CreatedShortUrl};

/// Request body of `POST /api/shorten`.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The URL to shorten (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"))]
    pub original_url: String,

    /// Optional custom short code; checked against the code alphabet by the service.
    #[validate(length(min = 4, max = 12))]
    pub custom_code: Option<String>,

    /// Optional lifetime in hours. After it elapses, the link returns 410 Gone.
    #[validate(range(min = 1))]
    pub expires_in: Option<i64>,
}

impl From<ShortenRequest> for CreateShortUrl {
    fn from(request: ShortenRequest) -> Self {
        Self {
            original_url: request.original_url,
            custom_code: request.custom_code,
            expires_in_hours: request.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_url: String,
    pub short_code: String,
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreatedShortUrl> for ShortenResponse {
    fn from(created: CreatedShortUrl) -> Self {
        Self {
            short_url: created.short_url,
            short_code: created.record.short_code,
            original_url: created.record.original_url,
            expires_at: created.record.expires_at,
        }
    }
}
