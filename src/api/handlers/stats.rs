//! Handler for per-link statistics.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::application::services::UrlStats;
use crate::error::AppError;
use crate::state::AppState;

/// Returns click statistics for a short link.
///
/// # Endpoint
///
/// `GET /api/stats/{code}`
///
/// # Response
///
/// ```json
/// {
///   "short_code": "aB3xYz",
///   "original_url": "https://example.com",
///   "total_clicks": 42,
///   "created_at": "2025-01-01T10:00:00Z",
///   "clicks_by_date": [{ "date": "2025-01-02", "count": 12 }],
///   "top_referers": [{ "referer": "https://news.example", "count": 7 }]
/// }
/// ```
///
/// `clicks_by_date` covers the last 7 days; `top_referers` holds at most 5 entries.
/// `total_clicks` lags behind redirects by up to one pipeline flush.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn stats_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UrlStats>, AppError> {
    Ok(Json(state.url_service.get_stats(&code).await?))
}
