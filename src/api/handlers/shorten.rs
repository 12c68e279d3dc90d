//! Handler for link shortening endpoint.

use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short URL.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "original_url": "https://example.com/some/long/path",
///   "custom_code": "summer24", // optional
///   "expires_in": 24          // optional, hours
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "short_url": "http://localhost:8080/aB3xYz",
///   "short_code": "aB3xYz",
///   "original_url": "https://example.com/some/long/path",
///   "expires_at": "2025-01-02T10:00:00Z"
/// }
/// ```
///
/// Shortening a URL that already has a live short code returns that code.
///
/// # Errors
///
/// - 400 on validation failures
/// - 409 if the custom code is taken
/// - 503 if no free code could be allocated
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let created = state.url_service.create_short_url(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}
