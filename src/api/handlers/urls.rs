//! Handlers for URL management.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::urls::MessageResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Deletes a short link.
///
/// # Endpoint
///
/// `DELETE /api/urls/{code}`
///
/// The code stays reserved and is never handed out again.
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
pub async fn delete_url_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    state.url_service.delete(&code).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "URL deleted successfully".to_string(),
    }))
}
