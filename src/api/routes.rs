//! API route configuration.

use crate::api::handlers::{
    delete_url_handler, pipeline_stats_handler, shorten_handler, stats_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Routes nested under `/api`.
///
/// # Endpoints
///
/// - `POST   /shorten`       - Create a short URL
/// - `GET    /stats/{code}`  - Click statistics for a link
/// - `DELETE /urls/{code}`   - Delete a link
/// - `GET    /pipeline`      - Click pipeline snapshot
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/stats/{code}", get(stats_handler))
        .route("/urls/{code}", delete(delete_url_handler))
        .route("/pipeline", get(pipeline_stats_handler))
}
