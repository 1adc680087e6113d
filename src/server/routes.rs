//! HTTP routes
//!
//! Thin boundary over the catalog core: every internal failure becomes a
//! plain-text 500 without details.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tracing::error;

use crate::catalog::{CatalogService, ImageProxy};

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub images: ImageProxy,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/catalog", get(catalog_handler))
        .route("/api/image/:id", get(image_handler))
        .with_state(state)
}

/// `GET /api/catalog`
async fn catalog_handler(State(state): State<AppState>) -> Response {
    match state.catalog.get_catalog().await {
        Ok(catalog) => Json(&*catalog).into_response(),
        Err(e) => {
            error!(error = %e, "Error fetching catalog");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error fetching catalog").into_response()
        }
    }
}

/// `GET /api/image/:id`
async fn image_handler(State(state): State<AppState>, Path(file_id): Path<String>) -> Response {
    match state.images.open(&file_id).await {
        Ok(content) => (
            [(header::CONTENT_TYPE, content.mime_type)],
            Body::from_stream(content.stream),
        )
            .into_response(),
        Err(e) => {
            error!(file_id = %file_id, error = %e, "Error fetching image");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error fetching image").into_response()
        }
    }
}
