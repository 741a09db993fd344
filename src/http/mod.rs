//! HTTP surface: routes, shared state and request/response shapes.

mod documents;
mod form;
mod images;
mod text;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::gateway::Gateway;
use crate::storage::ImageStore;

/// State shared by every handler. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
    images: ImageStore,
}

impl AppState {
    /// Bundle the gateway and the image store.
    #[must_use]
    pub fn new(gateway: Arc<Gateway>, images: ImageStore) -> Self {
        Self { gateway, images }
    }
}

/// Build the application router.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(text::root))
        .route("/health", get(text::health))
        .route("/summarize", get(text::summarize_query).post(text::summarize))
        .route("/grounding", post(text::grounding))
        .route("/doc", post(documents::extract))
        .route("/images/text-to-image", post(images::text_to_image))
        .route("/images/edit-image", post(images::edit_image))
        .route("/images/download/:filename", get(images::download))
        .route("/images/:filename", get(images::view))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
