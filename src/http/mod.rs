//! JSON HTTP service over the directory runtime.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::runtime::handle::DirectoryHandle;

/// Error taxonomy and response mapping.
pub mod error;
mod handlers;

/// Default request body cap in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the single-writer directory runtime.
    pub directory: DirectoryHandle,
    /// Request body cap applied to the router.
    pub max_body_bytes: usize,
}

impl AppState {
    /// Creates state over `directory` with the default body cap.
    pub fn new(directory: DirectoryHandle) -> Self {
        Self {
            directory,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Builds the contact service router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/contacts",
            post(handlers::create_contact).get(handlers::list_contacts),
        )
        .route(
            "/contacts/:id",
            put(handlers::update_contact).delete(handlers::delete_contact),
        )
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state)
}
