use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{debug, error, info};

use crate::{
    contact::{ContactDraft, ContactRecord},
    core::store::StoreError,
    runtime::handle::RuntimeError,
    types::ContactId,
};

use super::{AppState, error::ApiError};

pub(crate) async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn create_contact(
    State(state): State<AppState>,
    Json(draft): Json<ContactDraft>,
) -> Result<(StatusCode, Json<ContactRecord>), ApiError> {
    let contact = state.directory.create(draft).await.map_err(reject)?;
    info!(id = contact.id, "contact created");
    Ok((StatusCode::CREATED, Json(contact)))
}

pub(crate) async fn list_contacts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContactRecord>>, ApiError> {
    let contacts = state.directory.list().await.map_err(reject)?;
    Ok(Json(contacts))
}

pub(crate) async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    Json(draft): Json<ContactDraft>,
) -> Result<Json<ContactRecord>, ApiError> {
    let contact = state.directory.update(id, draft).await.map_err(reject)?;
    info!(id, "contact updated");
    Ok(Json(contact))
}

pub(crate) async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.directory.delete(id).await.map_err(reject)?;
    info!(id, "contact deleted");
    Ok(Json(json!({ "message": "Contact deleted successfully" })))
}

fn reject(err: RuntimeError) -> ApiError {
    match &err {
        RuntimeError::Store(
            StoreError::EmptyField(_)
            | StoreError::DuplicateEmail { .. }
            | StoreError::MissingContact(_),
        ) => debug!(error = %err, "request rejected"),
        _ => error!(error = %err, "directory operation failed"),
    }
    ApiError::from(err)
}
