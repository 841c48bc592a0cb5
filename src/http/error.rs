//! Service error taxonomy and its HTTP response mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{core::store::StoreError, runtime::handle::RuntimeError};

/// Request failures, each carrying a fixed status and client message.
///
/// The display strings are part of the wire contract; clients match on
/// them, so they never embed request-specific detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// A required contact field was missing or empty.
    #[error("All fields are required!")]
    Validation,
    /// The submitted email already belongs to another contact.
    #[error("Contact with this email already exists!")]
    Conflict,
    /// No contact exists under the requested id.
    #[error("Contact not found")]
    NotFound,
    /// The directory or its persistence pipeline is unavailable.
    #[error("Server error")]
    Unavailable,
}

impl ApiError {
    /// Fixed status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation | Self::Conflict => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Store(StoreError::EmptyField(_)) => Self::Validation,
            RuntimeError::Store(StoreError::DuplicateEmail { .. }) => Self::Conflict,
            RuntimeError::Store(StoreError::MissingContact(_)) => Self::NotFound,
            _ => Self::Unavailable,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}
