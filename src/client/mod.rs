/// Blocking HTTP implementation of [`ContactApi`].
pub mod http;
/// Merge-on-success glue between an API and a view.
pub mod session;
/// Sorted, paginated view over the cached contact list.
pub mod view;

use thiserror::Error;

use crate::{
    contact::{ContactDraft, ContactRecord},
    types::ContactId,
};

/// Failures surfaced by [`ContactApi`] calls; all are terminal for the
/// submission that raised them.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("server rejected request with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or the status text when absent.
        message: String,
    },
    /// The request never completed.
    #[error("transport error: {0}")]
    Transport(String),
    /// A success body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),
}

/// Operations the directory front end needs from the contact service.
pub trait ContactApi {
    /// Fetches the full contact list.
    fn list_contacts(&self) -> Result<Vec<ContactRecord>, ClientError>;

    /// Creates a contact, returning the record with its assigned id.
    fn create_contact(&self, draft: &ContactDraft) -> Result<ContactRecord, ClientError>;

    /// Replaces every field of the contact under `id`.
    fn update_contact(&self, id: ContactId, draft: &ContactDraft)
    -> Result<ContactRecord, ClientError>;

    /// Deletes the contact under `id`.
    fn delete_contact(&self, id: ContactId) -> Result<(), ClientError>;
}
