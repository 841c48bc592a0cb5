//! Couples a [`ContactApi`] with a [`DirectoryView`], merging results
//! into the cache only when the server accepted the submission.

use crate::{
    contact::{ContactDraft, ContactRecord},
    types::ContactId,
};

use super::{ClientError, ContactApi, view::DirectoryView};

/// Front-end session over one API connection and its cached view.
///
/// Every submission is sent as-is; a rejection leaves the cache exactly
/// as it was, so the table keeps showing the last accepted state.
pub struct DirectorySession<A> {
    api: A,
    view: DirectoryView,
}

impl<A: ContactApi> DirectorySession<A> {
    /// Wraps `api` with an empty view.
    pub fn new(api: A) -> Self {
        Self {
            api,
            view: DirectoryView::new(),
        }
    }

    /// Read access to the presentation state.
    pub fn view(&self) -> &DirectoryView {
        &self.view
    }

    /// Mutable access for sort and pagination changes.
    pub fn view_mut(&mut self) -> &mut DirectoryView {
        &mut self.view
    }

    /// Refetches the full list into the view.
    pub fn refresh(&mut self) -> Result<(), ClientError> {
        let contacts = self.api.list_contacts()?;
        self.view.reset(contacts);
        Ok(())
    }

    /// Creates a contact and appends the accepted record to the view.
    pub fn submit_create(&mut self, draft: &ContactDraft) -> Result<ContactRecord, ClientError> {
        let contact = self.api.create_contact(draft)?;
        self.view.apply_created(contact.clone());
        Ok(contact)
    }

    /// Updates a contact and replaces its cached record by id.
    pub fn submit_update(
        &mut self,
        id: ContactId,
        draft: &ContactDraft,
    ) -> Result<ContactRecord, ClientError> {
        let contact = self.api.update_contact(id, draft)?;
        self.view.apply_updated(contact.clone());
        Ok(contact)
    }

    /// Deletes a contact and drops it from the view.
    pub fn submit_delete(&mut self, id: ContactId) -> Result<(), ClientError> {
        self.api.delete_contact(id)?;
        self.view.apply_deleted(id);
        Ok(())
    }
}
