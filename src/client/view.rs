//! Client-side table state: sorting, pagination, and targeted merges.

use crate::{
    contact::ContactRecord,
    types::{ContactField, ContactId, SortDirection},
};

/// Page sizes the directory table offers.
pub const PAGE_SIZE_OPTIONS: [usize; 5] = [5, 10, 15, 20, 25];

/// Sorted, paginated presentation state over the cached contact list.
///
/// The cache itself stays in server (insertion) order; sorting and
/// pagination are applied on read so they never mutate the data.
#[derive(Debug, Clone)]
pub struct DirectoryView {
    contacts: Vec<ContactRecord>,
    sort_field: ContactField,
    direction: SortDirection,
    page: usize,
    page_size: usize,
}

impl Default for DirectoryView {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryView {
    /// Creates an empty view sorted by first name ascending, five rows
    /// per page.
    pub fn new() -> Self {
        Self {
            contacts: Vec::new(),
            sort_field: ContactField::default(),
            direction: SortDirection::default(),
            page: 0,
            page_size: PAGE_SIZE_OPTIONS[0],
        }
    }

    /// Replaces the cached list wholesale, as after a full refetch.
    pub fn reset(&mut self, contacts: Vec<ContactRecord>) {
        self.contacts = contacts;
    }

    /// Cached contacts in server order.
    pub fn contacts(&self) -> &[ContactRecord] {
        &self.contacts
    }

    /// Number of cached contacts.
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// True when no contacts are cached.
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Active sort column.
    pub fn sort_field(&self) -> ContactField {
        self.sort_field
    }

    /// Active sort direction.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Current page, 0-based.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Rows per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Applies a header click: a new column sorts ascending, the active
    /// column flips direction.
    pub fn request_sort(&mut self, field: ContactField) {
        if self.sort_field == field {
            self.direction = self.direction.toggle();
        } else {
            self.sort_field = field;
            self.direction = SortDirection::Ascending;
        }
    }

    /// Jumps to `page` (0-based). Out-of-range pages simply render empty.
    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Sets rows per page and returns to the first page; zero is ignored.
    pub fn set_page_size(&mut self, size: usize) {
        if size == 0 {
            return;
        }
        self.page_size = size;
        self.page = 0;
    }

    /// Full cached list under the active sort.
    ///
    /// Ties keep their relative server order, so equal keys stay stable
    /// across re-sorts.
    pub fn sorted(&self) -> Vec<&ContactRecord> {
        let mut rows: Vec<&ContactRecord> = self.contacts.iter().collect();
        rows.sort_by(|a, b| {
            let ord = a
                .field_text(self.sort_field)
                .cmp(b.field_text(self.sort_field));
            match self.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        rows
    }

    /// Rows of the current page under the active sort.
    pub fn visible(&self) -> Vec<&ContactRecord> {
        self.sorted()
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// Number of pages the cached list fills; an empty list still has one.
    pub fn page_count(&self) -> usize {
        if self.contacts.is_empty() {
            1
        } else {
            self.contacts.len().div_ceil(self.page_size)
        }
    }

    /// Appends a newly created record to the cache.
    pub fn apply_created(&mut self, contact: ContactRecord) {
        self.contacts.push(contact);
    }

    /// Replaces the cached record sharing `contact.id`; unknown ids are
    /// ignored.
    pub fn apply_updated(&mut self, contact: ContactRecord) {
        if let Some(slot) = self.contacts.iter_mut().find(|c| c.id == contact.id) {
            *slot = contact;
        }
    }

    /// Drops the cached record under `id`, if present.
    pub fn apply_deleted(&mut self, id: ContactId) {
        self.contacts.retain(|c| c.id != id);
    }
}
