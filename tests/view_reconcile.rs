use std::cell::{Cell, RefCell};

use rolodex::{
    client::{
        ClientError, ContactApi,
        session::DirectorySession,
        view::{DirectoryView, PAGE_SIZE_OPTIONS},
    },
    contact::{ContactDraft, ContactRecord},
    types::{ContactField, ContactId, SortDirection},
};

fn contact(id: ContactId, first: &str, last: &str, email: &str) -> ContactRecord {
    ContactRecord {
        id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        phone_number: "555-0100".to_string(),
        company: None,
        job_title: None,
    }
}

fn draft(first: &str, email: &str) -> ContactDraft {
    ContactDraft {
        first_name: first.to_string(),
        last_name: "Example".to_string(),
        email: email.to_string(),
        phone_number: "555-0100".to_string(),
        company: None,
        job_title: None,
    }
}

fn seeded_view(contacts: Vec<ContactRecord>) -> DirectoryView {
    let mut view = DirectoryView::new();
    view.reset(contacts);
    view
}

fn first_names(rows: &[&ContactRecord]) -> Vec<String> {
    rows.iter().map(|c| c.first_name.clone()).collect()
}

#[test]
fn header_clicks_toggle_the_active_column_and_reset_new_ones() {
    let mut view = DirectoryView::new();
    assert_eq!(view.sort_field(), ContactField::FirstName);
    assert_eq!(view.direction(), SortDirection::Ascending);

    view.request_sort(ContactField::FirstName);
    assert_eq!(view.direction(), SortDirection::Descending);
    view.request_sort(ContactField::FirstName);
    assert_eq!(view.direction(), SortDirection::Ascending);

    view.request_sort(ContactField::FirstName);
    view.request_sort(ContactField::Email);
    assert_eq!(view.sort_field(), ContactField::Email);
    assert_eq!(view.direction(), SortDirection::Ascending);
}

#[test]
fn sorting_is_lexicographic_case_sensitive_and_stable_on_ties() {
    let view = seeded_view(vec![
        contact(1, "ada", "Lovelace", "ada@example.com"),
        contact(2, "Grace", "Hopper", "grace@example.com"),
        contact(3, "Grace", "Murray", "murray@example.com"),
        contact(4, "Edith", "Clarke", "edith@example.com"),
    ]);

    // Uppercase sorts before lowercase, and the two Graces keep their
    // insertion order.
    let rows = view.sorted();
    assert_eq!(first_names(&rows), ["Edith", "Grace", "Grace", "ada"]);
    assert_eq!(rows[1].id, 2);
    assert_eq!(rows[2].id, 3);

    let mut view = view;
    view.request_sort(ContactField::FirstName);
    let rows = view.sorted();
    assert_eq!(first_names(&rows), ["ada", "Grace", "Grace", "Edith"]);
    assert_eq!(rows[1].id, 2);
    assert_eq!(rows[2].id, 3);
}

#[test]
fn unset_optional_fields_sort_as_empty_text() {
    let mut with_company = contact(1, "Ada", "Lovelace", "ada@example.com");
    with_company.company = Some("Analytical Engines".to_string());
    let without_company = contact(2, "Grace", "Hopper", "grace@example.com");

    let mut view = seeded_view(vec![with_company, without_company]);
    view.request_sort(ContactField::Company);

    // "" < "Analytical Engines", so the company-less record leads.
    let rows = view.sorted();
    assert_eq!(rows[0].id, 2);
    assert_eq!(rows[1].id, 1);

    view.request_sort(ContactField::Company);
    let rows = view.sorted();
    assert_eq!(rows[0].id, 1);
    assert_eq!(rows[1].id, 2);
}

#[test]
fn pagination_windows_follow_the_sorted_order() {
    let contacts: Vec<ContactRecord> = (1..=12)
        .map(|i| {
            contact(
                i,
                &format!("User{i:02}"),
                "Example",
                &format!("user{i}@example.com"),
            )
        })
        .collect();
    let mut view = seeded_view(contacts);

    assert_eq!(view.page_size(), PAGE_SIZE_OPTIONS[0]);
    assert_eq!(view.page_count(), 3);
    assert_eq!(
        first_names(&view.visible()),
        ["User01", "User02", "User03", "User04", "User05"]
    );

    view.set_page(2);
    assert_eq!(first_names(&view.visible()), ["User11", "User12"]);

    // Out-of-range pages render empty rather than clamping.
    view.set_page(7);
    assert!(view.visible().is_empty());

    // Changing the page size jumps back to the first page.
    view.set_page_size(10);
    assert_eq!(view.page(), 0);
    assert_eq!(view.page_count(), 2);
    assert_eq!(view.visible().len(), 10);

    view.set_page_size(0);
    assert_eq!(view.page_size(), 10);
}

#[test]
fn empty_directory_still_reports_one_page() {
    let view = DirectoryView::new();
    assert_eq!(view.page_count(), 1);
    assert!(view.visible().is_empty());
}

#[test]
fn targeted_merges_touch_only_the_matching_record() {
    let mut view = seeded_view(vec![
        contact(1, "Ada", "Lovelace", "ada@example.com"),
        contact(2, "Grace", "Hopper", "grace@example.com"),
    ]);

    view.apply_created(contact(3, "Edith", "Clarke", "edith@example.com"));
    assert_eq!(view.len(), 3);
    assert_eq!(view.contacts()[2].id, 3);

    let mut renamed = contact(1, "Ada", "Byron", "ada@example.com");
    renamed.job_title = Some("Analyst".to_string());
    view.apply_updated(renamed);
    assert_eq!(view.contacts()[0].last_name, "Byron");
    assert_eq!(view.contacts()[1].last_name, "Hopper");

    // Merges for ids the cache never saw are ignored.
    view.apply_updated(contact(9, "Nobody", "Here", "nobody@example.com"));
    view.apply_deleted(9);
    assert_eq!(view.len(), 3);

    view.apply_deleted(2);
    assert_eq!(view.len(), 2);
    assert!(view.contacts().iter().all(|c| c.id != 2));
}

/// In-process stand-in for the contact service, applying the same
/// validation and uniqueness rules so rejections arise from inputs.
struct FakeApi {
    contacts: RefCell<Vec<ContactRecord>>,
    next_id: Cell<ContactId>,
    fail_next: RefCell<Option<ClientError>>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            contacts: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            fail_next: RefCell::new(None),
        }
    }

    fn failing_once(err: ClientError) -> Self {
        let api = Self::new();
        *api.fail_next.borrow_mut() = Some(err);
        api
    }

    fn take_injected_failure(&self) -> Result<(), ClientError> {
        match self.fail_next.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_draft(
        &self,
        draft: &ContactDraft,
        exclude: Option<ContactId>,
    ) -> Result<(), ClientError> {
        if draft.first_missing_field().is_some() {
            return Err(ClientError::Rejected {
                status: 400,
                message: "All fields are required!".to_string(),
            });
        }
        let conflict = self
            .contacts
            .borrow()
            .iter()
            .any(|c| c.email == draft.email && Some(c.id) != exclude);
        if conflict {
            return Err(ClientError::Rejected {
                status: 400,
                message: "Contact with this email already exists!".to_string(),
            });
        }
        Ok(())
    }
}

fn not_found() -> ClientError {
    ClientError::Rejected {
        status: 404,
        message: "Contact not found".to_string(),
    }
}

impl ContactApi for FakeApi {
    fn list_contacts(&self) -> Result<Vec<ContactRecord>, ClientError> {
        self.take_injected_failure()?;
        Ok(self.contacts.borrow().clone())
    }

    fn create_contact(&self, draft: &ContactDraft) -> Result<ContactRecord, ClientError> {
        self.take_injected_failure()?;
        self.check_draft(draft, None)?;
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let contact = draft.clone().into_record(id);
        self.contacts.borrow_mut().push(contact.clone());
        Ok(contact)
    }

    fn update_contact(
        &self,
        id: ContactId,
        draft: &ContactDraft,
    ) -> Result<ContactRecord, ClientError> {
        self.take_injected_failure()?;
        self.check_draft(draft, Some(id))?;
        let mut contacts = self.contacts.borrow_mut();
        let slot = contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(not_found)?;
        *slot = draft.clone().into_record(id);
        Ok(slot.clone())
    }

    fn delete_contact(&self, id: ContactId) -> Result<(), ClientError> {
        self.take_injected_failure()?;
        let mut contacts = self.contacts.borrow_mut();
        let before = contacts.len();
        contacts.retain(|c| c.id != id);
        if contacts.len() == before {
            return Err(not_found());
        }
        Ok(())
    }
}

#[test]
fn session_merges_accepted_submissions_without_refetching() {
    let mut session = DirectorySession::new(FakeApi::new());
    session.refresh().expect("refresh");
    assert!(session.view().is_empty());

    let ada = session
        .submit_create(&draft("Ada", "ada@example.com"))
        .expect("create");
    session
        .submit_create(&draft("Grace", "grace@example.com"))
        .expect("create");
    assert_eq!(session.view().len(), 2);

    let updated = session
        .submit_update(ada.id, &draft("Adelaide", "ada@example.com"))
        .expect("update");
    assert_eq!(updated.first_name, "Adelaide");
    assert_eq!(session.view().contacts()[0].first_name, "Adelaide");

    session.submit_delete(ada.id).expect("delete");
    assert_eq!(session.view().len(), 1);
    assert_eq!(session.view().contacts()[0].first_name, "Grace");
}

#[test]
fn rejected_submissions_leave_cache_and_presentation_state_alone() {
    let mut session = DirectorySession::new(FakeApi::new());
    session
        .submit_create(&draft("Ada", "ada@example.com"))
        .expect("create");
    session
        .submit_create(&draft("Grace", "grace@example.com"))
        .expect("create");

    session.view_mut().request_sort(ContactField::Email);
    session.view_mut().request_sort(ContactField::Email);
    session.view_mut().set_page(1);

    let err = session
        .submit_create(&draft("Ada", "ada@example.com"))
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 400, .. }));

    let err = session
        .submit_update(1, &draft("", "ada@example.com"))
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 400, .. }));

    let err = session.submit_delete(42).unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 404, .. }));

    // Cache contents and presentation state both survive untouched.
    assert_eq!(session.view().len(), 2);
    assert_eq!(session.view().contacts()[0].first_name, "Ada");
    assert_eq!(session.view().sort_field(), ContactField::Email);
    assert_eq!(session.view().direction(), SortDirection::Descending);
    assert_eq!(session.view().page(), 1);
}

#[test]
fn failed_refresh_surfaces_transport_errors_and_recovers() {
    let mut session = DirectorySession::new(FakeApi::failing_once(ClientError::Transport(
        "connection refused".to_string(),
    )));

    let err = session.refresh().unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(session.view().is_empty());

    session
        .submit_create(&draft("Ada", "ada@example.com"))
        .expect("create");
    session.refresh().expect("refresh");
    assert_eq!(session.view().len(), 1);
}
