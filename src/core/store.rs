use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    contact::{ContactDraft, ContactRecord},
    core::indices::UniqueIndex,
    op::{Op, StoredOp},
    types::{ContactId, OpSeq},
};

/// Rejections raised by [`ContactStore`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No contact exists under the given id.
    #[error("no contact with id {0}")]
    MissingContact(ContactId),
    /// A contact with the given id is already present.
    #[error("contact {0} already exists")]
    AlreadyExists(ContactId),
    /// A required draft field was missing or empty.
    #[error("required field {0} is missing or empty")]
    EmptyField(&'static str),
    /// The email is already held by a different contact.
    #[error("email {email} already belongs to contact {holder}")]
    DuplicateEmail {
        /// Conflicting email value.
        email: String,
        /// Contact currently holding the email.
        holder: ContactId,
    },
}

/// Serializable full-state snapshot of a [`ContactStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshotV1 {
    /// Next contact id to allocate.
    pub next_contact_id: ContactId,
    /// Next operation sequence to allocate.
    pub next_op_seq: OpSeq,
    /// Insertion order of live contact ids.
    pub order: Vec<ContactId>,
    /// Live records, in insertion order.
    pub records: Vec<ContactRecord>,
}

/// Authoritative in-memory contact directory.
///
/// All uniqueness and validation rules are enforced here, so every path
/// into the store (fresh mutations and journal replay alike) observes the
/// same guards.
#[derive(Debug, Default)]
pub struct ContactStore {
    records: HashMap<ContactId, ContactRecord>,
    order: Vec<ContactId>,
    pos: HashMap<ContactId, usize>,
    by_email: UniqueIndex<String>,
    next_op_seq: OpSeq,
    next_contact_id: ContactId,
}

impl ContactStore {
    /// Creates an empty store with ids and sequences starting at 1.
    pub fn new() -> Self {
        Self {
            next_op_seq: 1,
            next_contact_id: 1,
            ..Self::default()
        }
    }

    /// Rebuilds a store from a snapshot, re-deriving positions and the
    /// email index. Fails if the snapshot holds a duplicated email.
    pub fn from_snapshot(snapshot: StoreSnapshotV1) -> Result<Self, StoreError> {
        let mut store = Self {
            next_contact_id: snapshot.next_contact_id,
            next_op_seq: snapshot.next_op_seq,
            pos: snapshot
                .order
                .iter()
                .enumerate()
                .map(|(idx, &id)| (id, idx))
                .collect(),
            order: snapshot.order,
            ..Self::default()
        };

        for rec in snapshot.records {
            if let Some(&holder) = store.by_email.get(rec.email.as_str()) {
                return Err(StoreError::DuplicateEmail {
                    email: rec.email.clone(),
                    holder,
                });
            }
            store.by_email.insert(rec.email.clone(), rec.id);
            store.records.insert(rec.id, rec);
        }

        Ok(store)
    }

    /// Exports the full state in insertion order.
    pub fn export_snapshot(&self) -> StoreSnapshotV1 {
        StoreSnapshotV1 {
            next_contact_id: self.next_contact_id,
            next_op_seq: self.next_op_seq,
            order: self.order.clone(),
            records: self.all_cloned(),
        }
    }

    /// Validates `draft` and creates a new contact at the end of the order.
    ///
    /// Required fields and email uniqueness are checked before an id is
    /// allocated, so a rejected create consumes nothing.
    pub fn create(&mut self, draft: ContactDraft) -> Result<(ContactRecord, StoredOp), StoreError> {
        if let Some(field) = draft.first_missing_field() {
            return Err(StoreError::EmptyField(field));
        }
        if let Some(&holder) = self.by_email.get(draft.email.as_str()) {
            return Err(StoreError::DuplicateEmail {
                email: draft.email.clone(),
                holder,
            });
        }

        let id = self.next_contact_id;
        self.next_contact_id += 1;

        let contact = draft.into_record(id);
        let stored = self.apply_create(contact.clone())?;
        Ok((contact, stored))
    }

    /// Validates `draft` and replaces every field of the contact under
    /// `id`, keeping its position in the order.
    ///
    /// The email uniqueness check excludes the contact itself, so an
    /// update that keeps the email is always allowed.
    pub fn replace(
        &mut self,
        id: ContactId,
        draft: ContactDraft,
    ) -> Result<(ContactRecord, StoredOp), StoreError> {
        if let Some(field) = draft.first_missing_field() {
            return Err(StoreError::EmptyField(field));
        }
        if !self.records.contains_key(&id) {
            return Err(StoreError::MissingContact(id));
        }
        if let Some(&holder) = self.by_email.get(draft.email.as_str()) {
            if holder != id {
                return Err(StoreError::DuplicateEmail {
                    email: draft.email.clone(),
                    holder,
                });
            }
        }

        let contact = draft.into_record(id);
        let stored = self.apply_replace(contact.clone())?;
        Ok((contact, stored))
    }

    /// Removes the contact under `id`, returning the removed record.
    pub fn remove(&mut self, id: ContactId) -> Result<(ContactRecord, StoredOp), StoreError> {
        if !self.records.contains_key(&id) {
            return Err(StoreError::MissingContact(id));
        }
        self.apply_remove(id)
    }

    /// Re-applies a journaled operation during replay, preserving its
    /// original sequence number.
    pub fn apply_replayed_op(&mut self, stored: StoredOp) -> Result<(), StoreError> {
        let seq = stored.seq;
        match stored.op {
            Op::Create { contact } => {
                self.apply_create_with_seq(contact, seq)?;
            }
            Op::Replace { contact } => {
                self.apply_replace_with_seq(contact, seq)?;
            }
            Op::Remove { id } => {
                self.apply_remove_with_seq(id, seq)?;
            }
        }
        Ok(())
    }

    /// Looks up a contact by id.
    pub fn get(&self, id: ContactId) -> Option<&ContactRecord> {
        self.records.get(&id)
    }

    /// Cloning variant of [`ContactStore::get`].
    pub fn get_cloned(&self, id: ContactId) -> Option<ContactRecord> {
        self.get(id).cloned()
    }

    /// Looks up the contact holding `email`, if any.
    pub fn find_by_email(&self, email: &str) -> Option<&ContactRecord> {
        self.by_email.get(email).and_then(|id| self.records.get(id))
    }

    /// All live contacts in insertion order.
    pub fn all(&self) -> Vec<&ContactRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Cloning variant of [`ContactStore::all`].
    pub fn all_cloned(&self) -> Vec<ContactRecord> {
        self.all().into_iter().cloned().collect()
    }

    /// Live contact ids in insertion order.
    pub fn ordered_ids(&self) -> &[ContactId] {
        &self.order
    }

    /// Number of live contacts.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no contacts are live.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Highest operation sequence applied so far (0 when empty).
    pub fn latest_op_seq(&self) -> OpSeq {
        self.next_op_seq.saturating_sub(1)
    }

    fn apply_create(&mut self, contact: ContactRecord) -> Result<StoredOp, StoreError> {
        let seq = self.alloc_seq();
        self.apply_create_with_seq(contact, seq)
    }

    fn apply_create_with_seq(
        &mut self,
        contact: ContactRecord,
        seq: OpSeq,
    ) -> Result<StoredOp, StoreError> {
        if self.records.contains_key(&contact.id) {
            return Err(StoreError::AlreadyExists(contact.id));
        }
        if let Some(&holder) = self.by_email.get(contact.email.as_str()) {
            return Err(StoreError::DuplicateEmail {
                email: contact.email.clone(),
                holder,
            });
        }

        let id = contact.id;
        self.next_contact_id = self.next_contact_id.max(id.saturating_add(1));
        self.by_email.insert(contact.email.clone(), id);
        self.order.push(id);
        self.pos.insert(id, self.order.len() - 1);
        self.records.insert(id, contact.clone());

        self.observe_seq(seq);
        Ok(stamp(seq, Op::Create { contact }))
    }

    fn apply_replace(&mut self, contact: ContactRecord) -> Result<StoredOp, StoreError> {
        let seq = self.alloc_seq();
        self.apply_replace_with_seq(contact, seq)
    }

    fn apply_replace_with_seq(
        &mut self,
        contact: ContactRecord,
        seq: OpSeq,
    ) -> Result<StoredOp, StoreError> {
        let id = contact.id;
        let old_email = self
            .records
            .get(&id)
            .ok_or(StoreError::MissingContact(id))?
            .email
            .clone();

        if let Some(&holder) = self.by_email.get(contact.email.as_str()) {
            if holder != id {
                return Err(StoreError::DuplicateEmail {
                    email: contact.email.clone(),
                    holder,
                });
            }
        }

        if contact.email != old_email {
            self.by_email.remove(old_email.as_str());
            self.by_email.insert(contact.email.clone(), id);
        }
        self.records.insert(id, contact.clone());

        self.observe_seq(seq);
        Ok(stamp(seq, Op::Replace { contact }))
    }

    fn apply_remove(&mut self, id: ContactId) -> Result<(ContactRecord, StoredOp), StoreError> {
        let seq = self.alloc_seq();
        self.apply_remove_with_seq(id, seq)
    }

    fn apply_remove_with_seq(
        &mut self,
        id: ContactId,
        seq: OpSeq,
    ) -> Result<(ContactRecord, StoredOp), StoreError> {
        let contact = self
            .records
            .remove(&id)
            .ok_or(StoreError::MissingContact(id))?;
        self.by_email.remove(contact.email.as_str());
        self.detach_from_order(id);

        self.observe_seq(seq);
        Ok((contact, stamp(seq, Op::Remove { id })))
    }

    fn detach_from_order(&mut self, id: ContactId) {
        if let Some(idx) = self.pos.remove(&id) {
            self.order.remove(idx);
            for (offset, later) in self.order[idx..].iter().enumerate() {
                self.pos.insert(*later, idx + offset);
            }
        }
    }

    fn alloc_seq(&mut self) -> OpSeq {
        let seq = self.next_op_seq;
        self.next_op_seq += 1;
        seq
    }

    /// Keeps the allocator ahead of any sequence seen during replay.
    fn observe_seq(&mut self, seq: OpSeq) {
        let past = seq.saturating_add(1);
        if past > self.next_op_seq {
            self.next_op_seq = past;
        }
    }
}

fn stamp(seq: OpSeq, op: Op) -> StoredOp {
    StoredOp {
        seq,
        ts_ms: now_ms(),
        op,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
