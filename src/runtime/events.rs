//! Notifications broadcast by the runtime to its subscribers.

use crate::types::{ContactId, OpSeq};

/// What just happened inside the directory task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    /// A contact joined the directory.
    Created {
        /// Id assigned to the new contact.
        id: ContactId,
    },
    /// A contact was rewritten in place.
    Updated {
        /// Id of the rewritten contact.
        id: ContactId,
    },
    /// A contact was removed.
    Deleted {
        /// Id of the removed contact.
        id: ContactId,
    },
    /// The journal now covers everything up to this sequence.
    DurableUpTo {
        /// Highest op sequence known durable.
        op_seq: OpSeq,
    },
}
