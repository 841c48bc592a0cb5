//! Journal operation types shared by the store and the persistence layer.

use serde::{Deserialize, Serialize};

use crate::{
    contact::ContactRecord,
    types::{ContactId, OpSeq},
};

/// Current payload version written into [`StoredOpEnvelope`] rows.
pub const OP_FORMAT_VERSION: u16 = 1;

/// One state mutation, as recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// A new contact entered the directory.
    Create {
        /// The record as created.
        contact: ContactRecord,
    },
    /// Every field of an existing contact was rewritten.
    Replace {
        /// The full replacement; `contact.id` names the target.
        contact: ContactRecord,
    },
    /// A contact left the directory.
    Remove {
        /// Id of the removed contact.
        id: ContactId,
    },
}

impl Op {
    /// Id of the contact this operation touches.
    pub fn contact_id(&self) -> ContactId {
        match self {
            Op::Create { contact } | Op::Replace { contact } => contact.id,
            Op::Remove { id } => *id,
        }
    }
}

/// An [`Op`] stamped with its journal position and wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOp {
    /// Position in the journal, starting at 1.
    pub seq: OpSeq,
    /// Milliseconds since the Unix epoch at apply time.
    pub ts_ms: u64,
    /// The mutation itself.
    pub op: Op,
}

/// On-disk wrapper that lets older binaries refuse newer payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOpEnvelope {
    /// Version of the serialized layout.
    pub format_version: u16,
    /// The wrapped operation.
    pub stored: StoredOp,
}

impl StoredOpEnvelope {
    /// Wraps an op for writing, stamped with [`OP_FORMAT_VERSION`].
    pub fn seal(stored: StoredOp) -> Self {
        Self {
            format_version: OP_FORMAT_VERSION,
            stored,
        }
    }

    /// Unwraps a decoded envelope, rejecting unknown versions.
    ///
    /// The error carries the version that was found.
    pub fn open(self) -> Result<StoredOp, u16> {
        if self.format_version == OP_FORMAT_VERSION {
            Ok(self.stored)
        } else {
            Err(self.format_version)
        }
    }
}
