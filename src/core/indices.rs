use hashbrown::HashMap;

use crate::types::ContactId;

/// One-to-one index from a unique key to the contact holding it.
pub type UniqueIndex<K> = HashMap<K, ContactId>;
