//! The authoritative in-memory contact state.

/// Secondary lookup maps kept beside the store.
pub mod indices;
/// Contact store: insertion order, id allocation, email uniqueness.
pub mod store;
