//! Async runtime that owns the store: one task applies every mutation.

/// Broadcast payloads observers receive.
pub mod events;
/// Task spawn, handle, and persistence worker.
pub mod handle;
