//! Authoritative in-memory contact directory with append-only SQLite
//! journaling, a JSON HTTP API, and a client-side table view.
//!
//! # Examples
//!
//! Creating a contact directly against [`core::store::ContactStore`]:
//! ```
//! use rolodex::{contact::ContactDraft, core::store::ContactStore};
//!
//! let mut store = ContactStore::new();
//! let (contact, _op) = store.create(ContactDraft {
//!     first_name: "Ada".to_string(),
//!     last_name: "Lovelace".to_string(),
//!     email: "ada@example.com".to_string(),
//!     phone_number: "555-0100".to_string(),
//!     company: None,
//!     job_title: None,
//! }).expect("create");
//! assert_eq!(contact.id, 1);
//! ```
//!
//! Serving the directory over HTTP with a SQLite journal:
//! ```no_run
//! use rolodex::{
//!     core::store::ContactStore,
//!     http::{AppState, build_router},
//!     persist::sqlite::SqliteOpSink,
//!     runtime::handle::{RuntimeConfig, spawn_directory},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = SqliteOpSink::open("rolodex.db").expect("open sqlite");
//! let store = sink.load_store().expect("replay journal");
//! let directory = spawn_directory(store, Some(Box::new(sink)), RuntimeConfig::default());
//! let app = build_router(AppState::new(directory.clone()));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await.expect("bind");
//! axum::serve(listener, app).await.expect("serve");
//! # }
//! ```
#![deny(missing_docs)]

/// In-process client: typed HTTP calls, cached table view, session glue.
pub mod client;
/// Contact records, drafts, and field identifiers.
pub mod contact;
/// The authoritative in-memory state.
pub mod core;
/// Axum router, handlers, and wire-format error mapping.
pub mod http;
/// Journal op payloads shared across layers.
pub mod op;
/// Journal sink trait plus the SQLite implementation.
pub mod persist;
/// The single-writer task and its public handle.
pub mod runtime;
/// Small shared aliases used crate-wide.
pub mod types;
