//! # comptoir-store: Durable Key-Value Store for Comptoir
//!
//! Keeps the session token and user record across process restarts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Comptoir Session Data Flow                       │
//! │                                                                         │
//! │  SessionManager (comptoir-client)                                      │
//! │       │  get / set_many / delete_many                                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  comptoir-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ KeyValueStore │    │  SqliteStore  │    │  Migrations  │  │   │
//! │  │   │   (kv.rs)     │◄───│  (sqlite.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ async trait   │◄─┐ │ SqlitePool    │    │ 001_kv.sql   │  │   │
//! │  │   └───────────────┘  │ └───────────────┘    └──────────────┘  │   │
//! │  │                      │ ┌───────────────┐                      │   │
//! │  │                      └─│  MemoryStore  │  tests / ephemeral   │   │
//! │  │                        └───────────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ~/.local/share/comptoir/session.db                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`kv`] - The `KeyValueStore` trait and well-known keys
//! - [`sqlite`] - SQLite-backed store and its configuration
//! - [`memory`] - In-memory store
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use comptoir_store::{keys, KeyValueStore, SqliteStore, StoreConfig};
//!
//! let store = SqliteStore::open(StoreConfig::new("session.db")).await?;
//! store.set_many(&[(keys::TOKEN, "abc"), (keys::USER, r#"{"id":1}"#)]).await?;
//! assert_eq!(store.get(keys::TOKEN).await?.as_deref(), Some("abc"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod kv;
pub mod memory;
pub mod migrations;
pub mod sqlite;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use kv::{keys, KeyValueStore};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoreConfig};
