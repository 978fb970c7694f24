//! Storage Facade Module
//!
//! This module composes the key codec, the record codec and a pair of
//! backing stores into the user-facing API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Storage                             │
//! │   ┌──────────────────────┐   ┌──────────────────────┐       │
//! │   │ ScopedStorage(local) │   │ScopedStorage(session)│       │
//! │   │   get/set/update/..  │   │   get/set/update/..  │       │
//! │   └──────────┬───────────┘   └──────────┬───────────┘       │
//! │              ▼                          ▼                   │
//! │      BackingStore (file)       BackingStore (memory)        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ optional
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Namespaces**: `namespace-name` keys within one scope
//! - **Expiry**: absolute per-record expiry, enforced on read
//! - **Construction Sweep**: expired records removed when `Storage` is built
//! - **Deep Merge**: `update` merges objects key by key
//!
//! ## Example
//!
//! ```
//! use flashstore::storage::Storage;
//! use serde_json::json;
//!
//! let storage = Storage::in_memory();
//!
//! storage.local().set("profile", &json!({"name": "Ariz"}), None).unwrap();
//! storage.local().update("profile", &json!({"lang": "en"}), None).unwrap();
//!
//! assert_eq!(
//!     storage.local().get("profile").unwrap(),
//!     Some(json!({"name": "Ariz", "lang": "en"}))
//! );
//! ```

pub mod engine;
pub mod expiry;
pub mod merge;

// Re-export commonly used types
pub use engine::{Scope, ScopedStorage, Storage, StorageStats};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper};
pub use merge::deep_merge;
