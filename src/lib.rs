//! # FlashStore - Namespaced, Expiring Key-Value Storage
//!
//! FlashStore layers JSON values, namespaces and per-record expiry on top of
//! plain string key-value stores, with two independent scopes: `local`
//! (persistent) and `session` (process lifetime). It follows the shape of
//! browser web storage, so the underlying stores only need
//! `get/set/remove/clear/key/length`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlashStore                                 │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────────────────┐ │
//! │  │  Key Codec  │───>│   Record    │───>│          Storage             │ │
//! │  │ ns-name     │    │   Codec     │    │  ┌────────────┐┌───────────┐ │ │
//! │  └─────────────┘    │ {"value"..} │    │  │   local    ││  session  │ │ │
//! │                     └─────────────┘    │  └─────┬──────┘└─────┬─────┘ │ │
//! │                                        └────────┼─────────────┼───────┘ │
//! │                                                 ▼             ▼         │
//! │                                            FileStore     MemoryStore    │
//! │                                                                         │
//! │                     ┌─────────────────────────────────────────────────┐ │
//! │                     │     ExpirySweeper (optional Tokio task)         │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashstore::{Expiry, LogicalKey, Storage};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let storage = Storage::in_memory();
//!
//! // Plain values
//! storage.local().set("theme", "dark", None).unwrap();
//!
//! // Namespaced, expiring values
//! let token = LogicalKey::new("token").in_namespace("auth");
//! storage
//!     .session()
//!     .set(&token, "abc123", Some(Expiry::after(Duration::from_secs(3600))))
//!     .unwrap();
//!
//! // Object values merge on update
//! storage.local().set("cart", &json!({"items": 1}), None).unwrap();
//! storage.local().update("cart", &json!({"total": 9.5}), None).unwrap();
//!
//! assert_eq!(storage.local().get("theme").unwrap(), Some(json!("dark")));
//! assert!(storage.session().has(&token).unwrap());
//! assert_eq!(
//!     storage.local().get("cart").unwrap(),
//!     Some(json!({"items": 1, "total": 9.5}))
//! );
//! ```
//!
//! ## Module Overview
//!
//! - [`codec`]: key construction and the persisted record format
//! - [`store`]: the backing-store trait plus memory and file implementations
//! - [`storage`]: the scoped facade, deep merge and the optional sweeper
//! - [`error`]: the shared error type
//!
//! ## Expiry
//!
//! Expiry is lazy:
//! 1. **On read**: `get`/`has`/`update` delete an expired record they touch
//! 2. **On construction**: `Storage::new` sweeps both scopes once
//!
//! An [`ExpirySweeper`] can be started explicitly for periodic sweeps.

pub mod codec;
pub mod error;
pub mod storage;
pub mod store;

// Re-export commonly used types for convenience
pub use codec::{build_key, Expiry, LogicalKey};
pub use error::{StoreError, StoreResult};
pub use storage::{
    start_expiry_sweeper, ExpiryConfig, ExpirySweeper, Scope, ScopedStorage, Storage,
    StorageStats,
};
pub use store::{BackingStore, FileStore, MemoryStore};

/// Version of FlashStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
