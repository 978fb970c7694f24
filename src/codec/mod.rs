//! Key and Record Codecs
//!
//! Everything between a caller's `(name, namespace, value, expiry)` and the
//! flat strings a backing store holds.
//!
//! ```text
//!  (name, namespace) ──> build_key ──> "namespace-name"
//!  (value, expiry)   ──> encode    ──> {"value":..,"expiresAt":..}
//!  raw text          ──> decode    ──> Decoded ──resolve(now)──> Option<Value>
//! ```
//!
//! Both codecs are pure: no I/O, no clock reads except where a caller asks
//! for [`now_millis`].

pub mod key;
pub mod record;

pub use key::{build_key, LogicalKey, KEY_SEPARATOR};
pub use record::{decode, encode, now_millis, Decoded, Expiry, StoredRecord};
