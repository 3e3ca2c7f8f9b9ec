//! Event signature protocol.
//!
//! ```text
//! EventRecord → canonicalize() → HMAC-SHA512(secret) → hex → constant-time compare
//! ```

pub mod canonical;
pub mod verifier;

pub use canonical::{canonicalize, EventRecord, CANONICAL_VERSION};
pub use verifier::{sign, verify, SharedSecret, Verification};
