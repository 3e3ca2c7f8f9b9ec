//! Event signature computation and verification.
//!
//! Clients sign events with HMAC-SHA512 over the canonical record bytes and
//! send the lowercase hex digest as the `signature` query parameter.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::canonical::{canonicalize, EventRecord};

type HmacSha512 = Hmac<Sha512>;

/// Shared HMAC key, zeroed when dropped.
///
/// Has no `Display` or `Serialize` impl so it cannot end up in logs or
/// responses by accident.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    inner: Vec<u8>,
}

impl SharedSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: secret.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.inner
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(***)")
    }
}

/// Outcome of checking a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid,
}

impl Verification {
    pub fn is_valid(self) -> bool {
        matches!(self, Verification::Valid)
    }
}

/// Lowercase hex HMAC-SHA512 of the canonical record, `None` if the key is unusable.
fn mac_hex(record: &EventRecord, secret: &SharedSecret) -> Option<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(&canonicalize(record));
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Compute the lowercase hex signature of a record.
///
/// For producers and tests; request handling goes through [`verify`].
pub fn sign(record: &EventRecord, secret: &SharedSecret) -> String {
    mac_hex(record, secret).expect("HMAC accepts keys of any length")
}

/// Check `signature` against the MAC of `record`.
///
/// Comparison is exact and case-sensitive. Malformed input of any kind
/// (wrong length, non-hex, uppercase) is simply `Invalid`.
pub fn verify(record: &EventRecord, signature: &str, secret: &SharedSecret) -> Verification {
    let expected = match mac_hex(record, secret) {
        Some(mac) => mac,
        None => {
            warn!("event_signature_invalid_key");
            return Verification::Invalid;
        }
    };

    if constant_time_compare(&expected, signature) {
        Verification::Valid
    } else {
        debug!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "event_signature_mismatch"
        );
        Verification::Invalid
    }
}

/// Byte comparison whose duration does not depend on where the inputs differ.
///
/// Only the lengths, which are public, may end the comparison early.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
