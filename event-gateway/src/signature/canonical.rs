//! Canonical byte encoding of an event record.
//!
//! Signers and the receiver compute the MAC over these bytes, so any change to
//! field order, key names, quoting or spacing breaks every existing client.
//!
//! ## Encoding (v1)
//!
//! ```text
//! {'event': 'abc', 'character_id': '58483181', 'utc_timestamp': '2022-01-05T01:26:09'}
//! ```
//!
//! Values are single-quoted, or double-quoted when they contain `'` but no `"`.
//! Backslashes, the active quote, control bytes and non-ASCII code points are
//! escaped (`\\`, `\'`, `\t`, `\xNN`, `\uNNNN`, `\UNNNNNNNN`), so the output is
//! pure ASCII and no two distinct records share a canonical form.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// Version tag of the canonical encoding implemented here.
pub const CANONICAL_VERSION: &str = "v1";

/// Inbound event notification.
///
/// Field order here is also the canonical field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventRecord {
    /// Event identifier
    pub event: String,
    /// Character the event refers to
    pub character_id: String,
    /// Event time, ISO-8601 recommended but not validated
    pub utc_timestamp: String,
}

impl EventRecord {
    pub fn new(
        event: impl Into<String>,
        character_id: impl Into<String>,
        utc_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            event: event.into(),
            character_id: character_id.into(),
            utc_timestamp: utc_timestamp.into(),
        }
    }

    /// Parse a record from JSON text, ignoring surrounding whitespace.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw.trim())
    }

    /// Canonical bytes of this record.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonicalize(self)
    }
}

/// Serialize a record into its canonical ASCII byte sequence.
pub fn canonicalize(record: &EventRecord) -> Vec<u8> {
    let fields = [
        ("event", record.event.as_str()),
        ("character_id", record.character_id.as_str()),
        ("utc_timestamp", record.utc_timestamp.as_str()),
    ];

    let mut out = String::with_capacity(96);
    out.push('{');
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_quoted(&mut out, key);
        out.push_str(": ");
        push_quoted(&mut out, value);
    }
    out.push('}');

    out.into_bytes()
}

/// Append `value` as an ASCII-only quoted literal.
fn push_quoted(out: &mut String, value: &str) {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' if quote == '\'' => out.push_str("\\'"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' '..='~' => out.push(c),
            // Writing to a String cannot fail.
            c if (c as u32) < 0x100 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) < 0x10000 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push(quote);
}
