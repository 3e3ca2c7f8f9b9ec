//! Event signing helper.
//!
//! Prints the signature an event producer must send with a record:
//!
//! ```text
//! SHARED_SECRET=... eventgate-sign '{"event":"abc","character_id":"1","utc_timestamp":"2022-01-05T01:26:09"}'
//! echo '{...}' | SHARED_SECRET=... eventgate-sign
//! ```

use std::env;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};

use eventgate::{sign, EventRecord, SharedSecret};

fn main() -> Result<()> {
    let secret = env::var("SHARED_SECRET").context("SHARED_SECRET is not set")?;
    if secret.trim().is_empty() {
        bail!("SHARED_SECRET is empty");
    }

    let record = read_record(env::args().nth(1), io::stdin())?;

    println!("{}", sign(&record, &SharedSecret::new(secret)));

    Ok(())
}

/// Parse the record from the first argument, or from `input` when absent.
fn read_record(arg: Option<String>, mut input: impl Read) -> Result<EventRecord> {
    let raw = match arg {
        Some(arg) => arg,
        None => {
            let mut buf = String::new();
            input
                .read_to_string(&mut buf)
                .context("Failed to read record from stdin")?;
            buf
        }
    };

    EventRecord::from_json(&raw).context("Record must be a JSON event object")
}
