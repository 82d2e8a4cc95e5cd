//! Identifier generators.
//!
//! All ids lead with the current millisecond timestamp so they sort
//! roughly by creation time, and fill the rest from a CSPRNG so they stay
//! collision-resistant across a fleet.

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

/// Number of random characters in a [`long_id`] tail.
const LONG_ID_TAIL_LEN: usize = 20;

/// Length of a [`short_id`].
const SHORT_ID_LEN: usize = 8;

const ALPHANUMERIC_LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A lowercase, hyphenated UUIDv7.
pub fn uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// A UUIDv7 with the hyphens removed; used as the public block id.
pub fn public_block_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// A 32-character id: 12 hex characters of the millisecond timestamp,
/// left-padded, followed by a shuffled random hex tail.
pub fn long_id() -> String {
    let mut rng = rand::thread_rng();
    let mut tail: Vec<u8> = (0..LONG_ID_TAIL_LEN / 2)
        .flat_map(|_| {
            let byte: u8 = rng.gen();
            let encoded = hex::encode([byte]);
            encoded.into_bytes()
        })
        .collect();
    tail.shuffle(&mut rng);

    let mut id = format!("{:012x}", now_millis());
    id.push_str(&String::from_utf8(tail).expect("hex tail is always ASCII"));
    id
}

/// A short random lowercase alphanumeric id for ephemeral handles.
pub fn short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHANUMERIC_LOWER.len());
            ALPHANUMERIC_LOWER[idx] as char
        })
        .collect()
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as u64
}
