//! Random identifier generation for virtual users
//!
//! Every VU instance owns a room and a user identifier of the form
//! `room-xxxxx` / `user-xxxxx`, where each `x` is drawn uniformly from the
//! 36-symbol alphabet `[a-z0-9]`.

use crate::constants::{ID_SUFFIX_LEN, ROOM_ID_PREFIX, USER_ID_PREFIX};
use rand::Rng;

/// Symbols identifiers are drawn from
pub const ID_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate `len` random alphabet symbols using the thread-local RNG
pub fn random_string(len: usize) -> String {
    random_string_with(&mut rand::rng(), len)
}

/// Generate `len` random alphabet symbols from the given RNG
pub fn random_string_with<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Generate a fresh room identifier
pub fn room_id() -> String {
    format!("{}{}", ROOM_ID_PREFIX, random_string(ID_SUFFIX_LEN))
}

/// Generate a fresh user identifier
pub fn user_id() -> String {
    format!("{}{}", USER_ID_PREFIX, random_string(ID_SUFFIX_LEN))
}
