//! # Generate
//!
//! Random identifiers used on the wire: request identifiers, authorization
//! code lookup keys, and other artifacts that must be unguessable.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;

/// Generate a 256-bit identifier used to key an in-flight authorization
/// request in the request cache.
#[must_use]
pub fn request_id() -> String {
    random(32)
}

/// Generate a 256-bit lookup key under which an authorization code's
/// ciphertext is cached. The key, not the ciphertext, is handed to the
/// client.
#[must_use]
pub fn code_key() -> String {
    random(32)
}

fn random(len: usize) -> String {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    Base64UrlUnpadded::encode_string(&buf)
}
