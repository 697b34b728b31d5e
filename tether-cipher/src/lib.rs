//! Keystream obfuscation for payloads in transit.
//!
//! This is a reversible byte-stream obfuscator, **not** a secure cipher:
//! the keystream is a fixed function of the key, there is no nonce, and no
//! authentication. It exists so mirrored files are not trivially readable
//! on the wire, and its output must stay bit-compatible with existing
//! servers — do not "fix" the derivation.
//!
//! Public API surface:
//! - [`Keystream`] — derived byte sequence, consumed cyclically
//! - [`encrypt`] / [`decrypt`] — modular addition/subtraction per byte
//! - [`generate_key`] — random printable-ASCII key for operators

pub mod keystream;

use rand::Rng;

pub use keystream::Keystream;

/// Default length for operator-generated keys.
pub const DEFAULT_KEY_LEN: usize = 16;

/// Obfuscate `data` under `key`: each output byte is
/// `(data[i] + keystream[i mod L]) mod 256`.
///
/// An empty key yields an empty keystream, which leaves the data unchanged.
pub fn encrypt(data: &[u8], key: &[u8]) -> Vec<u8> {
    let stream = Keystream::derive(key);
    data.iter()
        .enumerate()
        .map(|(i, &b)| b.wrapping_add(stream.byte_at(i)))
        .collect()
}

/// Mirror of [`encrypt`]: `(data[i] - keystream[i mod L]) mod 256`.
pub fn decrypt(data: &[u8], key: &[u8]) -> Vec<u8> {
    let stream = Keystream::derive(key);
    data.iter()
        .enumerate()
        .map(|(i, &b)| b.wrapping_sub(stream.byte_at(i)))
        .collect()
}

/// Generate a random key of [`DEFAULT_KEY_LEN`] printable-ASCII characters.
///
/// Convenience for operators configuring a shared secret; the key itself is
/// never sent over the wire.
pub fn generate_key() -> String {
    generate_key_of(DEFAULT_KEY_LEN)
}

/// Generate a random key of `length` characters, each drawn uniformly from
/// code points `[33, 127)`.
pub fn generate_key_of(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| rng.gen_range(33u8..127) as char)
        .collect()
}
