//! Keystream derivation.
//!
//! The keystream is the same length as the key and is a pure function of
//! the key bytes. For a key of length `L` with `total = Σ key[i]` and
//! `average = total / L` (integer division):
//!
//! ```text
//! stream[i] = (key[i] + trunc(sin(i + L) * average) * total) mod 256
//! ```
//!
//! The sine swing is truncated toward zero *before* the multiply and the
//! add, and the final reduction is a true mathematical modulo, so negative
//! intermediates land in `[0, 256)`.

/// Byte sequence derived from key material, consumed cyclically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystream {
    bytes: Vec<u8>,
}

impl Keystream {
    /// Derive the keystream for `key`. An empty key yields an empty stream.
    pub fn derive(key: &[u8]) -> Self {
        if key.is_empty() {
            return Self { bytes: Vec::new() };
        }

        let len = key.len();
        let total: i64 = key.iter().map(|&b| i64::from(b)).sum();
        let average = total / len as i64;

        let bytes = key
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                // `as i64` truncates toward zero, matching the wire format.
                let swing = (((i + len) as f64).sin() * average as f64) as i64;
                (i64::from(b) + swing * total).rem_euclid(256) as u8
            })
            .collect();

        Self { bytes }
    }

    /// Stream byte for position `index`, wrapping modulo the stream length.
    /// An empty stream always yields 0.
    pub fn byte_at(&self, index: usize) -> u8 {
        if self.bytes.is_empty() {
            0
        } else {
            self.bytes[index % self.bytes.len()]
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
