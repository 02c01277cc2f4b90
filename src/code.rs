//! Share code generation.
//!
//! Codes are drawn uniformly from an alphabet that excludes visually
//! ambiguous glyphs (0/O, 1/l/I), so they survive being read out loud or
//! retyped from a screenshot. The generator is purely probabilistic;
//! uniqueness is enforced by the metadata store's primary key, with the
//! upload service retrying on collision.

use rand::Rng;

/// Alphabet for share codes. No 0/O, no 1/l/I.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789abcdefghijkmnpqrstuvwxyz";

/// Default share code length.
pub const DEFAULT_CODE_LENGTH: usize = 7;

/// Generator for short share codes.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    /// Create a generator producing codes of the given length.
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// The configured code length.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Generate a fresh code.
    ///
    /// Each character is drawn independently and uniformly from
    /// [`CODE_ALPHABET`].
    pub fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| {
                let idx = rng.random_range(0..CODE_ALPHABET.len());
                CODE_ALPHABET[idx] as char
            })
            .collect()
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}
