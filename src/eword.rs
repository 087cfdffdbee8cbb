//! Encrypted memory-cell values.

use crate::codec::load_word;
use crate::params::{Word, C_BYTES, WORD_BYTES};

/// One memory cell. Either a sealed word ciphertext, produced and
/// consumed only by the SE, or a revealed plaintext word emitted by a
/// reveal-tagged multi-instruction. The two cannot be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eword {
    Sealed([u8; C_BYTES]),
    Revealed(Word),
}

impl Eword {
    /// The cell read as a clear word: a revealed value directly, or the
    /// first `WORD_BYTES` of a sealed ciphertext (the slot-envelope
    /// convention the output decoder relies on).
    pub fn clear_word(&self) -> Word {
        match self {
            Eword::Revealed(w) => *w,
            // Slice is in range; load cannot fail.
            Eword::Sealed(bytes) => load_word(&bytes[..WORD_BYTES], WORD_BYTES).unwrap_or(0),
        }
    }

    /// The sealed ciphertext, if this cell holds one.
    pub fn sealed(&self) -> Option<&[u8; C_BYTES]> {
        match self {
            Eword::Sealed(bytes) => Some(bytes),
            Eword::Revealed(_) => None,
        }
    }
}
