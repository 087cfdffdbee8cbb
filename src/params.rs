//! Build-time configuration of the secure element.
//!
//! The evaluator is compiled for one fixed profile; the bytecode meta
//! header must agree with every value here or the container is rejected.
//! Sizes mirror the "medium" reference profile.

/// Bytecode container format version accepted by this build.
pub const VERSION: u32 = 0;

/// Machine word width in bits. 32 and 64 are the supported widths; the
/// crate is currently built for 32.
pub const WORD_BITS: u32 = 32;

/// One machine word. Registers, constants, and memory cells all hold one.
pub type Word = u32;

/// Serialized width of a word.
pub const WORD_BYTES: usize = (WORD_BITS as usize) / 8;

/// Maximum inputs a single multi-instruction may consume (l_in).
pub const LLMI_MAX_INPUTS: usize = 16;

/// Maximum outputs a single multi-instruction may produce (l_out).
/// Also the input batch size.
pub const LLMI_MAX_OUTPUTS: usize = 16;

/// Register-file size per snippet invocation (r).
pub const REGISTER_COUNT: usize = 80;

/// Maximum instructions executed per snippet (s).
pub const LLS_MAX_LENGTH: usize = 64;

/// One input batch: exactly `LLMI_MAX_OUTPUTS` words, tail zero-padded.
pub type Batch = [Word; LLMI_MAX_OUTPUTS];

/// Serialized width of a batch.
pub const BATCH_BYTES: usize = LLMI_MAX_OUTPUTS * WORD_BYTES;

// ---------------------------------------------------------------------------
// Primitive widths (AES-256-GCM / SHA-256 / X25519 sealed box)
// ---------------------------------------------------------------------------

/// Digest width of the protocol hash.
pub const HASH_BYTES: usize = 32;

/// AEAD nonce width. Derived nonces are truncated digests.
pub const NONCE_BYTES: usize = 12;

/// AEAD authentication tag width.
pub const MAC_BYTES: usize = 16;

/// AEAD key width (also the per-program shared key K_S).
pub const SHAREDKEY_BYTES: usize = 32;

/// X25519 public/secret key width.
pub const X25519_KEY_BYTES: usize = 32;

/// Sealed-box envelope carrying K_S to the SE:
/// `ephemeral_pk[32] || ct(K_S)[SHAREDKEY_BYTES + MAC_BYTES]`.
pub const SEPUB_BYTES: usize = X25519_KEY_BYTES + SHAREDKEY_BYTES + MAC_BYTES;

// ---------------------------------------------------------------------------
// Derived ciphertext widths
// ---------------------------------------------------------------------------

/// An encrypted word: `WORD_BYTES` plaintext plus the tag.
pub const C_BYTES: usize = WORD_BYTES + MAC_BYTES;

/// An input-commitment token: AEAD of the empty plaintext, tag only.
pub const CIN_BYTES: usize = MAC_BYTES;

/// K_S re-sealed under K_SE for hot-path use (E_K).
pub const ENCRYPTED_SHAREDKEY_BYTES: usize = SHAREDKEY_BYTES + MAC_BYTES;

/// Serialized width of a 32-bit protocol field.
pub const U32_BYTES: usize = 4;

/// Serialized width of the per-LLMI reveal flag.
pub const FLAG_BYTES: usize = 1;

/// AD of an encrypted word: `producer_instrID(4) || outputID(4) || E_ID`.
pub const WORD_AD_BYTES: usize = 2 * U32_BYTES + HASH_BYTES;

/// AD of a commitment token: `H_i || i(4) || E_ID`.
pub const CIN_AD_BYTES: usize = HASH_BYTES + U32_BYTES + HASH_BYTES;

/// A protocol digest (hash-chain links, execution identity).
pub type Digest = [u8; HASH_BYTES];

/// Number of batches needed to deliver `n` program inputs.
pub const fn batch_count(n: u32) -> u32 {
    n.div_ceil(LLMI_MAX_OUTPUTS as u32)
}
