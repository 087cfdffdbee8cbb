//! Input hash chain.
//!
//! Successive input batches are bound into a chain
//! `H_i = Hash(H_{i-1} || batch_bytes(X_i))` with `H_0 = 0…0`.
//! `H_i` depends on `(X_1 … X_i)` alone, so the terminus `H_L` commits
//! the whole input sequence.

use sha2::{Digest as _, Sha256};

use crate::codec::batch_to_bytes;
use crate::params::{Batch, Digest, HASH_BYTES};

/// The chain origin.
pub const H0: Digest = [0u8; HASH_BYTES];

/// One chain step.
pub fn chain_step(prev: &Digest, batch: &Batch) -> Digest {
    let mut h = Sha256::new();
    h.update(prev);
    h.update(batch_to_bytes(batch));
    h.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let batch: Batch = [3; 16];
        assert_eq!(chain_step(&H0, &batch), chain_step(&H0, &batch));
    }

    #[test]
    fn depends_on_batch_and_prev() {
        let a: Batch = [1; 16];
        let mut b = a;
        b[15] = 2;
        assert_ne!(chain_step(&H0, &a), chain_step(&H0, &b));

        let h1 = chain_step(&H0, &a);
        assert_ne!(chain_step(&h1, &a), chain_step(&H0, &a));
    }
}
