//! Process-wide SE key material.
//!
//! A deployed secure element carries one symmetric key `K_SE` for all
//! internal AEAD operations and one X25519 keypair to unseal the
//! per-program shared-key envelope. Both are build-time constants here;
//! in production they would be provisioned per device. Functions take a
//! `&SeKeys` parameter rather than reaching for hidden globals, so
//! tests can substitute their own material.

use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroize;

use crate::params::{SHAREDKEY_BYTES, X25519_KEY_BYTES};

// Build-time device keys. K_SE:
const K_SE: [u8; SHAREDKEY_BYTES] = [
    0x2E, 0x0A, 0x9B, 0x11, 0x5C, 0xD6, 0x31, 0x48, 0x7F, 0x02, 0xE3, 0x8D, 0xB4, 0x66, 0x0D,
    0x95, 0x1A, 0xC7, 0x54, 0x20, 0xF0, 0x83, 0x6B, 0xDA, 0x49, 0x3E, 0x91, 0x07, 0xC5, 0x28,
    0xBE, 0x72,
];

// priv_SE (pub_SE is derived from it):
const PRIV_SE: [u8; X25519_KEY_BYTES] = [
    0x2D, 0xC8, 0x72, 0x0F, 0xD4, 0x96, 0x4E, 0x38, 0x74, 0x92, 0x22, 0xAA, 0xF5, 0x00, 0x6B,
    0xC8, 0xAF, 0x6D, 0x4C, 0xC6, 0x78, 0x85, 0xB0, 0x08, 0x31, 0x83, 0x80, 0xC9, 0xC0, 0x14,
    0x79, 0xB0,
];

/// The SE's key material: symmetric `K_SE` plus the unsealing keypair.
pub struct SeKeys {
    pub(crate) k_se: [u8; SHAREDKEY_BYTES],
    pub(crate) secret: StaticSecret,
    pub(crate) public: X25519Public,
}

impl SeKeys {
    /// The keys embedded in this build.
    pub fn builtin() -> Self {
        Self::from_parts(K_SE, PRIV_SE)
    }

    /// Assemble keys from raw bytes; the public half is derived from
    /// the secret so the pair cannot disagree.
    pub fn from_parts(k_se: [u8; SHAREDKEY_BYTES], secret: [u8; X25519_KEY_BYTES]) -> Self {
        let secret = StaticSecret::from(secret);
        let public = X25519Public::from(&secret);
        Self {
            k_se,
            secret,
            public,
        }
    }

    /// Fresh random keys. Test and provisioning use.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(rand_core::OsRng);
        let public = X25519Public::from(&secret);
        let mut k_se = [0u8; SHAREDKEY_BYTES];
        rand_core::RngCore::fill_bytes(&mut rand_core::OsRng, &mut k_se);
        Self {
            k_se,
            secret,
            public,
        }
    }

    /// `pub_SE`, the key programs seal their shared key to.
    pub fn public(&self) -> &X25519Public {
        &self.public
    }
}

impl Drop for SeKeys {
    fn drop(&mut self) {
        // StaticSecret zeroizes itself.
        self.k_se.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_pair_is_consistent() {
        let keys = SeKeys::builtin();
        let expected = X25519Public::from(&StaticSecret::from(PRIV_SE));
        assert_eq!(keys.public().as_bytes(), expected.as_bytes());
    }

    #[test]
    fn generated_keys_differ() {
        let a = SeKeys::generate();
        let b = SeKeys::generate();
        assert_ne!(a.k_se, b.k_se);
        assert_ne!(a.public().as_bytes(), b.public().as_bytes());
    }
}
