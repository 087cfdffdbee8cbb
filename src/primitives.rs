//! Concrete cryptographic primitives.
//!
//! AEAD: AES-256-GCM. Hash: SHA-256. Sealed box: X25519 + HKDF-SHA256
//! + AES-256-GCM, shaped like a libsodium sealed box:
//!
//!   sealed = ephemeral_pk[32] || AEAD(payload;
//!             key   = HKDF(dh, salt = epk || rpk, info = "sealvm|seal|v1"),
//!             nonce = trunc(SHA-256(epk || rpk)))
//!
//! The protocol specifies every AEAD nonce as a hash; the concrete
//! nonce is the digest truncated to `NONCE_BYTES`. Protocol code never
//! touches the cipher crates directly, only these wrappers.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use sha2::{Digest as _, Sha256};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use crate::params::{
    Digest, MAC_BYTES, NONCE_BYTES, SEPUB_BYTES, SHAREDKEY_BYTES, X25519_KEY_BYTES,
};

/// Domain-separation label for the sealed-box KDF.
const SEAL_INFO: &[u8] = b"sealvm|seal|v1";

/// Uniform primitive-level failure. Call sites map it onto the protocol
/// error kind of the object being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CryptoError;

pub type AeadKey = [u8; SHAREDKEY_BYTES];
pub type AeadNonce = [u8; NONCE_BYTES];

/// Hash `msg`.
pub fn hash(msg: &[u8]) -> Digest {
    let mut h = Sha256::new();
    h.update(msg);
    h.finalize().into()
}

/// Hash a 4-byte big-endian domain prefix followed by `parts`.
///
/// Every derived value in the protocol (E_ID, nonces) goes through this
/// with a distinct prefix: 0 = execution id, 1 = shared-key nonce,
/// 2 = commitment nonce, 3 = word nonce.
pub fn hash_with_prefix(prefix: u32, parts: &[&[u8]]) -> Digest {
    let mut h = Sha256::new();
    h.update(prefix.to_be_bytes());
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

/// Truncate a digest to AEAD nonce width.
pub fn derived_nonce(digest: &Digest) -> AeadNonce {
    let mut n = [0u8; NONCE_BYTES];
    n.copy_from_slice(&digest[..NONCE_BYTES]);
    n
}

/// AEAD seal. Output is `plaintext.len() + MAC_BYTES` bytes and is
/// deterministic in `(plaintext, ad, nonce, key)`.
pub(crate) fn aead_seal(
    key: &AeadKey,
    nonce: &AeadNonce,
    plaintext: &[u8],
    ad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError)?;
    let n = Nonce::from_slice(nonce);
    let payload = Payload {
        msg: plaintext,
        aad: ad,
    };
    cipher.encrypt(n, payload).map_err(|_| CryptoError)
}

/// AEAD open. Fails if the tag does not verify. Zero-length plaintexts
/// (tag-only ciphertexts) are valid.
pub(crate) fn aead_open(
    key: &AeadKey,
    nonce: &AeadNonce,
    ciphertext: &[u8],
    ad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if ciphertext.len() < MAC_BYTES {
        return Err(CryptoError);
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError)?;
    let n = Nonce::from_slice(nonce);
    let payload = Payload {
        msg: ciphertext,
        aad: ad,
    };
    cipher.decrypt(n, payload).map(Zeroizing::new).map_err(|_| CryptoError)
}

fn box_key(
    dh: &[u8],
    epk: &[u8; X25519_KEY_BYTES],
    rpk: &[u8; X25519_KEY_BYTES],
) -> Result<Zeroizing<AeadKey>, CryptoError> {
    let mut salt = [0u8; 2 * X25519_KEY_BYTES];
    salt[..X25519_KEY_BYTES].copy_from_slice(epk);
    salt[X25519_KEY_BYTES..].copy_from_slice(rpk);

    let hk = Hkdf::<Sha256>::new(Some(&salt), dh);
    let mut out = Zeroizing::new([0u8; SHAREDKEY_BYTES]);
    hk.expand(SEAL_INFO, out.as_mut()).map_err(|_| CryptoError)?;
    Ok(out)
}

fn box_nonce(epk: &[u8; X25519_KEY_BYTES], rpk: &[u8; X25519_KEY_BYTES]) -> AeadNonce {
    let mut h = Sha256::new();
    h.update(epk);
    h.update(rpk);
    let digest: Digest = h.finalize().into();
    derived_nonce(&digest)
}

/// Seal `payload` to `recipient`. Ephemeral-key side of the envelope;
/// used only by offline tooling and tests, never on the hot path.
pub(crate) fn sealed_box_seal(
    recipient: &X25519Public,
    payload: &[u8; SHAREDKEY_BYTES],
) -> Result<[u8; SEPUB_BYTES], CryptoError> {
    let eph = EphemeralSecret::random_from_rng(rand_core::OsRng);
    let epk = X25519Public::from(&eph);
    let dh = eph.diffie_hellman(recipient);

    let key = box_key(dh.as_bytes(), epk.as_bytes(), recipient.as_bytes())?;
    let nonce = box_nonce(epk.as_bytes(), recipient.as_bytes());
    let ct = aead_seal(&key, &nonce, payload, &[])?;

    let mut out = [0u8; SEPUB_BYTES];
    out[..X25519_KEY_BYTES].copy_from_slice(epk.as_bytes());
    out[X25519_KEY_BYTES..].copy_from_slice(&ct);
    Ok(out)
}

/// Open a sealed envelope addressed to `(public, secret)`.
pub(crate) fn sealed_box_open(
    sealed: &[u8],
    public: &X25519Public,
    secret: &StaticSecret,
) -> Result<Zeroizing<[u8; SHAREDKEY_BYTES]>, CryptoError> {
    if sealed.len() != SEPUB_BYTES {
        return Err(CryptoError);
    }
    let mut epk_bytes = [0u8; X25519_KEY_BYTES];
    epk_bytes.copy_from_slice(&sealed[..X25519_KEY_BYTES]);
    let epk = X25519Public::from(epk_bytes);

    let dh = secret.diffie_hellman(&epk);
    let key = box_key(dh.as_bytes(), &epk_bytes, public.as_bytes())?;
    let nonce = box_nonce(&epk_bytes, public.as_bytes());

    let pt = aead_open(&key, &nonce, &sealed[X25519_KEY_BYTES..], &[])?;
    if pt.len() != SHAREDKEY_BYTES {
        return Err(CryptoError);
    }
    let mut out = Zeroizing::new([0u8; SHAREDKEY_BYTES]);
    out.copy_from_slice(&pt);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const _: () = assert!(NONCE_BYTES <= crate::params::HASH_BYTES);

    fn keypair() -> (X25519Public, StaticSecret) {
        let sk = StaticSecret::random_from_rng(rand_core::OsRng);
        let pk = X25519Public::from(&sk);
        (pk, sk)
    }

    #[test]
    fn sealed_box_roundtrip() {
        let (pk, sk) = keypair();
        let payload = [0x5Au8; SHAREDKEY_BYTES];
        let sealed = sealed_box_seal(&pk, &payload).unwrap();
        assert_eq!(sealed.len(), SEPUB_BYTES);
        let opened = sealed_box_open(&sealed, &pk, &sk).unwrap();
        assert_eq!(opened.as_ref(), &payload);
    }

    #[test]
    fn sealed_box_rejects_tamper() {
        let (pk, sk) = keypair();
        let mut sealed = sealed_box_seal(&pk, &[7u8; SHAREDKEY_BYTES]).unwrap();
        sealed[SEPUB_BYTES - 1] ^= 1;
        assert!(sealed_box_open(&sealed, &pk, &sk).is_err());
    }

    #[test]
    fn sealed_box_rejects_wrong_recipient() {
        let (pk, _) = keypair();
        let (pk2, sk2) = keypair();
        let sealed = sealed_box_seal(&pk, &[7u8; SHAREDKEY_BYTES]).unwrap();
        assert!(sealed_box_open(&sealed, &pk2, &sk2).is_err());
    }

    #[test]
    fn prefix_separates_domains() {
        let msg = b"same message";
        assert_ne!(hash_with_prefix(0, &[msg]), hash_with_prefix(1, &[msg]));
        assert_ne!(hash_with_prefix(2, &[msg]), hash(msg));
    }

    #[test]
    fn aead_empty_plaintext_is_tag_only() {
        let key = [1u8; SHAREDKEY_BYTES];
        let nonce = [2u8; NONCE_BYTES];
        let ct = aead_seal(&key, &nonce, &[], b"ad").unwrap();
        assert_eq!(ct.len(), MAC_BYTES);
        let pt = aead_open(&key, &nonce, &ct, b"ad").unwrap();
        assert!(pt.is_empty());
        assert!(aead_open(&key, &nonce, &ct, b"other").is_err());
    }
}
