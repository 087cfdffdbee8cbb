//! The secure-element API: `start`, `input`, `eval`.
//!
//! These three primitives are the trust boundary. Everything the host
//! hands across it is authenticated: the sealed shared key, the
//! commitment tokens chaining the input batches, the snippet
//! ciphertexts, and every register-sized word. Nonces are derived, so
//! each primitive is a pure function of its arguments and the device
//! keys.
//!
//! Domain prefixes: 0 = execution identity, 1 = shared-key nonce,
//! 2 = commitment nonce, 3 = word nonce.

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::codec::{load_u32, load_word, word_to_bytes};
use crate::container::{snippet_ad, Aells, Widths};
use crate::error::Error;
use crate::eword::Eword;
use crate::hashchain::{chain_step, H0};
use crate::keys::SeKeys;
use crate::params::{
    batch_count, Batch, Digest, Word, CIN_AD_BYTES, CIN_BYTES, ENCRYPTED_SHAREDKEY_BYTES,
    HASH_BYTES, LLMI_MAX_INPUTS, LLMI_MAX_OUTPUTS, NONCE_BYTES, REGISTER_COUNT, SEPUB_BYTES,
    SHAREDKEY_BYTES, U32_BYTES, WORD_AD_BYTES, WORD_BYTES,
};
use crate::primitives::{
    aead_open, aead_seal, derived_nonce, hash_with_prefix, sealed_box_open, AeadNonce,
};
use crate::vm;

/// K_S re-encrypted under K_SE (E_K).
pub type EncSharedKey = [u8; ENCRYPTED_SHAREDKEY_BYTES];

/// An input-commitment token (C^in_i).
pub type CommitToken = [u8; CIN_BYTES];

/// What `start` hands back to the host.
pub struct StartArtifacts {
    /// E_K, consumed by every later `eval`.
    pub enc_shared_key: EncSharedKey,
    /// E_ID, the execution identity.
    pub exec_id: Digest,
    /// C^in_L, the head of the commitment chain.
    pub commit_last: CommitToken,
}

/// What `input` hands back per batch.
#[derive(Debug)]
pub struct InputArtifacts {
    /// C^in_{i-1}, unlocking the previous batch.
    pub commit_prev: CommitToken,
    /// The batch's words, sealed and position-bound.
    pub words: [Eword; LLMI_MAX_OUTPUTS],
}

fn shared_key_nonce(exec_id: &Digest) -> AeadNonce {
    derived_nonce(&hash_with_prefix(1, &[exec_id]))
}

fn commit_nonce(exec_id: &Digest, index: u32) -> AeadNonce {
    derived_nonce(&hash_with_prefix(2, &[exec_id, &index.to_be_bytes()]))
}

fn commit_ad(h: &Digest, index: u32, exec_id: &Digest) -> [u8; CIN_AD_BYTES] {
    let mut ad = [0u8; CIN_AD_BYTES];
    ad[..HASH_BYTES].copy_from_slice(h);
    ad[HASH_BYTES..HASH_BYTES + U32_BYTES].copy_from_slice(&index.to_be_bytes());
    ad[HASH_BYTES + U32_BYTES..].copy_from_slice(exec_id);
    ad
}

fn word_ad(producer: u32, output: u32, exec_id: &Digest) -> [u8; WORD_AD_BYTES] {
    let mut ad = [0u8; WORD_AD_BYTES];
    ad[..U32_BYTES].copy_from_slice(&producer.to_be_bytes());
    ad[U32_BYTES..2 * U32_BYTES].copy_from_slice(&output.to_be_bytes());
    ad[2 * U32_BYTES..].copy_from_slice(exec_id);
    ad
}

fn word_nonce(ad: &[u8; WORD_AD_BYTES]) -> AeadNonce {
    derived_nonce(&hash_with_prefix(3, &[ad]))
}

/// Snippet nonce: a zero buffer with the big-endian instruction ID in
/// its last four bytes.
pub(crate) fn snippet_nonce(instr_id: u32) -> AeadNonce {
    let mut nonce = [0u8; NONCE_BYTES];
    nonce[NONCE_BYTES - U32_BYTES..].copy_from_slice(&instr_id.to_be_bytes());
    nonce
}

/// The secure element. Holds only key material; every operation is a
/// pure function of its inputs.
pub struct SecureElement<'k> {
    keys: &'k SeKeys,
}

impl<'k> SecureElement<'k> {
    pub fn new(keys: &'k SeKeys) -> Self {
        Self { keys }
    }

    /// SEstart: derive the execution identity, unseal the per-program
    /// shared key, re-seal it under K_SE, and emit the commitment-chain
    /// head for batch L.
    ///
    /// `se_header` is the sealed envelope followed by the `lb_m`-byte
    /// program-input count.
    pub fn start(
        &self,
        se_header: &[u8],
        lb_m: usize,
        h_last: &Digest,
    ) -> Result<StartArtifacts, Error> {
        if se_header.len() < SEPUB_BYTES + lb_m {
            return Err(Error::UnexpectedEof);
        }

        let exec_id = hash_with_prefix(0, &[h_last, se_header]);

        let shared_key = sealed_box_open(
            &se_header[..SEPUB_BYTES],
            &self.keys.public,
            &self.keys.secret,
        )
        .map_err(|_| Error::SealOpenFail)?;

        let enc_shared_key: EncSharedKey = aead_seal(
            &self.keys.k_se,
            &shared_key_nonce(&exec_id),
            shared_key.as_ref(),
            &[],
        )
        .map_err(|_| Error::SealFail)?
        .try_into()
        .map_err(|_| Error::SealFail)?;

        let n = load_u32(&se_header[SEPUB_BYTES..], lb_m)?;
        let last = batch_count(n);

        let commit_last: CommitToken = aead_seal(
            &self.keys.k_se,
            &commit_nonce(&exec_id, last),
            &[],
            &commit_ad(h_last, last, &exec_id),
        )
        .map_err(|_| Error::ProtocolFail { batch: last })?
        .try_into()
        .map_err(|_| Error::ProtocolFail { batch: last })?;

        Ok(StartArtifacts {
            enc_shared_key,
            exec_id,
            commit_last,
        })
    }

    /// SEinput: verify the commitment for batch `index`, release the
    /// token for batch `index - 1`, and seal the batch's words bound to
    /// their `(batch, position, execution)` identity.
    pub fn input(
        &self,
        exec_id: &Digest,
        index: u32,
        h_prev: &Digest,
        batch: &Batch,
        token: &CommitToken,
    ) -> Result<InputArtifacts, Error> {
        if index < 1 {
            return Err(Error::ProtocolFail { batch: index });
        }
        // The chain terminates at H_0 = 0…0; anything else under
        // index 1 is a forgery.
        if index == 1 && !bool::from(h_prev.ct_eq(&H0)) {
            return Err(Error::ProtocolFail { batch: index });
        }

        let h_cur = chain_step(h_prev, batch);

        let opened = aead_open(
            &self.keys.k_se,
            &commit_nonce(exec_id, index),
            token,
            &commit_ad(&h_cur, index, exec_id),
        )
        .map_err(|_| Error::ProtocolFail { batch: index })?;
        if !opened.is_empty() {
            return Err(Error::ProtocolFail { batch: index });
        }

        let commit_prev: CommitToken = aead_seal(
            &self.keys.k_se,
            &commit_nonce(exec_id, index - 1),
            &[],
            &commit_ad(h_prev, index - 1, exec_id),
        )
        .map_err(|_| Error::ProtocolFail { batch: index })?
        .try_into()
        .map_err(|_| Error::ProtocolFail { batch: index })?;

        let mut words = [Eword::Revealed(0); LLMI_MAX_OUTPUTS];
        for (j, slot) in words.iter_mut().enumerate() {
            let ad = word_ad(index, j as u32, exec_id);
            let ct = aead_seal(
                &self.keys.k_se,
                &word_nonce(&ad),
                &word_to_bytes(batch[j]),
                &ad,
            )
            .map_err(|_| Error::ProtocolFail { batch: index })?;
            *slot = Eword::Sealed(
                ct.try_into()
                    .map_err(|_| Error::ProtocolFail { batch: index })?,
            );
        }

        Ok(InputArtifacts { commit_prev, words })
    }

    /// SEeval: recover K_S, authenticate and decrypt the snippet
    /// against its metadata, unseal the input words into the register
    /// file, run the VM, and emit the outputs sealed (or revealed).
    pub fn eval(
        &self,
        exec_id: &Digest,
        enc_shared_key: &EncSharedKey,
        aells: &Aells<'_>,
        inputs: &[Eword],
        widths: &Widths,
    ) -> Result<Vec<Eword>, Error> {
        if inputs.len() != aells.input_ids.len() || inputs.len() > LLMI_MAX_INPUTS {
            return Err(Error::InputCountMismatch {
                provided: inputs.len() as u32,
                required: aells.input_ids.len() as u32,
            });
        }
        let out_count = aells.out_count as usize;
        if out_count > LLMI_MAX_OUTPUTS {
            return Err(Error::OutputCountMismatch {
                provided: aells.out_count,
                required: LLMI_MAX_OUTPUTS as u32,
            });
        }

        // K_S
        let opened = aead_open(
            &self.keys.k_se,
            &shared_key_nonce(exec_id),
            enc_shared_key,
            &[],
        )
        .map_err(|_| Error::SealFail)?;
        if opened.len() != SHAREDKEY_BYTES {
            return Err(Error::SealFail);
        }
        let mut shared_key = Zeroizing::new([0u8; SHAREDKEY_BYTES]);
        shared_key.copy_from_slice(&opened);
        drop(opened);

        // Snippet plaintext, bound to the LLMI metadata.
        let ad = snippet_ad(
            aells.instr_id,
            aells.reveal,
            &aells.input_ids,
            aells.out_count,
            widths,
        )?;
        let snippet = aead_open(
            &shared_key,
            &snippet_nonce(aells.instr_id),
            aells.ciphertext,
            &ad,
        )
        .map_err(|_| Error::SnippetAuthFail {
            instr_id: aells.instr_id,
        })?;

        // Register file, zeroed on allocation and on release.
        let mut regs = Zeroizing::new(vec![0 as Word; REGISTER_COUNT]);

        for (j, (eword, id)) in inputs.iter().zip(&aells.input_ids).enumerate() {
            let reject = Error::WordDecFail {
                consumer: aells.instr_id,
                producer: id.instr_id,
                output: id.output_id,
            };
            let sealed = eword.sealed().ok_or_else(|| reject.clone())?;
            let ad = word_ad(id.instr_id, id.output_id, exec_id);
            let word_pt = aead_open(&self.keys.k_se, &word_nonce(&ad), sealed, &ad)
                .map_err(|_| reject.clone())?;
            if word_pt.len() != WORD_BYTES {
                return Err(reject);
            }
            regs[j] = load_word(&word_pt, WORD_BYTES)?;
        }

        vm::execute(&mut regs, &snippet, widths.lb_r)?;

        // Outputs live in the top l_out registers.
        let base = REGISTER_COUNT - LLMI_MAX_OUTPUTS;
        let mut outputs = Vec::with_capacity(out_count);
        for j in 0..out_count {
            let word = regs[base + j];
            if aells.reveal {
                outputs.push(Eword::Revealed(word));
            } else {
                let ad = word_ad(aells.instr_id, j as u32, exec_id);
                let ct = aead_seal(
                    &self.keys.k_se,
                    &word_nonce(&ad),
                    &word_to_bytes(word),
                    &ad,
                )
                .map_err(|_| Error::SnippetAuthFail {
                    instr_id: aells.instr_id,
                })?;
                outputs.push(Eword::Sealed(ct.try_into().map_err(|_| {
                    Error::SnippetAuthFail {
                        instr_id: aells.instr_id,
                    }
                })?));
            }
        }

        Ok(outputs)
    }
}
