//! Container and snippet assembly.
//!
//! The mirror image of the parser: lays out the meta header, seals the
//! per-program shared key to the SE's public key, and encrypts each
//! snippet under it with the metadata-binding AD. The test suite and
//! the benches assemble their programs here; it is provisioning-side
//! tooling, not part of the evaluation hot path.

use x25519_dalek::PublicKey as X25519Public;

use crate::codec::push_uint;
use crate::container::{snippet_ad, ProducerId, Widths};
use crate::error::Error;
use crate::params::{
    Word, FLAG_BYTES, LLMI_MAX_INPUTS, LLMI_MAX_OUTPUTS, LLS_MAX_LENGTH, REGISTER_COUNT,
    SHAREDKEY_BYTES, U32_BYTES, VERSION, WORD_BITS,
};
use crate::primitives::{aead_seal, sealed_box_seal};
use crate::se::snippet_nonce;
use crate::vm::{AddrMode, Op};

/// One snippet operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Imm(Word),
    Reg(u32),
}

fn mode_for(operands: &[Operand]) -> AddrMode {
    use Operand::{Imm, Reg};
    match operands {
        [Imm(_)] => AddrMode::Inn,
        [Imm(_), Reg(_)] => AddrMode::Irn,
        [Imm(_), Reg(_), Reg(_)] => AddrMode::Irr,
        [Imm(_), Reg(_), Imm(_)] => AddrMode::Iri,
        [Imm(_), Imm(_)] => AddrMode::Iin,
        [Imm(_), Imm(_), Reg(_)] => AddrMode::Iir,
        [Imm(_), Imm(_), Imm(_)] => AddrMode::Iii,
        [Reg(_)] => AddrMode::Rnn,
        [Reg(_), Reg(_)] => AddrMode::Rrn,
        [Reg(_), Reg(_), Imm(_)] => AddrMode::Rri,
        [Reg(_), Reg(_), Reg(_)] => AddrMode::Rrr,
        [Reg(_), Imm(_), Imm(_)] => AddrMode::Rii,
        [Reg(_), Imm(_), Reg(_)] => AddrMode::Rir,
        [Reg(_), Imm(_)] => AddrMode::Rin,
        _ => panic!("instructions take one to three operands"),
    }
}

/// Assembles plaintext snippet bytes.
pub struct SnippetBuilder {
    code: Vec<u8>,
    lb_r: usize,
}

impl SnippetBuilder {
    pub fn new(widths: &Widths) -> Self {
        Self {
            code: Vec::new(),
            lb_r: widths.lb_r,
        }
    }

    /// Append one instruction.
    pub fn op(&mut self, op: Op, dst: u32, operands: &[Operand]) -> &mut Self {
        let mode = mode_for(operands);
        self.code.push((op.code() << 4) | mode.code());
        // lb_r is 1..=4 by construction; pushes cannot fail.
        let _ = push_uint(&mut self.code, self.lb_r, u64::from(dst));
        for operand in operands {
            match operand {
                Operand::Imm(w) => self.code.extend_from_slice(&w.to_be_bytes()),
                Operand::Reg(r) => {
                    let _ = push_uint(&mut self.code, self.lb_r, u64::from(*r));
                }
            }
        }
        self
    }

    /// Append a NOP (single head byte, no destination or operands).
    pub fn nop(&mut self) -> &mut Self {
        self.code.push(0);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.code
    }
}

/// Declarative multi-instruction: memory wiring, metadata, and the
/// plaintext snippet to encrypt.
#[derive(Debug, Clone)]
pub struct LlmiSpec {
    pub mem_inputs: Vec<u32>,
    pub mem_outputs: Vec<u32>,
    pub instr_id: u32,
    pub reveal: bool,
    pub input_ids: Vec<ProducerId>,
    pub code: Vec<u8>,
}

/// Producer identity of program input `k`: batch `k / l_out + 1`,
/// position `k mod l_out`. Multi-instructions consuming program inputs
/// name them this way.
pub fn input_producer(k: usize) -> ProducerId {
    ProducerId {
        instr_id: (k / LLMI_MAX_OUTPUTS) as u32 + 1,
        output_id: (k % LLMI_MAX_OUTPUTS) as u32,
    }
}

/// Assembles a complete bytecode container.
pub struct ProgramBuilder {
    memory_count: u32,
    shared_key: [u8; SHAREDKEY_BYTES],
    input_indices: Vec<u32>,
    output_indices: Vec<u32>,
    llmis: Vec<LlmiSpec>,
}

impl ProgramBuilder {
    pub fn new(memory_count: u32, shared_key: [u8; SHAREDKEY_BYTES]) -> Self {
        Self {
            memory_count,
            shared_key,
            input_indices: Vec::new(),
            output_indices: Vec::new(),
            llmis: Vec::new(),
        }
    }

    /// Byte widths programs built here will be parsed with.
    pub fn widths(&self) -> Widths {
        Widths::for_memory(self.memory_count)
    }

    /// Memory cells receiving the program inputs, in input order.
    pub fn inputs(&mut self, indices: &[u32]) -> &mut Self {
        self.input_indices.extend_from_slice(indices);
        self
    }

    /// Memory cells read back as program outputs, in output order.
    pub fn outputs(&mut self, indices: &[u32]) -> &mut Self {
        self.output_indices.extend_from_slice(indices);
        self
    }

    pub fn llmi(&mut self, spec: LlmiSpec) -> &mut Self {
        self.llmis.push(spec);
        self
    }

    /// Serialize the container, sealing the shared key to `recipient`.
    pub fn build(&self, recipient: &X25519Public) -> Result<Vec<u8>, Error> {
        let widths = self.widths();
        let mut out = Vec::new();

        for v in [
            VERSION,
            WORD_BITS,
            LLMI_MAX_INPUTS as u32,
            LLMI_MAX_OUTPUTS as u32,
            REGISTER_COUNT as u32,
            LLS_MAX_LENGTH as u32,
            self.memory_count,
        ] {
            push_uint(&mut out, U32_BYTES, u64::from(v))?;
        }

        let sealed =
            sealed_box_seal(recipient, &self.shared_key).map_err(|_| Error::SealOpenFail)?;
        out.extend_from_slice(&sealed);

        push_uint(&mut out, widths.lb_m, self.input_indices.len() as u64)?;
        for &ix in &self.input_indices {
            push_uint(&mut out, widths.lb_m, u64::from(ix))?;
        }
        push_uint(&mut out, widths.lb_m, self.output_indices.len() as u64)?;
        for &ix in &self.output_indices {
            push_uint(&mut out, widths.lb_m, u64::from(ix))?;
        }

        push_uint(&mut out, U32_BYTES, self.llmis.len() as u64)?;
        for spec in &self.llmis {
            push_uint(&mut out, widths.lb_m, spec.mem_inputs.len() as u64)?;
            for &ix in &spec.mem_inputs {
                push_uint(&mut out, widths.lb_m, u64::from(ix))?;
            }
            push_uint(&mut out, widths.lb_m, spec.mem_outputs.len() as u64)?;
            for &ix in &spec.mem_outputs {
                push_uint(&mut out, widths.lb_m, u64::from(ix))?;
            }
            push_uint(&mut out, U32_BYTES, u64::from(spec.instr_id))?;
            push_uint(&mut out, FLAG_BYTES, u64::from(spec.reveal))?;
            for id in &spec.input_ids {
                push_uint(&mut out, U32_BYTES, u64::from(id.instr_id))?;
                push_uint(&mut out, widths.lb_o, u64::from(id.output_id))?;
            }

            let ad = snippet_ad(
                spec.instr_id,
                spec.reveal,
                &spec.input_ids,
                spec.mem_outputs.len() as u32,
                &widths,
            )?;
            let ct = aead_seal(
                &self.shared_key,
                &snippet_nonce(spec.instr_id),
                &spec.code,
                &ad,
            )
            .map_err(|_| Error::SnippetAuthFail {
                instr_id: spec.instr_id,
            })?;
            push_uint(&mut out, U32_BYTES, ct.len() as u64)?;
            out.extend_from_slice(&ct);
        }

        Ok(out)
    }
}
