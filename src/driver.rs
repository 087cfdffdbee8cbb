//! End-to-end evaluation of a bytecode container.
//!
//! The driver is the untrusted host's side of the protocol: it sees
//! only container structure and ciphertexts, and calls the SE
//! primitives in the causal order the commitment chain demands —
//! `start` first, then `input` from batch L down to batch 1, then one
//! `eval` per multi-instruction in program order.

use crate::container::{self, Program};
use crate::error::Error;
use crate::eword::Eword;
use crate::hashchain::{chain_step, H0};
use crate::keys::SeKeys;
use crate::params::{batch_count, Batch, Digest, Word, LLMI_MAX_OUTPUTS};
use crate::se::SecureElement;

/// Split program inputs into `L` zero-padded batches.
fn build_batches(inputs: &[Word]) -> Vec<Batch> {
    let total = batch_count(inputs.len() as u32) as usize;
    let mut batches = vec![[0 as Word; LLMI_MAX_OUTPUTS]; total];
    for (k, &w) in inputs.iter().enumerate() {
        batches[k / LLMI_MAX_OUTPUTS][k % LLMI_MAX_OUTPUTS] = w;
    }
    batches
}

/// Hash chain `H_0 … H_L` over the batches.
fn build_chain(batches: &[Batch]) -> Vec<Digest> {
    let mut chain = Vec::with_capacity(batches.len() + 1);
    chain.push(H0);
    for batch in batches {
        let prev = chain[chain.len() - 1];
        chain.push(chain_step(&prev, batch));
    }
    chain
}

fn unwritten_slot(output: u32) -> Error {
    // Reading a never-written cell fails the same way a forged word
    // would; the program boundary is consumer/producer 0.
    Error::WordDecFail {
        consumer: 0,
        producer: 0,
        output,
    }
}

/// Evaluate `bytecode` over `inputs`, expecting `out_count` outputs.
pub fn run(
    bytecode: &[u8],
    inputs: &[Word],
    out_count: usize,
    keys: &SeKeys,
) -> Result<Vec<Word>, Error> {
    let program: Program<'_> = container::parse(bytecode)?;

    if inputs.len() != program.input_indices.len() {
        return Err(Error::InputCountMismatch {
            provided: inputs.len() as u32,
            required: program.input_indices.len() as u32,
        });
    }
    if out_count != program.output_indices.len() {
        return Err(Error::OutputCountMismatch {
            provided: out_count as u32,
            required: program.output_indices.len() as u32,
        });
    }

    let batches = build_batches(inputs);
    let chain = build_chain(&batches);
    let total = batches.len();

    let se = SecureElement::new(keys);
    let start = se.start(program.se_header, program.widths.lb_m, &chain[total])?;

    // Walk the commitment chain backwards, pooling the word
    // ciphertexts densely by (batch, position).
    let mut pool = vec![Eword::Revealed(0); total * LLMI_MAX_OUTPUTS];
    let mut token = start.commit_last;
    for i in (1..=total).rev() {
        let art = se.input(
            &start.exec_id,
            i as u32,
            &chain[i - 1],
            &batches[i - 1],
            &token,
        )?;
        pool[(i - 1) * LLMI_MAX_OUTPUTS..i * LLMI_MAX_OUTPUTS].copy_from_slice(&art.words);
        token = art.commit_prev;
    }

    // Scatter program inputs into memory; padding words stay pooled
    // but unplaced.
    let mut memory: Vec<Option<Eword>> = vec![None; program.meta.memory_count as usize];
    for (k, &ix) in program.input_indices.iter().enumerate() {
        memory[ix as usize] = Some(pool[k]);
    }

    for llmi in &program.llmis {
        let mut gathered = Vec::with_capacity(llmi.mem_inputs.len());
        for (j, &ix) in llmi.mem_inputs.iter().enumerate() {
            let id = &llmi.aells.input_ids[j];
            gathered.push(memory[ix as usize].ok_or(Error::WordDecFail {
                consumer: llmi.aells.instr_id,
                producer: id.instr_id,
                output: id.output_id,
            })?);
        }

        let outputs = se.eval(
            &start.exec_id,
            &start.enc_shared_key,
            &llmi.aells,
            &gathered,
            &program.widths,
        )?;

        for (&ix, word) in llmi.mem_outputs.iter().zip(outputs) {
            memory[ix as usize] = Some(word);
        }
    }

    program
        .output_indices
        .iter()
        .enumerate()
        .map(|(k, &ix)| {
            memory[ix as usize]
                .map(|w| w.clear_word())
                .ok_or_else(|| unwritten_slot(k as u32))
        })
        .collect()
}
