//! Bytecode container decoder.
//!
//! Layout (big-endian throughout):
//!
//!   meta:   version[4] || word_size[4] || l_in[4] || l_out[4]
//!           || r[4] || s[4] || memory_count[4]
//!   header: sealed_shared_key[SEPUB_BYTES] || input_count[lb_m]
//!   map:    input_count memory indices [lb_m each]
//!           || output_count[lb_m] || output indices [lb_m each]
//!   llmis:  llmi_count[4] || llmi_count records
//!
//! Each LLMI record:
//!
//!   inp_count[lb_m] || memory indices || out_count[lb_m] || memory indices
//!   || instrID[4] || reveal_flag[1]
//!   || inp_count producer IDs (instrID[4] || outputID[lb_o])
//!   || bytelen[4] || bytelen snippet-ciphertext bytes
//!
//! Snippet blobs are borrowed in place; the parser never copies them.

use crate::codec::{load_u32, push_uint, Reader};
use crate::error::Error;
use crate::params::{
    FLAG_BYTES, LLMI_MAX_INPUTS, LLMI_MAX_OUTPUTS, LLS_MAX_LENGTH, REGISTER_COUNT, SEPUB_BYTES,
    U32_BYTES, VERSION, WORD_BITS, WORD_BYTES,
};

/// Parsed meta header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub version: u32,
    pub word_size: u32,
    pub max_inputs: u32,
    pub max_outputs: u32,
    pub register_count: u32,
    pub max_snippet_len: u32,
    pub memory_count: u32,
}

/// Variable byte widths derived from the program shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widths {
    /// Memory index / count fields.
    pub lb_m: usize,
    /// Register index operands.
    pub lb_r: usize,
    /// Immediate operands (always a full word).
    pub lb_c: usize,
    /// Producer output IDs inside snippet metadata.
    pub lb_o: usize,
}

/// Bytes needed to address `count` values (minimum 1).
pub(crate) fn byte_width(count: u32) -> usize {
    let bits = if count <= 1 {
        0
    } else {
        32 - (count - 1).leading_zeros() as usize
    };
    bits.div_ceil(8).max(1)
}

impl Widths {
    pub fn for_memory(memory_count: u32) -> Self {
        Self {
            lb_m: byte_width(memory_count),
            lb_r: byte_width(REGISTER_COUNT as u32),
            lb_c: WORD_BYTES,
            lb_o: byte_width(LLMI_MAX_OUTPUTS as u32),
        }
    }
}

/// `(instrID, outputID)` naming the producer of an input word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerId {
    pub instr_id: u32,
    pub output_id: u32,
}

/// Authenticated-encrypted snippet plus the metadata its AD binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aells<'a> {
    pub instr_id: u32,
    pub reveal: bool,
    pub input_ids: Vec<ProducerId>,
    pub out_count: u32,
    pub ciphertext: &'a [u8],
}

/// One multi-instruction: memory wiring plus its snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Llmi<'a> {
    pub mem_inputs: Vec<u32>,
    pub mem_outputs: Vec<u32>,
    pub aells: Aells<'a>,
}

/// A fully parsed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program<'a> {
    pub meta: Meta,
    pub widths: Widths,
    /// Sealed shared key immediately followed by the lb_m-byte input
    /// count; hashed as-is into the execution identity.
    pub se_header: &'a [u8],
    pub input_indices: Vec<u32>,
    pub output_indices: Vec<u32>,
    pub llmis: Vec<Llmi<'a>>,
}

fn check(field: &'static str, found: u32, required: u32) -> Result<(), Error> {
    if found != required {
        return Err(Error::HeaderMismatch {
            field,
            found,
            required,
        });
    }
    Ok(())
}

fn check_mem_index(index: u32, memory_count: u32) -> Result<u32, Error> {
    if index >= memory_count {
        return Err(Error::BadMemoryIndex {
            index,
            memory_count,
        });
    }
    Ok(index)
}

fn parse_meta(r: &mut Reader<'_>) -> Result<Meta, Error> {
    let meta = Meta {
        version: r.read_u32(U32_BYTES)?,
        word_size: r.read_u32(U32_BYTES)?,
        max_inputs: r.read_u32(U32_BYTES)?,
        max_outputs: r.read_u32(U32_BYTES)?,
        register_count: r.read_u32(U32_BYTES)?,
        max_snippet_len: r.read_u32(U32_BYTES)?,
        memory_count: r.read_u32(U32_BYTES)?,
    };
    check("version", meta.version, VERSION)?;
    check("word_size", meta.word_size, WORD_BITS)?;
    check("max_inputs", meta.max_inputs, LLMI_MAX_INPUTS as u32)?;
    check("max_outputs", meta.max_outputs, LLMI_MAX_OUTPUTS as u32)?;
    check("register_count", meta.register_count, REGISTER_COUNT as u32)?;
    check("max_snippet_len", meta.max_snippet_len, LLS_MAX_LENGTH as u32)?;
    Ok(meta)
}

fn parse_mem_indices(
    r: &mut Reader<'_>,
    count: u32,
    widths: &Widths,
    memory_count: u32,
) -> Result<Vec<u32>, Error> {
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(check_mem_index(r.read_u32(widths.lb_m)?, memory_count)?);
    }
    Ok(out)
}

fn parse_llmi<'a>(
    r: &mut Reader<'a>,
    widths: &Widths,
    memory_count: u32,
) -> Result<Llmi<'a>, Error> {
    let inp_count = r.read_u32(widths.lb_m)?;
    if inp_count > LLMI_MAX_INPUTS as u32 {
        return Err(Error::HeaderMismatch {
            field: "llmi input count",
            found: inp_count,
            required: LLMI_MAX_INPUTS as u32,
        });
    }
    let mem_inputs = parse_mem_indices(r, inp_count, widths, memory_count)?;

    let out_count = r.read_u32(widths.lb_m)?;
    if out_count > LLMI_MAX_OUTPUTS as u32 {
        return Err(Error::HeaderMismatch {
            field: "llmi output count",
            found: out_count,
            required: LLMI_MAX_OUTPUTS as u32,
        });
    }
    let mem_outputs = parse_mem_indices(r, out_count, widths, memory_count)?;

    let instr_id = r.read_u32(U32_BYTES)?;
    let reveal = r.read_u32(FLAG_BYTES)? != 0;

    let mut input_ids = Vec::with_capacity(inp_count as usize);
    for _ in 0..inp_count {
        input_ids.push(ProducerId {
            instr_id: r.read_u32(U32_BYTES)?,
            output_id: r.read_u32(widths.lb_o)?,
        });
    }

    let bytelen = r.read_u32(U32_BYTES)?;
    let ciphertext = r.take(bytelen as usize)?;

    Ok(Llmi {
        mem_inputs,
        mem_outputs,
        aells: Aells {
            instr_id,
            reveal,
            input_ids,
            out_count,
            ciphertext,
        },
    })
}

/// Decode a complete bytecode container. Rejects meta-header
/// mismatches, out-of-range memory indices, and trailing bytes.
pub fn parse(bytes: &[u8]) -> Result<Program<'_>, Error> {
    let mut r = Reader::new(bytes);

    let meta = parse_meta(&mut r)?;
    let widths = Widths::for_memory(meta.memory_count);

    // The SE header spans the sealed envelope and the input count that
    // follows it; the count is re-read out of the same slice.
    let se_header = r.take(SEPUB_BYTES + widths.lb_m)?;
    let input_count = load_u32(&se_header[SEPUB_BYTES..], widths.lb_m)?;

    let input_indices = parse_mem_indices(&mut r, input_count, &widths, meta.memory_count)?;
    let output_count = r.read_u32(widths.lb_m)?;
    let output_indices = parse_mem_indices(&mut r, output_count, &widths, meta.memory_count)?;

    let llmi_count = r.read_u32(U32_BYTES)?;
    let mut llmis = Vec::with_capacity(llmi_count as usize);
    for _ in 0..llmi_count {
        llmis.push(parse_llmi(&mut r, &widths, meta.memory_count)?);
    }

    if !r.is_empty() {
        return Err(Error::TrailingBytes);
    }

    Ok(Program {
        meta,
        widths,
        se_header,
        input_indices,
        output_indices,
        llmis,
    })
}

/// Associated data binding a snippet ciphertext to its metadata:
/// `instrID(4) || reveal(1) || inp_count(lb_m) || producer IDs || out_count(lb_m)`.
pub(crate) fn snippet_ad(
    instr_id: u32,
    reveal: bool,
    input_ids: &[ProducerId],
    out_count: u32,
    widths: &Widths,
) -> Result<Vec<u8>, Error> {
    let mut ad = Vec::with_capacity(
        U32_BYTES + FLAG_BYTES + 2 * widths.lb_m + (U32_BYTES + widths.lb_o) * input_ids.len(),
    );
    push_uint(&mut ad, U32_BYTES, u64::from(instr_id))?;
    push_uint(&mut ad, FLAG_BYTES, u64::from(reveal))?;
    push_uint(&mut ad, widths.lb_m, input_ids.len() as u64)?;
    for id in input_ids {
        push_uint(&mut ad, U32_BYTES, u64::from(id.instr_id))?;
        push_uint(&mut ad, widths.lb_o, u64::from(id.output_id))?;
    }
    push_uint(&mut ad, widths.lb_m, u64::from(out_count))?;
    Ok(ad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::push_uint as push;

    #[test]
    fn byte_widths() {
        assert_eq!(byte_width(1), 1);
        assert_eq!(byte_width(2), 1);
        assert_eq!(byte_width(80), 1);
        assert_eq!(byte_width(256), 1);
        assert_eq!(byte_width(257), 2);
        assert_eq!(byte_width(65536), 2);
        assert_eq!(byte_width(65537), 3);
    }

    fn meta_bytes(memory_count: u32) -> Vec<u8> {
        let mut b = Vec::new();
        for v in [
            VERSION,
            WORD_BITS,
            LLMI_MAX_INPUTS as u32,
            LLMI_MAX_OUTPUTS as u32,
            REGISTER_COUNT as u32,
            LLS_MAX_LENGTH as u32,
            memory_count,
        ] {
            push(&mut b, 4, u64::from(v)).unwrap();
        }
        b
    }

    // Hand-rolled container: 4 memory cells, 1 input at cell 0, 1 output
    // at cell 1, one LLMI reading cell 0 and writing cell 1.
    fn sample() -> Vec<u8> {
        let mut b = meta_bytes(4);
        b.extend_from_slice(&[0xAB; SEPUB_BYTES]);
        push(&mut b, 1, 1).unwrap(); // input count (n)
        push(&mut b, 1, 0).unwrap(); // input index
        push(&mut b, 1, 1).unwrap(); // output count
        push(&mut b, 1, 1).unwrap(); // output index
        push(&mut b, 4, 1).unwrap(); // llmi count
        push(&mut b, 1, 1).unwrap(); // llmi inp_count
        push(&mut b, 1, 0).unwrap(); // mem input
        push(&mut b, 1, 1).unwrap(); // llmi out_count
        push(&mut b, 1, 1).unwrap(); // mem output
        push(&mut b, 4, 7).unwrap(); // instrID
        push(&mut b, 1, 1).unwrap(); // reveal
        push(&mut b, 4, 1).unwrap(); // producer instrID (batch 1)
        push(&mut b, 1, 0).unwrap(); // producer outputID
        push(&mut b, 4, 3).unwrap(); // bytelen
        b.extend_from_slice(&[0xC0, 0xC1, 0xC2]);
        b
    }

    #[test]
    fn parses_sample() {
        let bytes = sample();
        let prog = parse(&bytes).unwrap();
        assert_eq!(prog.meta.memory_count, 4);
        assert_eq!(prog.widths.lb_m, 1);
        assert_eq!(prog.se_header.len(), SEPUB_BYTES + 1);
        assert_eq!(prog.input_indices, vec![0]);
        assert_eq!(prog.output_indices, vec![1]);
        assert_eq!(prog.llmis.len(), 1);
        let llmi = &prog.llmis[0];
        assert_eq!(llmi.aells.instr_id, 7);
        assert!(llmi.aells.reveal);
        assert_eq!(
            llmi.aells.input_ids,
            vec![ProducerId {
                instr_id: 1,
                output_id: 0
            }]
        );
        assert_eq!(llmi.aells.ciphertext, &[0xC0, 0xC1, 0xC2]);
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = sample();
        bytes.push(0);
        assert_eq!(parse(&bytes), Err(Error::TrailingBytes));
    }

    #[test]
    fn rejects_truncation() {
        let bytes = sample();
        assert_eq!(parse(&bytes[..bytes.len() - 1]), Err(Error::UnexpectedEof));
    }

    #[test]
    fn rejects_version_mismatch() {
        let mut bytes = sample();
        bytes[3] = 9;
        assert_eq!(
            parse(&bytes),
            Err(Error::HeaderMismatch {
                field: "version",
                found: 9,
                required: VERSION,
            })
        );
    }

    #[test]
    fn rejects_memory_index_out_of_range() {
        let mut bytes = sample();
        // Input index byte sits right after the SE header.
        let pos = 28 + SEPUB_BYTES + 1;
        bytes[pos] = 9;
        assert_eq!(
            parse(&bytes),
            Err(Error::BadMemoryIndex {
                index: 9,
                memory_count: 4,
            })
        );
    }

    #[test]
    fn snippet_ad_layout() {
        let widths = Widths::for_memory(4);
        let ids = [ProducerId {
            instr_id: 1,
            output_id: 2,
        }];
        let ad = snippet_ad(7, true, &ids, 1, &widths).unwrap();
        assert_eq!(
            ad,
            vec![0, 0, 0, 7, 1, 1, 0, 0, 0, 1, 2, 1],
        );
    }
}
