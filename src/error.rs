//! Error types for the evaluator.
//!
//! Every failure is fatal to the invocation: the driver aborts on the
//! first error and the CLI maps it to a single diagnostic plus a
//! non-zero exit. Nothing here is retried internally.

use thiserror::Error;

/// Faults raised while executing a decrypted snippet.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// Executed-instruction count exceeded the snippet cap.
    #[error("snippet exceeded {0} instructions")]
    SnippetTooLong(usize),

    /// Opcode nibble outside the instruction set.
    #[error("invalid opcode {0}")]
    BadOpcode(u8),

    /// Flag nibble outside the operand-pattern table.
    #[error("invalid operand flag {0}")]
    BadFlag(u8),

    /// Snippet ended mid-instruction.
    #[error("snippet truncated mid-instruction")]
    Truncated,

    /// Division or modulo by zero.
    #[error("division by zero")]
    ArithTrap,

    /// Register operand outside the register file.
    #[error("register index {0} out of range")]
    RegisterOutOfRange(u32),
}

/// Top-level evaluator errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Integer byte width outside the supported 1..=8 range.
    #[error("invalid byte width {0}")]
    InvalidWidth(usize),

    /// Ran out of bytes while decoding a field.
    #[error("unexpected end of input while decoding")]
    UnexpectedEof,

    /// A meta-header field disagrees with this build's configuration.
    #[error("bytecode header mismatch: {field} is {found}, this build requires {required}")]
    HeaderMismatch {
        field: &'static str,
        found: u32,
        required: u32,
    },

    /// Bytes left over after the LLMI list.
    #[error("trailing bytes after bytecode")]
    TrailingBytes,

    /// A memory index in the container exceeds the declared memory size.
    #[error("memory index {index} out of range (memory size {memory_count})")]
    BadMemoryIndex { index: u32, memory_count: u32 },

    /// The sealed shared-key envelope did not open.
    #[error("sealed shared-key envelope rejected")]
    SealOpenFail,

    /// E_K did not authenticate inside eval.
    #[error("encrypted shared key rejected")]
    SealFail,

    /// Input-commitment mismatch, or a malformed batch index / H_0.
    #[error("input commitment rejected for batch {batch}")]
    ProtocolFail { batch: u32 },

    /// Snippet ciphertext did not authenticate against its metadata.
    #[error("snippet for instruction {instr_id} rejected")]
    SnippetAuthFail { instr_id: u32 },

    /// An encrypted word did not authenticate against its producer binding.
    #[error("encrypted word rejected: consumer {consumer}, producer ({producer},{output})")]
    WordDecFail {
        consumer: u32,
        producer: u32,
        output: u32,
    },

    /// Provided input count disagrees with the container.
    #[error("program expects {required} inputs, {provided} provided")]
    InputCountMismatch { provided: u32, required: u32 },

    /// Requested output count disagrees with the container.
    #[error("program produces {required} outputs, {provided} requested")]
    OutputCountMismatch { provided: u32, required: u32 },

    /// A fault inside the snippet VM.
    #[error("snippet execution failed: {0}")]
    Vm(#[from] VmError),
}
