//! # sealvm
//!
//! A secure-element runtime that evaluates a compiled program whose
//! instructions and intermediate values are authenticated-encrypted
//! end-to-end. The untrusted host parses the bytecode container and
//! routes ciphertexts; every snippet and every register-sized word is
//! sealed under the SE's keys, and a hash chain of input batches binds
//! the computation to one input sequence and execution identity.
//!
//! ## Quick start
//!
//! ```rust
//! use sealvm::builder::{LlmiSpec, Operand, ProgramBuilder, SnippetBuilder, input_producer};
//! use sealvm::vm::Op;
//! use sealvm::{driver, SeKeys};
//!
//! let keys = SeKeys::generate();
//! let mut prog = ProgramBuilder::new(4, [7u8; 32]);
//! let widths = prog.widths();
//!
//! // One multi-instruction moving the input word to a revealed output.
//! let mut asm = SnippetBuilder::new(&widths);
//! asm.op(Op::Mov, 64, &[Operand::Reg(0)]);
//! prog.inputs(&[0]).outputs(&[1]).llmi(LlmiSpec {
//!     mem_inputs: vec![0],
//!     mem_outputs: vec![1],
//!     instr_id: 1000,
//!     reveal: true,
//!     input_ids: vec![input_producer(0)],
//!     code: asm.finish(),
//! });
//!
//! let bytecode = prog.build(keys.public()).unwrap();
//! let outputs = driver::run(&bytecode, &[41], 1, &keys).unwrap();
//! assert_eq!(outputs, vec![41]);
//! ```
//!
//! ## Security properties
//!
//! - **Word binding**: every encrypted word is bound to its
//!   `(producer, output position, execution identity)` triple; replay
//!   into a different slot, batch, or execution fails authentication.
//! - **Input commitment**: batch `i` is released only against a valid
//!   token `C^in_i`, whose chain terminates at `H_0 = 0…0`.
//! - **Snippet binding**: a snippet decrypts only against the exact
//!   LLMI metadata it was compiled with.
//! - **Determinism**: nonces are derived, never random; identical
//!   `(program, inputs)` reproduce identical ciphertexts.
//!
//! ## What's NOT provided
//!
//! - The offline bytecode compiler (the [`builder`] module is test and
//!   provisioning tooling, not a compiler)
//! - Side-channel countermeasures beyond the AEAD black box and
//!   zeroization of secrets
//! - Persistence or networking

#![deny(unsafe_code)]

pub mod builder;
pub mod codec;
pub mod container;
pub mod driver;
pub mod error;
pub mod eword;
pub mod hashchain;
pub mod keys;
pub mod params;
pub mod primitives;
pub mod se;
pub mod vm;

pub use error::{Error, VmError};
pub use eword::Eword;
pub use keys::SeKeys;
pub use params::{Batch, Digest, Word};
pub use se::{SecureElement, StartArtifacts};
