//! Decompiler for the GBC controller-remapping bytecode.
//!
//! The pipeline lives entirely in this crate; the three binaries under
//! `src/bin/` are thin `clap` front ends over [`decoder::Decoder`] and
//! [`emit`].

pub mod arena;
pub mod block;
pub mod bytes;
pub mod combo;
pub mod constants;
pub mod decoder;
pub mod emit;
pub mod error;
pub mod group;
pub mod opcode;
pub mod operation;
pub mod sink;
pub mod sub;
pub mod template;

pub use decoder::Decoder;
pub use error::{Error, Result};
