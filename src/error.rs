//! Error types shared by every pass of the decompilation pipeline.

use thiserror::Error;

/// Errors surfaced by any decoding or decompilation pass.
///
/// Per §7, none of these are recovered from inside the pipeline: the pass
/// that detects one returns immediately, leaving the [`crate::decoder::Decoder`]
/// in whatever partial state it had reached. The CLI front ends log the
/// error and render the partial state anyway.
#[derive(Debug, Error)]
pub enum Error {
    /// A byte at `address` did not match any schema row and was not covered
    /// by the `missing` override table.
    #[error("decode error at {address:#06X}: unknown opcode {byte:#04X}")]
    UnknownOpcode { address: u32, byte: u8 },

    /// An operation tried to pop more values than the current functional
    /// group's stack depth (or a sink's remaining argument slots) held.
    #[error("stack underflow at {address:#06X}: {mnemonic} needs {pops} but only {depth} available")]
    StackUnderflow {
        address: u32,
        mnemonic: &'static str,
        pops: u8,
        depth: i32,
    },

    /// More sources were attached to a sink than its schema's `pops` allows.
    #[error("stack overflow building sink at {address:#06X}: {mnemonic} accepts {pops_required} children, got {sources_attached}")]
    StackOverflow {
        address: u32,
        mnemonic: &'static str,
        pops_required: u8,
        sources_attached: usize,
    },

    /// A pure-sink instruction (pops but does not push) appeared in the
    /// middle of a functional group instead of at its head.
    #[error("malformed functional group at {address:#06X}: sink-only instruction mid-group")]
    MalformedGroup { address: u32 },

    /// The byte cursor ran past the end of the input while unpacking an
    /// argument tuple.
    #[error("truncated input reading argument for opcode at {address:#06X}")]
    TruncatedArgument { address: u32 },

    /// A `call` instruction's target address is not the entry of any
    /// discovered subroutine.
    #[error("call at {address:#06X} targets {target:#06X}, which is not a subroutine entry")]
    DanglingCall { address: u32, target: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
