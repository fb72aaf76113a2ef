//! Emitter errors and the status codes reported to code generators.

use pandabc_isa::{DecodeError, EncodeError, Opcode};
use thiserror::Error;

use crate::label::Label;

/// Coarse build status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,
    /// A branch refers to a label that was never bound.
    UnboundLabels,
    /// The emitter or the opcode tables are inconsistent.
    InternalError,
}

impl ErrorCode {
    /// Status of a fallible emitter call.
    pub fn of<T>(result: &Result<T, EmitError>) -> Self {
        match result {
            Ok(_) => ErrorCode::Success,
            Err(err) => err.code(),
        }
    }
}

/// Errors raised while emitting or building bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("{count} branch(es) refer to unbound labels")]
    UnboundLabels { count: usize },

    #[error("label {0} is already bound")]
    LabelAlreadyBound(Label),

    #[error("label {0} does not belong to this emitter")]
    UnknownLabel(Label),

    #[error("{opcode} is not a branch")]
    NotABranch { opcode: Opcode },

    /// No wider form and no far-jump fallback can hold the distance.
    #[error("{opcode} at offset {pc} cannot encode a distance of {distance}")]
    BranchOutOfRange {
        opcode: Opcode,
        pc: u32,
        distance: i64,
    },

    #[error("bytecode exceeds the 32-bit offset range")]
    CodeTooLarge,

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl EmitError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EmitError::UnboundLabels { .. } => ErrorCode::UnboundLabels,
            _ => ErrorCode::InternalError,
        }
    }
}
