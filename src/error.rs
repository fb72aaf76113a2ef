//! Errors for assembling, writing and reading programs.

use pandabc_emitter::EmitError;
use pandabc_module::{LiteralError, ModuleRecordError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProgramError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("function '{name}': {source}")]
    Function {
        name: String,
        #[source]
        source: EmitError,
    },

    #[error("duplicate function '{0}'")]
    DuplicateFunction(String),

    #[error("not a pandabc artifact")]
    InvalidMagic,

    #[error("unsupported artifact version {found}")]
    UnsupportedVersion { found: u16 },

    #[error("checksum mismatch: stored {stored:016x}, computed {computed:016x}")]
    ChecksumMismatch { stored: u64, computed: u64 },

    #[error("artifact truncated at byte {offset}: needs {needed} more")]
    Truncated { offset: usize, needed: usize },

    #[error("function name at byte {offset} is not valid UTF-8")]
    InvalidName { offset: usize },

    #[error("section of {len} bytes exceeds the 32-bit length prefix")]
    SectionTooLarge { len: usize },

    #[error(transparent)]
    ModuleRecord(#[from] ModuleRecordError),

    #[error(transparent)]
    Literal(#[from] LiteralError),
}
