//! Error types for module records and literal buffers.

use thiserror::Error;

use crate::literal::LiteralTag;

/// Errors raised by the literal buffer codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("literal data truncated at byte {offset}: needs {needed} more")]
    Truncated { offset: usize, needed: usize },

    #[error("unknown literal tag 0x{tag:02x} at byte {offset}")]
    UnknownTag { tag: u8, offset: usize },

    #[error("string literal at byte {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    #[error("string literal of {len} bytes exceeds the 32-bit length prefix")]
    StringTooLong { len: usize },

    #[error("{count} literals exceed the 32-bit count prefix")]
    TooManyLiterals { count: usize },

    #[error("{count} unexpected byte(s) after the last literal")]
    TrailingBytes { count: usize },
}

/// Errors raised while building, emitting or reading a module record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleRecordError {
    #[error("duplicate import binding '{local_name}'")]
    DuplicateImport { local_name: String },

    #[error("duplicate export name '{export_name}'")]
    DuplicateExport { export_name: String },

    #[error("module request {index} out of range ({count} requests)")]
    InvalidRequest { index: u32, count: usize },

    /// Request indices are stored as 16-bit method-affiliate literals.
    #[error("module request index {index} does not fit a 16-bit reference")]
    RequestIndexOverflow { index: u32 },

    #[error("literal {index}: expected {expected}, found {}", .found.map_or_else(|| "end of buffer".to_string(), |tag| tag.to_string()))]
    UnexpectedLiteral {
        index: usize,
        expected: LiteralTag,
        found: Option<LiteralTag>,
    },

    #[error("module request '{source_name}' appears more than once")]
    DuplicateRequest { source_name: String },

    #[error("phase buffer has {found} entries for {expected} module requests")]
    PhaseLength { expected: usize, found: usize },

    #[error("{count} literal(s) left after the module record")]
    TrailingLiterals { count: usize },

    #[error(transparent)]
    Literal(#[from] LiteralError),
}
