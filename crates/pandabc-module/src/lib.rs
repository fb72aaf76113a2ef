//! pandabc module records
//!
//! The import/export tables of one module and their serialization into the
//! tagged literal arrays stored in a bytecode artifact.
//!
//! ## Modules
//!
//! - [`record`]: Module record model with parser-side validation
//! - [`literal`]: Tagged literals and the literal buffer codec
//! - [`emitter`]: [`ModuleRecordEmitter`], record to literal arrays
//! - [`reader`]: [`ModuleLiteralReader`], literal arrays back to a record

pub mod emitter;
mod error;
pub mod literal;
pub mod reader;
pub mod record;

pub use emitter::{
    GeneratedModuleRecord, ModuleRecordEmitter, ModuleRecordOptions, PHASE_EAGER, PHASE_LAZY,
};
pub use error::{LiteralError, ModuleRecordError};
pub use literal::{Literal, LiteralBuffer, LiteralTag};
pub use reader::ModuleLiteralReader;
pub use record::{
    IndirectExport, LocalExport, ModuleRecord, ModuleRequest, NamespaceImport, RegularImport,
    StarExport,
};
