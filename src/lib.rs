//! pandabc
//!
//! Bytecode emission for an accumulator-based register machine: function
//! bodies with label-resolved, relaxed branches, and module records written
//! as tagged literal arrays, packaged into a checksummed artifact.
//!
//! ## Crates
//!
//! - [`isa`]: Opcode tables, encoder, decoder and disassembler
//! - [`emitter`]: [`BytecodeEmitter`] with branch relaxation
//! - [`module`]: Module records and [`ModuleRecordEmitter`]
//!
//! ## Example
//!
//! ```
//! use pandabc::{BytecodeEmitter, Program, ProgramBuilder};
//!
//! let mut emitter = BytecodeEmitter::new();
//! let skip = emitter.create_label();
//! emitter.lda(0)?;
//! emitter.jeqz(skip)?;
//! emitter.ldai(1)?;
//! emitter.bind(skip)?;
//! emitter.return_value()?;
//!
//! let mut builder = ProgramBuilder::new();
//! builder.add_function("main", emitter)?;
//! let program = builder.build()?;
//!
//! let bytes = program.write()?;
//! assert_eq!(Program::read(&bytes)?, program);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod error;
mod program;

pub use pandabc_emitter as emitter;
pub use pandabc_isa as isa;
pub use pandabc_module as module;

pub use builder::{DEFAULT_MODULE_RECORD_INDEX, DEFAULT_PHASE_RECORD_INDEX, ProgramBuilder};
pub use error::{ProgramError, Result};
pub use program::{CompiledFunction, MAGIC, Program, VERSION};

pub use pandabc_emitter::{BytecodeEmitter, EmitError, ErrorCode, Label};
pub use pandabc_module::{
    LiteralBuffer, ModuleLiteralReader, ModuleRecord, ModuleRecordEmitter, ModuleRecordOptions,
};

/// Common imports for code generators.
pub mod prelude {
    pub use crate::{
        BytecodeEmitter, CompiledFunction, ErrorCode, Label, ModuleRecord, ModuleRecordEmitter,
        ModuleRecordOptions, Program, ProgramBuilder, ProgramError,
    };
    pub use pandabc_isa::{Instruction, Opcode, disassemble};
}
