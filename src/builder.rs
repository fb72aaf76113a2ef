//! Assembles a [`Program`] from function emitters and a module record.

use pandabc_emitter::BytecodeEmitter;
use pandabc_module::{ModuleRecord, ModuleRecordEmitter, ModuleRecordOptions};
use tracing::{debug, info};

use crate::error::{ProgramError, Result};
use crate::program::{CompiledFunction, Program};

/// Literal-array slot of the module record unless configured otherwise.
pub const DEFAULT_MODULE_RECORD_INDEX: u32 = 0;
/// Literal-array slot of the phase record unless configured otherwise.
pub const DEFAULT_PHASE_RECORD_INDEX: u32 = 1;

/// Builds a [`Program`].
///
/// ```
/// use pandabc::{BytecodeEmitter, ProgramBuilder};
///
/// let mut main = BytecodeEmitter::new();
/// main.return_undefined()?;
///
/// let mut builder = ProgramBuilder::new().with_phase_record(true);
/// let request = builder.module_record_mut().add_module_request("./dep", true);
/// builder.module_record_mut().add_star_export(request)?;
/// builder.add_function("main", main)?;
///
/// let program = builder.build()?;
/// assert_eq!(program.function_count(), 1);
/// assert!(program.phase_record().is_some());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ProgramBuilder {
    options: ModuleRecordOptions,
    module_record_index: u32,
    phase_record_index: u32,
    resolve_reexports: bool,

    record: ModuleRecord,
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            options: ModuleRecordOptions::default(),
            module_record_index: DEFAULT_MODULE_RECORD_INDEX,
            phase_record_index: DEFAULT_PHASE_RECORD_INDEX,
            resolve_reexports: false,
            record: ModuleRecord::new(),
            program: Program::new(),
        }
    }

    /// Emit the phase record alongside the module record.
    pub fn with_phase_record(mut self, enabled: bool) -> Self {
        self.options = self.options.with_phase_record(enabled);
        self
    }

    /// Literal-array slots reserved for the module and phase records.
    pub fn with_record_indices(mut self, module_record: u32, phase_record: u32) -> Self {
        self.module_record_index = module_record;
        self.phase_record_index = phase_record;
        self
    }

    /// Rewrite re-exported imports as indirect exports before emission.
    pub fn with_reexport_resolution(mut self, enabled: bool) -> Self {
        self.resolve_reexports = enabled;
        self
    }

    pub fn with_module_record(mut self, record: ModuleRecord) -> Self {
        self.record = record;
        self
    }

    pub fn module_record_mut(&mut self) -> &mut ModuleRecord {
        &mut self.record
    }

    /// Build `emitter` and add the result as function `name`.
    pub fn add_function(&mut self, name: &str, mut emitter: BytecodeEmitter) -> Result<()> {
        let bytecode = emitter.build().map_err(|source| ProgramError::Function {
            name: name.to_owned(),
            source,
        })?;
        debug!(function = name, bytes = bytecode.len(), "function compiled");
        self.program.add_function(CompiledFunction {
            name: name.to_owned(),
            bytecode,
        })
    }

    /// Emit the module record and finish the program.
    pub fn build(mut self) -> Result<Program> {
        if self.resolve_reexports {
            self.record.resolve_reexports();
        }

        let mut emitter = ModuleRecordEmitter::new(
            &self.record,
            self.module_record_index,
            self.phase_record_index,
            self.options,
        );
        emitter.generate()?;
        let output = emitter.into_output();

        self.program.set_module_record(
            self.module_record_index,
            output.buffer,
            output.constant_local_export_slots,
        );
        self.program
            .set_phase_record(self.phase_record_index, output.phase_buffer);

        info!(
            functions = self.program.function_count(),
            literals = self.program.module_record().len(),
            "program built"
        );
        Ok(self.program)
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
