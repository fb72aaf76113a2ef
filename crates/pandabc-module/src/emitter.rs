//! Serialization of a module record into literal arrays.
//!
//! The record is written as six runs in a fixed order: module requests,
//! regular imports, namespace imports, local exports, indirect exports and
//! star exports. Each run is an `INTEGER` entry count followed by the
//! entries:
//!
//! | run | entry |
//! |---|---|
//! | module request | `STRING source` |
//! | regular import | `STRING local`, `STRING import`, `METHODAFFILIATE request` |
//! | namespace import | `STRING local`, `METHODAFFILIATE request` |
//! | local export | `STRING local`, `STRING export` |
//! | indirect export | `STRING export`, `STRING import`, `METHODAFFILIATE request` |
//! | star export | `METHODAFFILIATE request` |
//!
//! Local exports sharing a local name share one module variable slot, the
//! index of the first occurrence of that name.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::ModuleRecordError;
use crate::literal::{Literal, LiteralBuffer};
use crate::record::ModuleRecord;

/// Phase-record flag for lazily evaluated requests.
pub const PHASE_LAZY: u8 = 1;
/// Phase-record flag for eagerly evaluated requests.
pub const PHASE_EAGER: u8 = 0;

/// Options for [`ModuleRecordEmitter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleRecordOptions {
    /// Also emit the phase buffer: one `INTEGER_8` per module request.
    pub emit_phase_record: bool,
}

impl ModuleRecordOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phase_record(mut self, enabled: bool) -> Self {
        self.emit_phase_record = enabled;
        self
    }
}

/// Everything [`ModuleRecordEmitter::generate`] produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedModuleRecord {
    pub buffer: LiteralBuffer,
    pub phase_buffer: Option<LiteralBuffer>,
    pub constant_local_export_slots: BTreeSet<u32>,
}

/// Serializes one [`ModuleRecord`] into literal buffers.
pub struct ModuleRecordEmitter<'a> {
    record: &'a ModuleRecord,
    buffer_index: u32,
    phase_buffer_index: u32,
    options: ModuleRecordOptions,

    output: GeneratedModuleRecord,
    local_export_slots: FxHashMap<String, u32>,
}

impl<'a> ModuleRecordEmitter<'a> {
    /// `buffer_index` and `phase_buffer_index` are the literal-array slots
    /// the artifact writer reserved for the two buffers.
    pub fn new(
        record: &'a ModuleRecord,
        buffer_index: u32,
        phase_buffer_index: u32,
        options: ModuleRecordOptions,
    ) -> Self {
        Self {
            record,
            buffer_index,
            phase_buffer_index,
            options,
            output: GeneratedModuleRecord::default(),
            local_export_slots: FxHashMap::default(),
        }
    }

    /// Serialize the record. Calling it again regenerates from scratch.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn generate(&mut self) -> Result<(), ModuleRecordError> {
        self.output = GeneratedModuleRecord::default();
        self.local_export_slots.clear();

        self.emit_module_requests()?;
        self.emit_regular_imports()?;
        self.emit_namespace_imports()?;
        self.emit_local_exports()?;
        self.emit_indirect_exports()?;
        self.emit_star_exports()?;
        if self.options.emit_phase_record {
            self.emit_phase_record();
        }

        debug!(
            buffer_index = self.buffer_index,
            literals = self.output.buffer.len(),
            requests = self.record.requests().len(),
            slots = self.local_export_slots.len(),
            constant_slots = self.output.constant_local_export_slots.len(),
            phase_record = self.output.phase_buffer.is_some(),
            "module record generated"
        );
        Ok(())
    }

    pub fn buffer_index(&self) -> u32 {
        self.buffer_index
    }

    pub fn phase_buffer_index(&self) -> u32 {
        self.phase_buffer_index
    }

    pub fn buffer(&self) -> &LiteralBuffer {
        &self.output.buffer
    }

    /// The phase buffer, present only when enabled in the options.
    pub fn phase_buffer(&self) -> Option<&LiteralBuffer> {
        self.output.phase_buffer.as_ref()
    }

    /// Slots of local exports whose first entry is constant.
    pub fn constant_local_export_slots(&self) -> &BTreeSet<u32> {
        &self.output.constant_local_export_slots
    }

    /// Module variable slot assigned to `local_name`.
    pub fn local_export_slot(&self, local_name: &str) -> Option<u32> {
        self.local_export_slots.get(local_name).copied()
    }

    pub fn into_output(self) -> GeneratedModuleRecord {
        self.output
    }

    fn push(&mut self, literal: Literal) {
        self.output.buffer.push(literal);
    }

    fn push_count(&mut self, count: usize) {
        self.push(Literal::Integer(count as u32));
    }

    fn push_string(&mut self, value: &str) {
        self.push(Literal::String(value.to_owned()));
    }

    fn push_request(&mut self, index: u32) -> Result<(), ModuleRecordError> {
        if self.record.request(index).is_none() {
            return Err(ModuleRecordError::InvalidRequest {
                index,
                count: self.record.requests().len(),
            });
        }
        let index =
            u16::try_from(index).map_err(|_| ModuleRecordError::RequestIndexOverflow { index })?;
        self.push(Literal::MethodAffiliate(index));
        Ok(())
    }

    fn emit_module_requests(&mut self) -> Result<(), ModuleRecordError> {
        let record = self.record;
        let count = record.requests().len();
        if count > usize::from(u16::MAX) + 1 {
            return Err(ModuleRecordError::RequestIndexOverflow {
                index: count as u32 - 1,
            });
        }
        self.push_count(count);
        for request in record.requests() {
            self.push_string(&request.source);
        }
        Ok(())
    }

    fn emit_regular_imports(&mut self) -> Result<(), ModuleRecordError> {
        let record = self.record;
        self.push_count(record.regular_imports().len());
        for import in record.regular_imports() {
            self.push_string(&import.local_name);
            self.push_string(&import.import_name);
            self.push_request(import.module_request)?;
        }
        Ok(())
    }

    fn emit_namespace_imports(&mut self) -> Result<(), ModuleRecordError> {
        let record = self.record;
        self.push_count(record.namespace_imports().len());
        for import in record.namespace_imports() {
            self.push_string(&import.local_name);
            self.push_request(import.module_request)?;
        }
        Ok(())
    }

    fn emit_local_exports(&mut self) -> Result<(), ModuleRecordError> {
        let record = self.record;
        self.push_count(record.local_exports().len());
        for export in record.local_exports() {
            if !self.local_export_slots.contains_key(&export.local_name) {
                let slot = self.local_export_slots.len() as u32;
                self.local_export_slots
                    .insert(export.local_name.clone(), slot);
                if export.is_constant {
                    self.output.constant_local_export_slots.insert(slot);
                }
            }
            self.push_string(&export.local_name);
            self.push_string(&export.export_name);
        }
        Ok(())
    }

    fn emit_indirect_exports(&mut self) -> Result<(), ModuleRecordError> {
        let record = self.record;
        self.push_count(record.indirect_exports().len());
        for export in record.indirect_exports() {
            self.push_string(&export.export_name);
            self.push_string(&export.import_name);
            self.push_request(export.module_request)?;
        }
        Ok(())
    }

    fn emit_star_exports(&mut self) -> Result<(), ModuleRecordError> {
        let record = self.record;
        self.push_count(record.star_exports().len());
        for export in record.star_exports() {
            self.push_request(export.module_request)?;
        }
        Ok(())
    }

    fn emit_phase_record(&mut self) {
        let phases = self
            .record
            .requests()
            .iter()
            .map(|request| {
                Literal::Integer8(if request.is_lazy {
                    PHASE_LAZY
                } else {
                    PHASE_EAGER
                })
            })
            .collect();
        self.output.phase_buffer = Some(phases);
    }
}
