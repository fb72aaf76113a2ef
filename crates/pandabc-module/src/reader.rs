//! Parse module-record literal arrays back into a [`ModuleRecord`].

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::emitter::PHASE_LAZY;
use crate::error::ModuleRecordError;
use crate::literal::{Literal, LiteralBuffer, LiteralTag};
use crate::record::ModuleRecord;

/// Reads the six runs written by
/// [`ModuleRecordEmitter`](crate::ModuleRecordEmitter).
///
/// Lazy flags come from the phase buffer when one is supplied; without it
/// every request reads back as eager. Constant flags are restored on the
/// entry that introduced each constant slot.
pub struct ModuleLiteralReader<'a> {
    literals: &'a [Literal],
    position: usize,
    phase_buffer: Option<&'a LiteralBuffer>,
    constant_slots: Option<&'a BTreeSet<u32>>,
}

impl<'a> ModuleLiteralReader<'a> {
    pub fn new(buffer: &'a LiteralBuffer) -> Self {
        Self {
            literals: buffer.literals(),
            position: 0,
            phase_buffer: None,
            constant_slots: None,
        }
    }

    pub fn with_phase_buffer(mut self, phase_buffer: &'a LiteralBuffer) -> Self {
        self.phase_buffer = Some(phase_buffer);
        self
    }

    pub fn with_constant_slots(mut self, slots: &'a BTreeSet<u32>) -> Self {
        self.constant_slots = Some(slots);
        self
    }

    /// Read the whole buffer. Trailing literals are an error.
    pub fn read(mut self) -> Result<ModuleRecord, ModuleRecordError> {
        let mut record = ModuleRecord::new();

        let phases = self.read_phases()?;
        let requests = self.count()?;
        if let Some(found) = phases.as_ref().map(Vec::len).filter(|&n| n != requests) {
            return Err(ModuleRecordError::PhaseLength {
                expected: requests,
                found,
            });
        }
        for i in 0..requests {
            let source = self.string()?;
            let is_lazy = phases.as_ref().is_some_and(|p| p[i]);
            let index = record.add_module_request(source, is_lazy);
            if index as usize != i {
                return Err(ModuleRecordError::DuplicateRequest {
                    source_name: source.to_owned(),
                });
            }
        }

        for _ in 0..self.count()? {
            let local = self.string()?;
            let import = self.string()?;
            let request = self.request()?;
            record.add_import(local, import, request)?;
        }

        for _ in 0..self.count()? {
            let local = self.string()?;
            let request = self.request()?;
            record.add_namespace_import(local, request)?;
        }

        let mut slots: FxHashMap<&str, u32> = FxHashMap::default();
        for _ in 0..self.count()? {
            let local = self.string()?;
            let export = self.string()?;
            let mut is_constant = false;
            if !slots.contains_key(local) {
                let slot = slots.len() as u32;
                slots.insert(local, slot);
                is_constant = self.constant_slots.is_some_and(|set| set.contains(&slot));
            }
            record.add_local_export(local, export, is_constant)?;
        }

        for _ in 0..self.count()? {
            let export = self.string()?;
            let import = self.string()?;
            let request = self.request()?;
            record.add_indirect_export(export, import, request)?;
        }

        for _ in 0..self.count()? {
            let request = self.request()?;
            record.add_star_export(request)?;
        }

        let rest = self.literals.len() - self.position;
        if rest > 0 {
            return Err(ModuleRecordError::TrailingLiterals { count: rest });
        }
        Ok(record)
    }

    fn read_phases(&self) -> Result<Option<Vec<bool>>, ModuleRecordError> {
        let Some(buffer) = self.phase_buffer else {
            return Ok(None);
        };
        buffer
            .iter()
            .enumerate()
            .map(|(index, literal)| match literal {
                Literal::Integer8(flag) => Ok(*flag == PHASE_LAZY),
                other => Err(ModuleRecordError::UnexpectedLiteral {
                    index,
                    expected: LiteralTag::Integer8,
                    found: Some(other.tag()),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn unexpected(&self, expected: LiteralTag) -> ModuleRecordError {
        ModuleRecordError::UnexpectedLiteral {
            index: self.position,
            expected,
            found: self.literals.get(self.position).map(Literal::tag),
        }
    }

    fn count(&mut self) -> Result<usize, ModuleRecordError> {
        match self.literals.get(self.position) {
            Some(Literal::Integer(count)) => {
                self.position += 1;
                Ok(*count as usize)
            }
            _ => Err(self.unexpected(LiteralTag::Integer)),
        }
    }

    fn string(&mut self) -> Result<&'a str, ModuleRecordError> {
        let literals = self.literals;
        match literals.get(self.position) {
            Some(Literal::String(value)) => {
                self.position += 1;
                Ok(value)
            }
            _ => Err(self.unexpected(LiteralTag::String)),
        }
    }

    fn request(&mut self) -> Result<u32, ModuleRecordError> {
        match self.literals.get(self.position) {
            Some(Literal::MethodAffiliate(index)) => {
                self.position += 1;
                Ok(u32::from(*index))
            }
            _ => Err(self.unexpected(LiteralTag::MethodAffiliate)),
        }
    }
}
