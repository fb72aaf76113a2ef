//! Compiled program container and its binary artifact.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic "PABC" | version u16 | flags u8
//! function count u32 | (name: u32 len + UTF-8, code: u32 len + bytes)*
//! module record index u32 | module record: u32 len + literal buffer
//! phase record index u32 | [phase record: u32 len + literal buffer]
//! constant slot count u32 | slot u32*
//! xxh64 of everything above, u64
//! ```
//!
//! The phase record is present only when `FLAG_PHASE_RECORD` is set.

use std::collections::BTreeSet;

use pandabc_module::{LiteralBuffer, ModuleLiteralReader, ModuleRecord};
use rustc_hash::FxHashMap;
use xxhash_rust::xxh64::xxh64;

use crate::error::{ProgramError, Result};

pub const MAGIC: [u8; 4] = *b"PABC";
pub const VERSION: u16 = 1;

const FLAG_PHASE_RECORD: u8 = 1 << 0;
const CHECKSUM_SEED: u64 = 0;
const CHECKSUM_SIZE: usize = 8;

/// Finished bytecode of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    pub name: String,
    pub bytecode: Vec<u8>,
}

/// A compiled module: function bytecode plus its module record arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    functions: Vec<CompiledFunction>,
    function_index: FxHashMap<String, usize>,

    module_record: LiteralBuffer,
    module_record_index: u32,
    phase_record: Option<LiteralBuffer>,
    phase_record_index: u32,
    constant_local_export_slots: BTreeSet<u32>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, function: CompiledFunction) -> Result<()> {
        if self.function_index.contains_key(&function.name) {
            return Err(ProgramError::DuplicateFunction(function.name));
        }
        self.function_index
            .insert(function.name.clone(), self.functions.len());
        self.functions.push(function);
        Ok(())
    }

    pub fn set_module_record(
        &mut self,
        index: u32,
        buffer: LiteralBuffer,
        constant_local_export_slots: BTreeSet<u32>,
    ) {
        self.module_record_index = index;
        self.module_record = buffer;
        self.constant_local_export_slots = constant_local_export_slots;
    }

    pub fn set_phase_record(&mut self, index: u32, buffer: Option<LiteralBuffer>) {
        self.phase_record_index = index;
        self.phase_record = buffer;
    }

    pub fn functions(&self) -> &[CompiledFunction] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&CompiledFunction> {
        self.function_index
            .get(name)
            .and_then(|&index| self.functions.get(index))
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn module_record(&self) -> &LiteralBuffer {
        &self.module_record
    }

    pub fn module_record_index(&self) -> u32 {
        self.module_record_index
    }

    pub fn phase_record(&self) -> Option<&LiteralBuffer> {
        self.phase_record.as_ref()
    }

    pub fn phase_record_index(&self) -> u32 {
        self.phase_record_index
    }

    pub fn constant_local_export_slots(&self) -> &BTreeSet<u32> {
        &self.constant_local_export_slots
    }

    /// Rebuild the module record tables from the stored literal arrays.
    pub fn read_module_record(&self) -> Result<ModuleRecord> {
        let mut reader = ModuleLiteralReader::new(&self.module_record)
            .with_constant_slots(&self.constant_local_export_slots);
        if let Some(phase) = &self.phase_record {
            reader = reader.with_phase_buffer(phase);
        }
        Ok(reader.read()?)
    }

    // ==========================================================================
    // Serialization
    // ==========================================================================

    /// Serialize to the artifact format.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        let flags = if self.phase_record.is_some() {
            FLAG_PHASE_RECORD
        } else {
            0
        };
        out.push(flags);

        put_len(&mut out, self.functions.len())?;
        for function in &self.functions {
            put_bytes(&mut out, function.name.as_bytes())?;
            put_bytes(&mut out, &function.bytecode)?;
        }

        out.extend_from_slice(&self.module_record_index.to_le_bytes());
        put_bytes(&mut out, &self.module_record.encode()?)?;

        out.extend_from_slice(&self.phase_record_index.to_le_bytes());
        if let Some(phase) = &self.phase_record {
            put_bytes(&mut out, &phase.encode()?)?;
        }

        put_len(&mut out, self.constant_local_export_slots.len())?;
        for slot in &self.constant_local_export_slots {
            out.extend_from_slice(&slot.to_le_bytes());
        }

        let checksum = xxh64(&out, CHECKSUM_SEED);
        out.extend_from_slice(&checksum.to_le_bytes());
        Ok(out)
    }

    /// Parse an artifact produced by [`write`](Self::write).
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            return Err(ProgramError::InvalidMagic);
        }
        let minimum = MAGIC.len() + CHECKSUM_SIZE;
        if bytes.len() < minimum {
            return Err(ProgramError::Truncated {
                offset: bytes.len(),
                needed: minimum - bytes.len(),
            });
        }
        let (body, tail) = bytes.split_at(bytes.len() - CHECKSUM_SIZE);
        let mut stored = [0u8; CHECKSUM_SIZE];
        stored.copy_from_slice(tail);
        let stored = u64::from_le_bytes(stored);
        let computed = xxh64(body, CHECKSUM_SEED);
        if stored != computed {
            return Err(ProgramError::ChecksumMismatch { stored, computed });
        }

        let mut reader = Reader {
            bytes: body,
            offset: MAGIC.len(),
        };
        let version = u16::from_le_bytes(reader.array()?);
        if version != VERSION {
            return Err(ProgramError::UnsupportedVersion { found: version });
        }
        let [flags] = reader.array()?;

        let mut program = Program::new();
        for _ in 0..reader.u32()? {
            let offset = reader.offset;
            let name = std::str::from_utf8(reader.section()?)
                .map_err(|_| ProgramError::InvalidName { offset })?
                .to_owned();
            let bytecode = reader.section()?.to_vec();
            program.add_function(CompiledFunction { name, bytecode })?;
        }

        let module_record_index = reader.u32()?;
        let module_record = LiteralBuffer::decode(reader.section()?)?;

        let phase_record_index = reader.u32()?;
        let phase_record = if flags & FLAG_PHASE_RECORD != 0 {
            Some(LiteralBuffer::decode(reader.section()?)?)
        } else {
            None
        };

        let mut slots = BTreeSet::new();
        for _ in 0..reader.u32()? {
            slots.insert(reader.u32()?);
        }

        program.set_module_record(module_record_index, module_record, slots);
        program.set_phase_record(phase_record_index, phase_record);
        Ok(program)
    }
}

fn put_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| ProgramError::SectionTooLarge { len })?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    put_len(out, bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.bytes.len() - self.offset;
        if available < len {
            return Err(ProgramError::Truncated {
                offset: self.offset,
                needed: len - available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn section(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }
}
