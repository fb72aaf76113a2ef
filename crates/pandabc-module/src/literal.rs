//! Tagged literal arrays and their binary form.
//!
//! A literal buffer is an ordered list of tagged values. The encoded form is
//! a little-endian `u32` literal count followed by each literal as a tag
//! byte and its payload:
//!
//! | tag | payload |
//! |---|---|
//! | `INTEGER` | `u32` |
//! | `INTEGER_8` | `u8` |
//! | `STRING` | `u32` byte length, UTF-8 bytes |
//! | `METHODAFFILIATE` | `u16` |

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::LiteralError;

/// Literal type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum LiteralTag {
    Integer = 0x02,
    String = 0x05,
    /// Index reference into a sibling table.
    MethodAffiliate = 0x09,
    Integer8 = 0x0a,
}

impl fmt::Display for LiteralTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LiteralTag::Integer => "INTEGER",
            LiteralTag::String => "STRING",
            LiteralTag::MethodAffiliate => "METHODAFFILIATE",
            LiteralTag::Integer8 => "INTEGER_8",
        })
    }
}

/// A single tagged value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Integer(u32),
    Integer8(u8),
    String(String),
    MethodAffiliate(u16),
}

impl Literal {
    pub fn tag(&self) -> LiteralTag {
        match self {
            Literal::Integer(_) => LiteralTag::Integer,
            Literal::Integer8(_) => LiteralTag::Integer8,
            Literal::String(_) => LiteralTag::String,
            Literal::MethodAffiliate(_) => LiteralTag::MethodAffiliate,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{} {v}", self.tag()),
            Literal::Integer8(v) => write!(f, "{} {v}", self.tag()),
            Literal::String(s) => write!(f, "{} {s:?}", self.tag()),
            Literal::MethodAffiliate(v) => write!(f, "{} {v}", self.tag()),
        }
    }
}

/// Append-only literal array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralBuffer {
    literals: Vec<Literal>,
}

impl LiteralBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, literal: Literal) {
        self.literals.push(literal);
    }

    pub fn get(&self, index: usize) -> Option<&Literal> {
        self.literals.get(index)
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.literals.iter()
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Serialize to the binary literal-array form.
    pub fn encode(&self) -> Result<Vec<u8>, LiteralError> {
        let mut out = Vec::new();
        let count = u32::try_from(self.literals.len())
            .map_err(|_| LiteralError::TooManyLiterals { count: self.literals.len() })?;
        out.extend_from_slice(&count.to_le_bytes());
        for literal in &self.literals {
            out.push(literal.tag().into());
            match literal {
                Literal::Integer(v) => out.extend_from_slice(&v.to_le_bytes()),
                Literal::Integer8(v) => out.push(*v),
                Literal::String(s) => {
                    let len = u32::try_from(s.len())
                        .map_err(|_| LiteralError::StringTooLong { len: s.len() })?;
                    out.extend_from_slice(&len.to_le_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
                Literal::MethodAffiliate(v) => out.extend_from_slice(&v.to_le_bytes()),
            }
        }
        Ok(out)
    }

    /// Parse the binary form produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, LiteralError> {
        let mut cursor = Cursor { bytes, offset: 0 };
        let count = u32::from_le_bytes(cursor.array()?);
        let mut literals = Vec::new();
        for _ in 0..count {
            let offset = cursor.offset;
            let [byte] = cursor.array()?;
            let tag = LiteralTag::try_from(byte)
                .map_err(|_| LiteralError::UnknownTag { tag: byte, offset })?;
            let literal = match tag {
                LiteralTag::Integer => Literal::Integer(u32::from_le_bytes(cursor.array()?)),
                LiteralTag::Integer8 => {
                    let [v] = cursor.array()?;
                    Literal::Integer8(v)
                }
                LiteralTag::String => {
                    let len = u32::from_le_bytes(cursor.array()?) as usize;
                    let start = cursor.offset;
                    let raw = cursor.take(len)?;
                    let text = std::str::from_utf8(raw)
                        .map_err(|_| LiteralError::InvalidUtf8 { offset: start })?;
                    Literal::String(text.to_owned())
                }
                LiteralTag::MethodAffiliate => {
                    Literal::MethodAffiliate(u16::from_le_bytes(cursor.array()?))
                }
            };
            literals.push(literal);
        }
        let rest = bytes.len() - cursor.offset;
        if rest > 0 {
            return Err(LiteralError::TrailingBytes { count: rest });
        }
        Ok(Self { literals })
    }
}

impl FromIterator<Literal> for LiteralBuffer {
    fn from_iter<I: IntoIterator<Item = Literal>>(iter: I) -> Self {
        Self {
            literals: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for LiteralBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, literal) in self.literals.iter().enumerate() {
            writeln!(f, "{i:4}: {literal}")?;
        }
        Ok(())
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], LiteralError> {
        let available = self.bytes.len() - self.offset;
        if available < len {
            return Err(LiteralError::Truncated {
                offset: self.offset,
                needed: len - available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], LiteralError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
