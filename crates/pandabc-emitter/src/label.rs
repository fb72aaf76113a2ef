//! Label arena and the pc-ordered target list.

use std::fmt;

use crate::error::EmitError;

/// Handle to a program point a branch can target.
///
/// Labels are indices into the owning emitter's arena. A label is created
/// unbound and bound exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(u32);

impl Label {
    /// Arena index of this label.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Owns every label of one emitter.
///
/// `targets` holds the bound labels sorted by pc, so the labels at or after
/// an offset are a suffix found by binary search. Shifting a suffix by a
/// constant keeps it sorted.
#[derive(Debug, Default, Clone)]
pub(crate) struct LabelTable {
    pcs: Vec<Option<u32>>,
    targets: Vec<(u32, Label)>,
}

impl LabelTable {
    pub(crate) fn create(&mut self) -> Label {
        let label = Label(self.pcs.len() as u32);
        self.pcs.push(None);
        label
    }

    pub(crate) fn contains(&self, label: Label) -> bool {
        (label.0 as usize) < self.pcs.len()
    }

    /// Resolved pc, `None` while unbound or for a foreign label.
    pub(crate) fn pc(&self, label: Label) -> Option<u32> {
        self.pcs.get(label.0 as usize).copied().flatten()
    }

    pub(crate) fn bind(&mut self, label: Label, pc: u32) -> Result<(), EmitError> {
        let slot = self
            .pcs
            .get_mut(label.0 as usize)
            .ok_or(EmitError::UnknownLabel(label))?;
        if slot.is_some() {
            return Err(EmitError::LabelAlreadyBound(label));
        }
        *slot = Some(pc);
        let at = self.targets.partition_point(|&(bound, _)| bound <= pc);
        self.targets.insert(at, (pc, label));
        Ok(())
    }

    /// Move every label whose pc is strictly greater than `pc` by `extra`.
    pub(crate) fn shift_after(&mut self, pc: u32, extra: u32) {
        let start = self.targets.partition_point(|&(bound, _)| bound <= pc);
        for (bound, label) in &mut self.targets[start..] {
            *bound += extra;
            self.pcs[label.0 as usize] = Some(*bound);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pcs.len()
    }
}
