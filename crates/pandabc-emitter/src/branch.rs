//! Outstanding branches keyed by instruction offset.

use std::collections::BTreeMap;
use std::ops::RangeBounds;

use crate::label::Label;

/// Ordered `(instruction offset, label)` map.
#[derive(Debug, Default, Clone)]
pub(crate) struct BranchTable {
    entries: BTreeMap<u32, Label>,
}

impl BranchTable {
    pub(crate) fn insert(&mut self, pc: u32, label: Label) {
        self.entries.insert(pc, label);
    }

    pub(crate) fn pop_first(&mut self) -> Option<(u32, Label)> {
        self.entries.pop_first()
    }

    pub(crate) fn range<R>(&self, range: R) -> impl Iterator<Item = (u32, Label)> + '_
    where
        R: RangeBounds<u32>,
    {
        self.entries.range(range).map(|(&pc, &label)| (pc, label))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, Label)> + '_ {
        self.entries.iter().map(|(&pc, &label)| (pc, label))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
