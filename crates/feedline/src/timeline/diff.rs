use std::sync::Arc;

/// A single change to the projected list.
///
/// Ops are meant to be applied in order: each index refers to the list as it
/// stands after every previous op. Positions are a function of ids, and ids
/// never change, so entries are never moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiffOp {
    Inserted { index: usize, count: usize },
    Removed { index: usize, count: usize },
    Changed { index: usize },
}

/// Ordered list of [`DiffOp`]s accumulated since the last drain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff {
    ops: Vec<DiffOp>,
}

impl Diff {
    pub fn ops(&self) -> &[DiffOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, DiffOp> {
        self.ops.iter()
    }

    /// Net number of entries added (negative when entries were removed).
    pub fn net_len_change(&self) -> isize {
        self.ops
            .iter()
            .map(|op| match *op {
                DiffOp::Inserted { count, .. } => count as isize,
                DiffOp::Removed { count, .. } => -(count as isize),
                DiffOp::Changed { .. } => 0,
            })
            .sum()
    }

    pub(crate) fn inserted(&mut self, at: usize) {
        if let Some(DiffOp::Inserted { index, count }) = self.ops.last_mut() {
            if at == *index + *count {
                *count += 1;
                return;
            }
        }
        self.ops.push(DiffOp::Inserted {
            index: at,
            count: 1,
        });
    }

    pub(crate) fn removed(&mut self, at: usize) {
        if let Some(DiffOp::Removed { index, count }) = self.ops.last_mut() {
            if at == *index {
                *count += 1;
                return;
            }
            if at + 1 == *index {
                *index = at;
                *count += 1;
                return;
            }
        }
        self.ops.push(DiffOp::Removed {
            index: at,
            count: 1,
        });
    }

    pub(crate) fn removed_range(&mut self, at: usize, n: usize) {
        if n > 0 {
            self.ops.push(DiffOp::Removed {
                index: at,
                count: n,
            });
        }
    }

    pub(crate) fn changed(&mut self, at: usize) {
        match self.ops.last() {
            Some(DiffOp::Changed { index }) if *index == at => {}
            // A freshly inserted entry is already drawn from its latest value.
            Some(DiffOp::Inserted { index, count }) if (*index..*index + *count).contains(&at) => {}
            _ => self.ops.push(DiffOp::Changed { index: at }),
        }
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = &'a DiffOp;
    type IntoIter = core::slice::Iter<'a, DiffOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

/// What the display layer receives after a change: an immutable snapshot of
/// the projected list and the diff that leads to it.
#[derive(Clone, Debug)]
pub struct TimelineUpdate<V> {
    pub snapshot: Arc<[V]>,
    pub diff: Diff,
}
