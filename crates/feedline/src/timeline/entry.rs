use crate::{OrderedId, TimelineRecord};

/// One slot of a [`crate::Timeline`]: a fetched record or a gap placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry<R> {
    /// A real fetched item.
    Record(R),
    /// Zero or more records between the neighbouring entries that have not
    /// been fetched yet.
    Gap(Gap),
}

/// A placeholder for a known-missing range.
///
/// `id` is a synthesized sort key (see [`OrderedId::predecessor`] and
/// [`OrderedId::successor`]), never a real record id. `loading` is a lock:
/// while it is set, no second fetch may target this gap.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Gap {
    pub id: OrderedId,
    pub loading: bool,
}

impl Gap {
    pub const fn new(id: OrderedId) -> Self {
        Self { id, loading: false }
    }
}

impl<R: TimelineRecord> Entry<R> {
    /// Sort key of this entry.
    pub fn id(&self) -> &OrderedId {
        match self {
            Self::Record(record) => record.id(),
            Self::Gap(gap) => &gap.id,
        }
    }
}

impl<R> Entry<R> {
    pub const fn is_gap(&self) -> bool {
        matches!(self, Self::Gap(_))
    }

    pub const fn as_record(&self) -> Option<&R> {
        match self {
            Self::Record(record) => Some(record),
            Self::Gap(_) => None,
        }
    }

    pub const fn as_gap(&self) -> Option<&Gap> {
        match self {
            Self::Record(_) => None,
            Self::Gap(gap) => Some(gap),
        }
    }
}
