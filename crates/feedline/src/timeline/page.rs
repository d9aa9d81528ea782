use crate::{OrderedId, TimelineRecord};

/// Where a page came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The on-device store. Its contents may be stale.
    Cache,
    /// The remote API.
    #[default]
    Network,
}

/// A batch of records ready to merge, together with what was asked for.
///
/// Fullness and boundary ids are captured when the page is created and
/// survive [`Self::retain`], so filtering records out never makes a page look
/// like the end of the data.
#[derive(Clone, Debug)]
pub struct Page<R> {
    records: Vec<R>,
    limit: usize,
    fetched: usize,
    newest: Option<OrderedId>,
    oldest: Option<OrderedId>,
    origin: Origin,
}

impl<R: TimelineRecord> Page<R> {
    /// A page fetched from the network. `records` must be in descending id
    /// order; `limit` is the page size that was requested.
    pub fn new(records: Vec<R>, limit: usize) -> Self {
        Self::with_origin(records, limit, Origin::Network)
    }

    /// A page read from the cache.
    pub fn from_cache(records: Vec<R>, limit: usize) -> Self {
        Self::with_origin(records, limit, Origin::Cache)
    }

    pub fn with_origin(records: Vec<R>, limit: usize, origin: Origin) -> Self {
        debug_assert!(
            records.windows(2).all(|w| w[0].id() > w[1].id()),
            "page records must be strictly descending"
        );
        Self {
            fetched: records.len(),
            newest: records.first().map(|r| r.id().clone()),
            oldest: records.last().map(|r| r.id().clone()),
            records,
            limit,
            origin,
        }
    }

    /// Drops the records for which `keep` returns `false`. Raw size and
    /// boundary ids are unchanged.
    pub fn retain(&mut self, keep: impl FnMut(&R) -> bool) {
        self.records.retain(keep);
    }
}

impl<R> Page<R> {
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    /// Records left after filtering.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Requested page size.
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Records the source returned, before filtering.
    pub const fn fetched(&self) -> usize {
        self.fetched
    }

    /// Whether the source returned as many records as requested, implying
    /// more may exist beyond this page.
    ///
    /// This is a heuristic: a short page is assumed, not proven, to mean the
    /// end of the data in that direction.
    pub const fn is_full(&self) -> bool {
        self.fetched > 0 && self.fetched >= self.limit
    }

    /// Newest id the source returned, before filtering.
    pub const fn newest(&self) -> Option<&OrderedId> {
        self.newest.as_ref()
    }

    /// Oldest id the source returned, before filtering.
    pub const fn oldest(&self) -> Option<&OrderedId> {
        self.oldest.as_ref()
    }

    pub const fn origin(&self) -> Origin {
        self.origin
    }
}
