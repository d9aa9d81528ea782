//! The reconciliation rules.
//!
//! Each merge takes a page that was fetched for one end of the timeline and
//! folds it into the existing entries. Merges cannot fail: pages are checked
//! for ordering and bounds before they get here, and an out-of-contract call
//! (such as `merge_middle` on a record) is a programming error.
//!
//! Gap keys are synthesized from the raw page boundary: a gap directly below
//! id `x` is keyed `x.predecessor()`, a gap directly above it is keyed
//! `x.successor()`. A gap is only inserted when its key sorts strictly
//! between its neighbours; when the key collides with the next record there
//! is no room for a missing id and the hole is closed.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Entry, Gap, OrderedId, Origin, Page, Timeline, TimelineRecord};

impl<R: TimelineRecord, V> Timeline<R, V> {
    /// Merges a page of records that are newer than (or overlap) the current
    /// newest entry.
    ///
    /// - Empty timeline: the page is inserted; a full page gets a trailing
    ///   gap.
    /// - Page reaches the current first record: records newer than it are
    ///   prepended, overlapping ones replace their payloads in place, and any
    ///   gap above the first record is dropped.
    /// - Page does not reach it and is full: a seam gap marks the hole. If the
    ///   timeline is stale (cached) and the page came from the network, the
    ///   old range is trimmed instead of leaving two disjoint sections.
    /// - Page does not reach it and is short: it is prepended with no gap.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(len = page.len(), full = page.is_full()))
    )]
    pub fn merge_top(&mut self, page: Page<R>) {
        let Some(first) = self.first_record_index() else {
            self.clear();
            self.bootstrap(page);
            return;
        };
        let Some(oldest) = page.oldest().cloned() else {
            return;
        };

        // Anything above the first record is a gap that this page either
        // bridges or replaces with a new seam.
        self.remove_range(0, first);

        let full = page.is_full();
        let origin = page.origin();
        let first_id = self.entries.get(0).id().clone();
        let records = page.into_records();

        if oldest <= first_id {
            let split = records
                .iter()
                .position(|record| *record.id() <= first_id)
                .unwrap_or(records.len());
            let mut records = records.into_iter();
            for (index, record) in records.by_ref().take(split).enumerate() {
                self.insert_entry(index, Entry::Record(record));
            }
            records.for_each(|record| self.upsert(record));
        } else if full && self.stale && origin == Origin::Network {
            #[cfg(feature = "tracing")]
            tracing::debug!(trimmed = self.len(), "Dropping stale cached range");
            self.diff.removed_range(0, self.entries.len());
            self.entries.clear();
            records
                .into_iter()
                .for_each(|record| self.push_entry(Entry::Record(record)));
            self.insert_gap_below(&oldest);
        } else {
            for (index, record) in records.into_iter().enumerate() {
                self.insert_entry(index, Entry::Record(record));
            }
            if full {
                self.insert_gap_below(&oldest);
            }
        }

        if origin == Origin::Network {
            self.stale = false;
        }
        self.collapse_gaps();
    }

    /// Merges a page of records older than the current oldest record.
    ///
    /// The trailing gap, if any, is consumed. A full page ends with a new
    /// trailing gap; a short page marks the timeline as fully loaded at the
    /// bottom.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(len = page.len(), full = page.is_full()))
    )]
    pub fn merge_bottom(&mut self, page: Page<R>) {
        let full = page.is_full();
        if self.first_record_index().is_none() {
            self.clear();
            self.bootstrap(page);
            self.fully_loaded_bottom = !full;
            return;
        }

        if self.trailing_gap().is_some() {
            self.remove_entry(self.len() - 1);
        }

        let oldest = page.oldest().cloned();
        for record in page.into_records() {
            let appends = self
                .entries
                .as_slice()
                .last()
                .is_none_or(|last| record.id() < last.id());
            if appends {
                self.push_entry(Entry::Record(record));
            } else {
                self.upsert(record);
            }
        }

        match oldest {
            Some(oldest) if full => self.insert_gap_below(&oldest),
            _ => self.fully_loaded_bottom = true,
        }
        self.collapse_gaps();
    }

    /// Resolves the gap at `gap_index` with a page fetched for it.
    ///
    /// The gap is removed and the records that fall between its neighbours
    /// take its place. A full page re-opens a gap below the inserted records
    /// (the hole may span several pages); a short page closes it. Records
    /// past the neighbours are upserted, and any other gap the page spans is
    /// dropped.
    ///
    /// # Panics
    ///
    /// Panics if the entry at `gap_index` is not a gap.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(gap_index = gap_index, len = page.len(), full = page.is_full()))
    )]
    pub fn merge_middle(&mut self, page: Page<R>, gap_index: usize) {
        if let Entry::Record(record) = self.entries.get(gap_index) {
            panic!("merge_middle: entry {gap_index} ({}) is not a gap", record.id());
        }
        self.remove_entry(gap_index);

        let above = gap_index
            .checked_sub(1)
            .map(|index| self.entries.get(index).id().clone());
        let below = self
            .entries
            .as_slice()
            .get(gap_index)
            .map(|entry| entry.id().clone());

        let full = page.is_full();
        let newest = page.newest().cloned();
        let oldest = page.oldest().cloned();
        let mut at = gap_index;
        let mut outside = Vec::new();
        for record in page.into_records() {
            let inside = above.as_ref().is_none_or(|above| record.id() < above)
                && below.as_ref().is_none_or(|below| record.id() > below);
            if inside {
                self.insert_entry(at, Entry::Record(record));
                at += 1;
            } else {
                outside.push(record);
            }
        }

        if let Some(oldest) = oldest.as_ref().filter(|_| full) {
            self.insert_gap_below(oldest);
        }
        outside.into_iter().for_each(|record| self.upsert(record));
        // The page is contiguous upstream, so no hole can remain inside it.
        if let (Some(newest), Some(oldest)) = (newest, oldest) {
            self.drop_gaps_within(&newest, &oldest);
        }
        self.collapse_gaps();
    }

    /// Upserts records by id with no gap bookkeeping.
    ///
    /// Used when a page can no longer be attributed to an edge, for example
    /// when the gap it was fetched for disappeared while the fetch was in
    /// flight.
    pub fn merge_records(&mut self, records: impl IntoIterator<Item = R>) {
        records.into_iter().for_each(|record| self.upsert(record));
        self.collapse_gaps();
    }

    /// Replaces the whole timeline with `page`, as on a first load.
    pub fn reset(&mut self, page: Page<R>) {
        self.clear();
        self.bootstrap(page);
    }

    /// Replaces the whole timeline with a page fetched around an anchor.
    ///
    /// Nothing is known about newer records, so the page is framed by a
    /// leading gap keyed just above its newest id, and a trailing gap when
    /// the page is full.
    pub fn reset_around(&mut self, page: Page<R>) {
        let newest = page.newest().cloned();
        self.reset(page);
        if let Some(newest) = newest {
            self.insert_entry(0, Entry::Gap(Gap::new(newest.successor())));
        }
        self.collapse_gaps();
    }

    pub(crate) fn first_record_index(&self) -> Option<usize> {
        self.iter().position(|entry| !entry.is_gap())
    }

    fn bootstrap(&mut self, page: Page<R>) {
        let full = page.is_full();
        let oldest = page.oldest().cloned();
        self.stale = page.origin() == Origin::Cache;
        for record in page.into_records() {
            self.push_entry(Entry::Record(record));
        }
        if let Some(oldest) = oldest.filter(|_| full) {
            self.insert_gap_below(&oldest);
        }
    }

    /// Inserts or replaces a single record at its sorted position.
    ///
    /// A record whose id equals a gap key takes the gap's slot; the gap moves
    /// directly below the record, or is dropped if nothing can fit there.
    fn upsert(&mut self, record: R) {
        match self.search(record.id()) {
            Ok(index) => {
                let replaced = self.replace_entry(index, Entry::Record(record));
                if let Entry::Gap(gap) = replaced {
                    self.insert_gap_at_or_after(index + 1, gap.id.predecessor());
                }
            }
            Err(index) => self.insert_entry(index, Entry::Record(record)),
        }
    }

    fn insert_gap_below(&mut self, boundary: &OrderedId) {
        let key = boundary.predecessor();
        if let Err(index) = self.search(&key) {
            self.insert_gap_at_or_after(index, key);
        }
    }

    fn insert_gap_at_or_after(&mut self, index: usize, key: OrderedId) {
        // predecessor("0") is empty and sorts below every real id.
        if key.is_empty() {
            return;
        }
        let fits = self
            .entries
            .as_slice()
            .get(index)
            .is_none_or(|below| *below.id() < key);
        if fits {
            self.insert_entry(index, Entry::Gap(Gap::new(key)));
        }
    }

    /// Removes gaps keyed strictly between `oldest` and `newest`.
    fn drop_gaps_within(&mut self, newest: &OrderedId, oldest: &OrderedId) {
        let mut index = 0;
        while index < self.len() {
            let entry = self.entries.get(index);
            if entry.is_gap() && entry.id() < newest && entry.id() > oldest {
                self.remove_entry(index);
            } else {
                index += 1;
            }
        }
    }

    /// Drops the lower of any two adjacent gaps. The upper one keys the
    /// larger range, so fetching below it still covers both.
    pub(super) fn collapse_gaps(&mut self) {
        let mut index = 1;
        while index < self.len() {
            if self.entries.get(index - 1).is_gap() && self.entries.get(index).is_gap() {
                self.remove_entry(index);
            } else {
                index += 1;
            }
        }
    }
}
