mod diff;
mod entry;
mod merge;
mod page;

pub use diff::*;
pub use entry::*;
pub use page::*;

use crate::{Error, OrderedId, PairedList, Result, TimelineRecord};
use core::fmt;
use std::sync::Arc;

/// The ordered, de-duplicated sequence of [`Entry`]s behind a feed.
///
/// Entries are kept strictly descending by id (newest first), record ids are
/// unique, and no two gaps are ever adjacent. Every entry has a projected
/// view value `V` kept in lockstep through a [`PairedList`], and every change
/// is recorded in a [`Diff`] that the owner drains with
/// [`Self::take_update`].
///
/// A timeline is owned by a single task. It is not `Sync` by contract: all
/// merges happen sequentially on the owner.
///
/// # Example
/// ```
/// use feedline::{Entry, OrderedId, Page, Timeline, TimelineRecord};
///
/// #[derive(Clone, Debug)]
/// struct Post(OrderedId);
/// impl TimelineRecord for Post {
///     fn id(&self) -> &OrderedId {
///         &self.0
///     }
/// }
///
/// let mut timeline = Timeline::new(|entry: &Entry<Post>| match entry {
///     Entry::Record(post) => post.0.to_string(),
///     Entry::Gap(_) => "load more".to_string(),
/// });
///
/// let page: Vec<Post> = (8..=10_u64).rev().map(|n| Post(n.into())).collect();
/// timeline.merge_top(Page::new(page, 3));
///
/// let update = timeline.take_update().unwrap();
/// assert_eq!(&*update.snapshot, &["10", "9", "8", "load more"]);
/// ```
pub struct Timeline<R, V> {
    entries: PairedList<Entry<R>, V>,
    diff: Diff,
    stale: bool,
    fully_loaded_bottom: bool,
}

impl<R: TimelineRecord, V> Timeline<R, V> {
    /// Creates an empty timeline whose entries are projected with
    /// `projection`.
    pub fn new(projection: impl Fn(&Entry<R>) -> V + Send + Sync + 'static) -> Self {
        Self {
            entries: PairedList::new(projection),
            diff: Diff::default(),
            stale: false,
            fully_loaded_bottom: false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entry<R>> {
        self.entries.as_slice().get(index)
    }

    /// Projected value at `index`.
    pub fn view(&self, index: usize) -> Option<&V> {
        self.entries.projected().get(index)
    }

    pub fn entries(&self) -> &[Entry<R>] {
        self.entries.as_slice()
    }

    pub fn views(&self) -> &[V] {
        self.entries.projected()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Entry<R>> {
        self.entries.as_slice().iter()
    }

    /// Iterates over the records only, newest first.
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.iter().filter_map(Entry::as_record)
    }

    /// Whether the contents came from cache and have not been confirmed by a
    /// network merge at the top yet.
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether a bottom fetch came back short. See [`Page::is_full`].
    pub const fn is_fully_loaded_bottom(&self) -> bool {
        self.fully_loaded_bottom
    }

    pub fn first_record_id(&self) -> Option<&OrderedId> {
        self.records().next().map(TimelineRecord::id)
    }

    pub fn last_record_id(&self) -> Option<&OrderedId> {
        self.iter()
            .rev()
            .find_map(Entry::as_record)
            .map(TimelineRecord::id)
    }

    /// The gap at the very end of the timeline, if any.
    pub fn trailing_gap(&self) -> Option<&Gap> {
        self.entries.as_slice().last().and_then(Entry::as_gap)
    }

    /// Index of the gap keyed `id`.
    pub fn gap_index(&self, id: &OrderedId) -> Option<usize> {
        self.search(id)
            .ok()
            .filter(|&index| self.entries.get(index).is_gap())
    }

    /// Index of the record with `id`.
    pub fn record_index(&self, id: &OrderedId) -> Option<usize> {
        self.search(id)
            .ok()
            .filter(|&index| !self.entries.get(index).is_gap())
    }

    pub fn contains(&self, id: &OrderedId) -> bool {
        self.record_index(id).is_some()
    }

    /// Immutable copy of the projected list.
    pub fn snapshot(&self) -> Arc<[V]>
    where
        V: Clone,
    {
        self.entries.snapshot_projected()
    }

    /// Drains the diff accumulated since the last call.
    pub fn take_diff(&mut self) -> Diff {
        core::mem::take(&mut self.diff)
    }

    /// Drains pending changes into an update for the display layer, or
    /// `None` if nothing changed.
    pub fn take_update(&mut self) -> Option<TimelineUpdate<V>>
    where
        V: Clone,
    {
        if self.diff.is_empty() {
            return None;
        }
        Some(TimelineUpdate {
            diff: self.take_diff(),
            snapshot: self.snapshot(),
        })
    }

    /// Moves a gap through its lifecycle.
    ///
    /// Setting `loading` on a gap that is already loading fails: a gap admits
    /// one fetch at a time.
    ///
    /// # Errors
    ///
    /// - [`Error::GapNotFound`] if no gap is keyed `id`.
    /// - [`Error::GapBusy`] if `loading` is `true` and the gap is already
    ///   loading.
    pub fn set_gap_loading(&mut self, id: &OrderedId, loading: bool) -> Result<()> {
        let index = self
            .gap_index(id)
            .ok_or_else(|| Error::GapNotFound { id: id.clone() })?;
        let current = self.entries.get(index).as_gap().is_some_and(|gap| gap.loading);
        if loading && current {
            return Err(Error::GapBusy { id: id.clone() });
        }
        if current != loading {
            self.entries.update(index, |entry| {
                if let Entry::Gap(gap) = entry {
                    gap.loading = loading;
                }
            });
            self.diff.changed(index);
        }
        Ok(())
    }

    /// Applies a local, optimistic change to a record's payload (for example
    /// marking it favourited) and re-projects it.
    ///
    /// `f` must not change the record's id. Returns `false` if no record has
    /// this id.
    pub fn update_record(&mut self, id: &OrderedId, f: impl FnOnce(&mut R)) -> bool {
        let Some(index) = self.record_index(id) else {
            return false;
        };
        self.entries.update(index, |entry| {
            if let Entry::Record(record) = entry {
                f(record);
            }
        });
        debug_assert_eq!(self.entries.get(index).id(), id, "update_record changed the id");
        self.diff.changed(index);
        true
    }

    /// Patches the projected value of a record without re-running the
    /// projection. The next structural change to that record recomputes it.
    pub fn patch_view(&mut self, id: &OrderedId, f: impl FnOnce(&mut V)) -> bool {
        let Some(index) = self.record_index(id) else {
            return false;
        };
        f(self.entries.projected_at_mut(index));
        self.diff.changed(index);
        true
    }

    /// Removes a record (for example after it was deleted upstream).
    pub fn remove_record(&mut self, id: &OrderedId) -> Option<R> {
        let index = self.record_index(id)?;
        let removed = self.remove_entry(index);
        self.collapse_gaps();
        match removed {
            Entry::Record(record) => Some(record),
            Entry::Gap(_) => None,
        }
    }

    /// Removes every entry and resets the stale and end-of-data flags.
    pub fn clear(&mut self) {
        self.diff.removed_range(0, self.entries.len());
        self.entries.clear();
        self.stale = false;
        self.fully_loaded_bottom = false;
    }

    /// Position of `id` in the descending entry list.
    fn search(&self, id: &OrderedId) -> core::result::Result<usize, usize> {
        self.entries
            .as_slice()
            .binary_search_by(|entry| id.cmp(entry.id()))
    }

    fn insert_entry(&mut self, index: usize, entry: Entry<R>) {
        self.entries.insert(index, entry);
        self.diff.inserted(index);
    }

    fn push_entry(&mut self, entry: Entry<R>) {
        let index = self.entries.len();
        self.insert_entry(index, entry);
    }

    fn replace_entry(&mut self, index: usize, entry: Entry<R>) -> Entry<R> {
        let old = self.entries.set(index, entry);
        self.diff.changed(index);
        old
    }

    fn remove_entry(&mut self, index: usize) -> Entry<R> {
        let entry = self.entries.remove_at(index);
        self.diff.removed(index);
        entry
    }

    fn remove_range(&mut self, start: usize, end: usize) {
        for _ in start..end {
            self.remove_entry(start);
        }
    }
}

impl<R: fmt::Debug, V> fmt::Debug for Timeline<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("entries", &self.entries.as_slice())
            .field("stale", &self.stale)
            .field("fully_loaded_bottom", &self.fully_loaded_bottom)
            .finish_non_exhaustive()
    }
}
