//! A source list paired with a derived projection list.

use crate::Error;
use core::fmt;
use std::sync::Arc;

/// Projection from a source value to its derived value.
pub type Projection<S, V> = Box<dyn Fn(&S) -> V + Send + Sync>;

/// Owns a primary sequence of `S` and a derived sequence of `V` of identical
/// length.
///
/// The derived values come from a projection supplied at construction. Every
/// structural change to the primary sequence (`insert`, `remove_at`, `set`,
/// `push`, `clear`, `truncate`) is mirrored onto the derived sequence in the
/// same call, so `len(primary) == len(derived)` always holds.
///
/// Projections may be expensive. [`Self::projected_at`] and
/// [`Self::set_projected`] never run the projection: callers can patch a
/// derived value without touching the source, and call [`Self::refresh`] when
/// they want it recomputed.
///
/// ## Panics
///
/// Index operations panic with an [`Error::OutOfBounds`] message when the
/// index is outside `[0, len)` (`[0, len]` for [`Self::insert`]). Callers are
/// expected to only use indices they derived from the list itself.
///
/// # Example
/// ```
/// use feedline::PairedList;
///
/// let mut list = PairedList::new(|n: &u32| format!("#{n}"));
/// list.push(1);
/// list.insert(0, 2);
/// assert_eq!(list.projected_at(0), "#2");
///
/// list.set_projected(1, "patched".to_string());
/// assert_eq!(*list.get(1), 1);
/// assert_eq!(list.projected_at(1), "patched");
///
/// list.refresh(1);
/// assert_eq!(list.projected_at(1), "#1");
/// ```
pub struct PairedList<S, V> {
    primary: Vec<S>,
    derived: Vec<V>,
    projection: Projection<S, V>,
}

impl<S, V> PairedList<S, V> {
    /// Creates an empty list with the given projection.
    pub fn new(projection: impl Fn(&S) -> V + Send + Sync + 'static) -> Self {
        Self {
            primary: Vec::new(),
            derived: Vec::new(),
            projection: Box::new(projection),
        }
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// The primary sequence.
    pub fn as_slice(&self) -> &[S] {
        &self.primary
    }

    /// The derived sequence.
    pub fn projected(&self) -> &[V] {
        &self.derived
    }

    #[track_caller]
    pub fn get(&self, index: usize) -> &S {
        self.check(index, self.len());
        &self.primary[index]
    }

    /// Replaces the source value at `index` and re-projects it. Returns the
    /// previous source value.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: S) -> S {
        self.check(index, self.len());
        self.derived[index] = (self.projection)(&value);
        core::mem::replace(&mut self.primary[index], value)
    }

    /// Mutates the source value at `index` in place, then re-projects it.
    #[track_caller]
    pub fn update<T>(&mut self, index: usize, f: impl FnOnce(&mut S) -> T) -> T {
        self.check(index, self.len());
        let out = f(&mut self.primary[index]);
        self.derived[index] = (self.projection)(&self.primary[index]);
        out
    }

    /// Re-runs the projection for `index`, discarding any patched value.
    #[track_caller]
    pub fn refresh(&mut self, index: usize) {
        self.check(index, self.len());
        self.derived[index] = (self.projection)(&self.primary[index]);
    }

    /// Inserts at `index`, shifting later elements. `index == len` appends.
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: S) {
        self.check(index, self.len() + 1);
        self.derived.insert(index, (self.projection)(&value));
        self.primary.insert(index, value);
    }

    pub fn push(&mut self, value: S) {
        self.derived.push((self.projection)(&value));
        self.primary.push(value);
    }

    #[track_caller]
    pub fn remove_at(&mut self, index: usize) -> S {
        self.check(index, self.len());
        self.derived.remove(index);
        self.primary.remove(index)
    }

    /// Shortens both sequences to `len`. No-op when already shorter.
    pub fn truncate(&mut self, len: usize) {
        self.primary.truncate(len);
        self.derived.truncate(len);
    }

    pub fn clear(&mut self) {
        self.primary.clear();
        self.derived.clear();
    }

    #[track_caller]
    pub fn projected_at(&self, index: usize) -> &V {
        self.check(index, self.len());
        &self.derived[index]
    }

    #[track_caller]
    pub fn projected_at_mut(&mut self, index: usize) -> &mut V {
        self.check(index, self.len());
        &mut self.derived[index]
    }

    /// Overwrites the derived value at `index` without touching the source.
    #[track_caller]
    pub fn set_projected(&mut self, index: usize, value: V) -> V {
        self.check(index, self.len());
        core::mem::replace(&mut self.derived[index], value)
    }

    /// An immutable copy of the derived sequence for handoff to the display
    /// layer. Safe to read while the list keeps changing.
    pub fn snapshot_projected(&self) -> Arc<[V]>
    where
        V: Clone,
    {
        Arc::from(self.derived.as_slice())
    }

    #[track_caller]
    fn check(&self, index: usize, bound: usize) {
        debug_assert_eq!(self.primary.len(), self.derived.len());
        if index >= bound {
            panic!(
                "{}",
                Error::OutOfBounds {
                    index,
                    len: self.len()
                }
            );
        }
    }
}

impl<S: fmt::Debug, V: fmt::Debug> fmt::Debug for PairedList<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairedList")
            .field("primary", &self.primary)
            .field("derived", &self.derived)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doubled() -> PairedList<i32, i32> {
        PairedList::new(|n: &i32| n * 2)
    }

    #[test]
    fn structural_ops_stay_in_lockstep() {
        let mut list = doubled();
        list.push(1);
        list.push(3);
        list.insert(1, 2);
        assert_eq!(list.as_slice(), &[1, 2, 3]);
        assert_eq!(list.projected(), &[2, 4, 6]);

        assert_eq!(list.remove_at(0), 1);
        assert_eq!(list.projected(), &[4, 6]);

        assert_eq!(list.set(1, 10), 3);
        assert_eq!(list.projected(), &[4, 20]);

        list.truncate(1);
        assert_eq!(list.len(), 1);
        assert_eq!(list.projected().len(), 1);

        list.clear();
        assert!(list.is_empty());
        assert!(list.projected().is_empty());
    }

    #[test]
    fn set_projected_leaves_primary_alone() {
        let mut list = doubled();
        list.push(5);
        assert_eq!(list.set_projected(0, -1), 10);
        assert_eq!(*list.get(0), 5);
        assert_eq!(*list.projected_at(0), -1);

        // Re-setting the same value re-applies the projection.
        list.set(0, *list.get(0));
        assert_eq!(*list.projected_at(0), 10);
    }

    #[test]
    fn reads_never_invoke_projection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut list = PairedList::new(move |n: &i32| {
            counter.fetch_add(1, Ordering::Relaxed);
            *n
        });
        list.push(1);
        list.push(2);
        assert_eq!(calls.load(Ordering::Relaxed), 2);

        let _ = list.projected_at(0);
        list.set_projected(1, 7);
        let _ = list.snapshot_projected();
        assert_eq!(calls.load(Ordering::Relaxed), 2);

        list.refresh(1);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert_eq!(*list.projected_at(1), 2);
    }

    #[test]
    fn update_reprojects() {
        let mut list = doubled();
        list.push(1);
        let old = list.update(0, |n| core::mem::replace(n, 4));
        assert_eq!(old, 1);
        assert_eq!(*list.projected_at(0), 8);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut list = doubled();
        list.push(1);
        let snapshot = list.snapshot_projected();
        list.push(2);
        list.set_projected(0, 0);
        assert_eq!(&*snapshot, &[2]);
    }

    #[test]
    fn insert_at_len_appends() {
        let mut list = doubled();
        list.insert(0, 1);
        list.insert(1, 2);
        assert_eq!(list.as_slice(), &[1, 2]);
    }

    #[test]
    #[should_panic(expected = "Index 3 out of bounds (len 1)")]
    fn get_out_of_bounds_panics() {
        let mut list = doubled();
        list.push(1);
        let _ = list.get(3);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn insert_past_len_panics() {
        let mut list = doubled();
        list.insert(1, 1);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn set_projected_on_empty_panics() {
        let mut list = doubled();
        list.set_projected(0, 1);
    }
}
