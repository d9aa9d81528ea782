use crate::OrderedId;

/// A fetched timeline item with a canonical ordered identifier.
///
/// Page sources must return records in descending id order.
pub trait TimelineRecord {
    fn id(&self) -> &OrderedId;
}

impl<R: TimelineRecord + ?Sized> TimelineRecord for Box<R> {
    fn id(&self) -> &OrderedId {
        (**self).id()
    }
}
