mod rules;

pub use rules::*;

use crate::{Page, TimelineRecord};
use core::fmt;
use std::sync::Arc;

/// Content accessors the built-in filter rules evaluate.
///
/// A reblog wraps another record; [`Self::canonical`] returns the wrapped
/// record so content rules look at what is actually shown.
pub trait Filterable: TimelineRecord {
    /// The record a content rule should look at. Defaults to `self`.
    fn canonical(&self) -> &Self {
        self
    }

    fn is_reply(&self) -> bool;

    fn is_reblog(&self) -> bool;

    /// Plain text used by keyword rules.
    fn text(&self) -> &str;
}

/// Which record a rule is evaluated against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterScope {
    /// The wrapped record for reblogs, the record itself otherwise.
    #[default]
    Canonical,
    /// The record as fetched.
    Wrapper,
}

/// A single filtering rule.
pub trait RecordFilter<R>: Send + Sync {
    /// Returns `true` if `record` must be hidden.
    fn excludes(&self, record: &R) -> bool;

    fn scope(&self) -> FilterScope {
        FilterScope::Canonical
    }
}

impl<R, F> RecordFilter<R> for F
where
    F: Fn(&R) -> bool + Send + Sync,
{
    fn excludes(&self, record: &R) -> bool {
        self(record)
    }
}

/// An ordered chain of [`RecordFilter`]s applied to fetched pages before
/// they merge.
///
/// A record is dropped as soon as one rule excludes it. The pipeline is
/// cheap to clone; rules are shared.
pub struct FilterPipeline<R> {
    rules: Vec<Arc<dyn RecordFilter<R>>>,
}

impl<R> FilterPipeline<R> {
    /// A pipeline that keeps everything.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: impl RecordFilter<R> + 'static) -> Self {
        self.push(rule);
        self
    }

    pub fn push(&mut self, rule: impl RecordFilter<R> + 'static) {
        self.rules.push(Arc::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<R: Filterable> FilterPipeline<R> {
    /// Whether any rule hides `record`.
    pub fn excludes(&self, record: &R) -> bool {
        self.rules.iter().any(|rule| match rule.scope() {
            FilterScope::Canonical => rule.excludes(record.canonical()),
            FilterScope::Wrapper => rule.excludes(record),
        })
    }

    /// Returns the records no rule excludes, in their original order.
    pub fn apply(&self, mut records: Vec<R>) -> Vec<R> {
        if !self.is_empty() {
            records.retain(|record| !self.excludes(record));
        }
        records
    }

    /// Filters a page in place. The page's raw size and boundary ids are
    /// kept, so a heavily filtered page still reads as full.
    pub fn apply_page(&self, mut page: Page<R>) -> Page<R> {
        if !self.is_empty() {
            page.retain(|record| !self.excludes(record));
        }
        page
    }
}

impl<R> Default for FilterPipeline<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for FilterPipeline<R> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<R> fmt::Debug for FilterPipeline<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderedId;

    #[derive(Clone, Debug)]
    struct Status {
        id: OrderedId,
        text: &'static str,
        reply: bool,
        boosted: Option<Box<Status>>,
    }

    impl Status {
        fn new(id: u64, text: &'static str) -> Self {
            Self {
                id: id.into(),
                text,
                reply: false,
                boosted: None,
            }
        }

        fn reply(mut self) -> Self {
            self.reply = true;
            self
        }

        fn boosting(mut self, inner: Status) -> Self {
            self.boosted = Some(Box::new(inner));
            self
        }
    }

    impl TimelineRecord for Status {
        fn id(&self) -> &OrderedId {
            &self.id
        }
    }

    impl Filterable for Status {
        fn canonical(&self) -> &Self {
            self.boosted.as_deref().unwrap_or(self)
        }

        fn is_reply(&self) -> bool {
            self.reply
        }

        fn is_reblog(&self) -> bool {
            self.boosted.is_some()
        }

        fn text(&self) -> &str {
            self.text
        }
    }

    fn ids(records: &[Status]) -> Vec<String> {
        records.iter().map(|s| s.id.to_string()).collect()
    }

    #[test]
    fn empty_pipeline_keeps_everything() {
        let pipeline = FilterPipeline::new();
        let records = vec![Status::new(3, "a"), Status::new(2, "b").reply()];
        assert_eq!(ids(&pipeline.apply(records)), ["3", "2"]);
    }

    #[test]
    fn rules_chain_in_order() {
        let pipeline = FilterPipeline::new()
            .with_rule(ExcludeReplies)
            .with_rule(KeywordFilter::new("spoiler"));
        let records = vec![
            Status::new(5, "hello"),
            Status::new(4, "big SPOILER ahead"),
            Status::new(3, "re: hello").reply(),
            Status::new(2, "bye"),
        ];
        assert_eq!(pipeline.len(), 2);
        assert_eq!(ids(&pipeline.apply(records)), ["5", "2"]);
    }

    #[test]
    fn content_rules_look_through_reblogs() {
        let pipeline = FilterPipeline::new().with_rule(KeywordFilter::new("spoiler"));
        let boost = Status::new(9, "").boosting(Status::new(1, "spoiler inside"));
        assert!(pipeline.excludes(&boost));
    }

    #[test]
    fn wrapper_rules_see_the_reblog() {
        let pipeline = FilterPipeline::new().with_rule(ExcludeReblogs);
        let boost = Status::new(9, "").boosting(Status::new(1, "fine"));
        assert!(pipeline.excludes(&boost));
        assert!(!pipeline.excludes(&Status::new(8, "fine")));

        // A reply boosted by someone else is judged on the original.
        let replies = FilterPipeline::new().with_rule(ExcludeReplies);
        let boosted_reply = Status::new(7, "").boosting(Status::new(2, "re").reply());
        assert!(replies.excludes(&boosted_reply));
    }

    #[test]
    fn closures_are_rules() {
        let pipeline =
            FilterPipeline::<Status>::new().with_rule(|status: &Status| status.text.len() > 5);
        let records = vec![Status::new(2, "short"), Status::new(1, "too long")];
        assert_eq!(ids(&pipeline.apply(records)), ["2"]);
    }

    #[test]
    fn apply_page_keeps_raw_boundaries() {
        let pipeline = FilterPipeline::new().with_rule(KeywordFilter::new("x"));
        let records = vec![
            Status::new(3, "x"),
            Status::new(2, "y"),
            Status::new(1, "x"),
        ];
        let page = pipeline.apply_page(Page::new(records, 3));

        assert_eq!(ids(page.records()), ["2"]);
        assert!(page.is_full());
        assert_eq!(page.newest(), Some(&OrderedId::from(3_u64)));
        assert_eq!(page.oldest(), Some(&OrderedId::from(1_u64)));
    }

    #[test]
    fn clones_share_rules() {
        let pipeline = FilterPipeline::<Status>::new().with_rule(ExcludeReplies);
        let copy = pipeline.clone();
        assert_eq!(copy.len(), 1);
        assert!(copy.excludes(&Status::new(1, "").reply()));
    }
}
