use super::{FilterScope, Filterable, RecordFilter};

/// Hides replies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExcludeReplies;

impl<R: Filterable> RecordFilter<R> for ExcludeReplies {
    fn excludes(&self, record: &R) -> bool {
        record.is_reply()
    }
}

/// Hides reblogs. Evaluated on the wrapper, since the wrapped record is
/// never itself a reblog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExcludeReblogs;

impl<R: Filterable> RecordFilter<R> for ExcludeReblogs {
    fn excludes(&self, record: &R) -> bool {
        record.is_reblog()
    }

    fn scope(&self) -> FilterScope {
        FilterScope::Wrapper
    }
}

/// Hides records whose text contains a phrase, ignoring case.
///
/// With `whole_word`, the match must not be preceded or followed by an
/// alphanumeric character, so `"cat"` hides "a cat!" but not "concatenate".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordFilter {
    phrase: String,
    whole_word: bool,
}

impl KeywordFilter {
    /// Substring match.
    pub fn new(phrase: impl AsRef<str>) -> Self {
        Self {
            phrase: phrase.as_ref().to_lowercase(),
            whole_word: false,
        }
    }

    pub fn whole_word(phrase: impl AsRef<str>) -> Self {
        Self {
            whole_word: true,
            ..Self::new(phrase)
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub const fn is_whole_word(&self) -> bool {
        self.whole_word
    }

    /// Whether `text` contains the phrase under this filter's rules.
    pub fn matches(&self, text: &str) -> bool {
        if self.phrase.is_empty() {
            return false;
        }
        let haystack = text.to_lowercase();
        if !self.whole_word {
            return haystack.contains(&self.phrase);
        }
        haystack.match_indices(&self.phrase).any(|(start, found)| {
            let before = haystack[..start].chars().next_back();
            let after = haystack[start + found.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
    }
}

impl<R: Filterable> RecordFilter<R> for KeywordFilter {
    fn excludes(&self, record: &R) -> bool {
        self.matches(record.text())
    }
}
