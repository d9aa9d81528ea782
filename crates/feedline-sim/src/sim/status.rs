use core::fmt;
use feedline::{Entry, Filterable, OrderedId, TimelineRecord};

/// A post as the simulated server returns it.
///
/// A reblog carries the original post in `reblog`; its own `content` is
/// empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub id: OrderedId,
    pub account: String,
    pub content: String,
    pub in_reply_to: Option<OrderedId>,
    pub reblog: Option<Box<Status>>,
    pub favourited: bool,
}

impl TimelineRecord for Status {
    fn id(&self) -> &OrderedId {
        &self.id
    }
}

impl Filterable for Status {
    fn canonical(&self) -> &Self {
        self.reblog.as_deref().unwrap_or(self)
    }

    fn is_reply(&self) -> bool {
        self.in_reply_to.is_some()
    }

    fn is_reblog(&self) -> bool {
        self.reblog.is_some()
    }

    fn text(&self) -> &str {
        &self.content
    }
}

/// What the display layer draws for one timeline entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusView {
    Post {
        id: OrderedId,
        line: String,
        favourited: bool,
    },
    LoadMore {
        loading: bool,
    },
}

impl StatusView {
    pub fn project(entry: &Entry<Status>) -> Self {
        match entry {
            Entry::Record(status) => {
                let shown = status.canonical();
                let line = match &status.reblog {
                    Some(original) => format!(
                        "{} boosted @{}: {}",
                        status.account, original.account, original.content
                    ),
                    None => format!("@{}: {}", shown.account, shown.content),
                };
                Self::Post {
                    id: status.id.clone(),
                    line,
                    favourited: shown.favourited,
                }
            }
            Entry::Gap(gap) => Self::LoadMore {
                loading: gap.loading,
            },
        }
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post {
                id,
                line,
                favourited,
            } => {
                let star = if *favourited { "*" } else { " " };
                write!(f, "{star} [{id}] {line}")
            }
            Self::LoadMore { loading: true } => f.write_str("  ... loading ..."),
            Self::LoadMore { loading: false } => f.write_str("  --- load more ---"),
        }
    }
}
