use crate::{FetchError, OrderedId, Origin};
use core::fmt;
use futures::future::BoxFuture;

/// Which slice of the feed a page source should return.
///
/// Anchors are exclusive. Every direction returns records newest first.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FetchDirection {
    /// The newest records, with no anchor.
    Latest,
    /// The newest records strictly older than the anchor.
    Before(OrderedId),
    /// The newest records strictly newer than the anchor.
    After(OrderedId),
    /// Records surrounding the anchor, including it when it exists.
    Around(OrderedId),
}

impl FetchDirection {
    /// Whether `id` may legally appear in a page fetched in this direction.
    pub fn admits(&self, id: &OrderedId) -> bool {
        match self {
            Self::Latest | Self::Around(_) => true,
            Self::Before(anchor) => id < anchor,
            Self::After(anchor) => id > anchor,
        }
    }

    pub fn anchor(&self) -> Option<&OrderedId> {
        match self {
            Self::Latest => None,
            Self::Before(id) | Self::After(id) | Self::Around(id) => Some(id),
        }
    }
}

impl fmt::Display for FetchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Before(id) => write!(f, "before {id}"),
            Self::After(id) => write!(f, "after {id}"),
            Self::Around(id) => write!(f, "around {id}"),
        }
    }
}

/// A single page request handed to a [`PageSource`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub direction: FetchDirection,
    /// Maximum number of records to return.
    pub limit: usize,
}

impl FetchRequest {
    pub const fn new(direction: FetchDirection, limit: usize) -> Self {
        Self { direction, limit }
    }
}

/// Something that can produce pages of records: the network API, the local
/// cache, or a test double.
///
/// Implementations must return at most `limit` records, newest first, all
/// admitted by the request's direction. Pages that break this are rejected
/// with [`crate::Error::MalformedPage`] before they reach the timeline.
///
/// The returned future is driven on a worker task, so it must not borrow
/// from `self`.
pub trait PageSource<R>: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Vec<R>, FetchError>>;

    /// Where this source's pages come from. Cache pages may mark the
    /// timeline stale.
    fn origin(&self) -> Origin {
        Origin::Network
    }
}
