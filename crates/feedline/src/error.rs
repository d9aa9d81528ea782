//! Error types for timeline reconciliation.
//!
//! ## Error Cases
//! - `MalformedPage`: a fetched page broke the ordering or bounds contract and
//!   was rejected before merge.
//! - `Fetch`: the page source failed. Transient and retryable.
//! - `OutOfBounds`: a [`crate::PairedList`] index was out of range. Used as
//!   the panic message; it is a programming error and never returned.
//! - `InvalidId`: a string could not be turned into an [`crate::OrderedId`].
//! - `GapBusy` / `GapNotFound`: gap lifecycle misuse.

use crate::OrderedId;

/// A result type defaulting to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors `feedline` can produce.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A fetched page violated the descending-id or bounds precondition.
    #[error("Malformed page: {reason}")]
    MalformedPage { reason: String },

    /// The page source failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// An index was outside `[0, len)`.
    #[error("Index {index} out of bounds (len {len})")]
    OutOfBounds { index: usize, len: usize },

    /// The input is not a valid ordered id.
    #[error("Invalid id: {reason}")]
    InvalidId { reason: String },

    /// The gap already has a fetch in flight.
    #[error("Gap {id} is already loading")]
    GapBusy { id: OrderedId },

    /// No gap with this id exists in the timeline.
    #[error("No gap {id} in timeline")]
    GapNotFound { id: OrderedId },
}

/// Failure reported by a page source.
///
/// Every variant is transient from the timeline's point of view: the state is
/// left untouched and the user may retry.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The network request failed.
    #[error("Network error: {0}")]
    Network(String),

    /// Reading from the local cache failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The source did not answer in time.
    #[error("Fetch timed out")]
    Timeout,
}
