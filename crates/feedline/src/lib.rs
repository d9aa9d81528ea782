//! Timeline reconciliation for paginated feeds.
//!
//! `feedline` keeps a single ordered, de-duplicated list of records that is
//! fed from several places at once: a cache, a network API and local
//! optimistic edits. Missing ranges are tracked explicitly as gaps, and every
//! change is mirrored into a projection list that a display layer can consume
//! together with an index diff.
//!
//! The pieces, leaves first:
//!
//! - [`OrderedId`]: opaque ids ordered by length, then lexicographically.
//! - [`PairedList`]: a source list and its derived projection in lockstep.
//! - [`Entry`] and [`Timeline`]: the ordered sequence and its merge rules.
//! - [`FilterPipeline`]: predicates applied to pages before they merge.
//! - `FetchCoordinator`: at most one fetch per edge, results merged on the
//!   owner (feature `async-tokio`).

mod error;
mod fetch;
mod filter;
mod id;
mod paired;
mod record;
#[cfg(feature = "serde")]
mod serde;
mod timeline;

pub use crate::error::*;
pub use crate::fetch::*;
pub use crate::filter::*;
pub use crate::id::*;
pub use crate::paired::*;
pub use crate::record::*;
#[cfg(feature = "serde")]
pub use crate::serde::*;
pub use crate::timeline::*;
