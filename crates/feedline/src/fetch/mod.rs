//! Fetch coordination: which page to ask for, from where, and how its
//! outcome is folded back into the timeline.
//!
//! The pieces here are runtime-agnostic. The tokio-backed
//! [`FetchCoordinator`] is available with the `async-tokio` feature.

#[cfg(feature = "async-tokio")]
mod coordinator;
mod request;
mod state;
mod validate;

#[cfg(feature = "async-tokio")]
pub use coordinator::*;
pub use request::*;
pub use state::*;
pub use validate::*;

use crate::{FetchError, Origin};

/// Tunables for a coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Records requested per page.
    pub page_size: usize,
}

impl CoordinatorConfig {
    pub const DEFAULT_PAGE_SIZE: usize = 30;

    pub const fn new(page_size: usize) -> Self {
        Self { page_size }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE_SIZE)
    }
}

/// What a load request did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dispatch {
    /// A fetch was spawned.
    Started,
    /// A fetch for the same edge (or a reload) is already running.
    InFlight,
    /// The bottom was reached; nothing left to fetch.
    Exhausted,
}

/// The result of a spawned fetch, as posted back to the owner.
#[derive(Debug)]
pub struct FetchOutcome<R> {
    pub(crate) generation: u64,
    pub(crate) end: FetchEnd,
    pub(crate) request: FetchRequest,
    pub(crate) origin: Origin,
    pub(crate) result: Result<Vec<R>, FetchError>,
}

impl<R> FetchOutcome<R> {
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn end(&self) -> &FetchEnd {
        &self.end
    }

    pub const fn request(&self) -> &FetchRequest {
        &self.request
    }

    pub const fn origin(&self) -> Origin {
        self.origin
    }

    pub const fn result(&self) -> &Result<Vec<R>, FetchError> {
        &self.result
    }
}
