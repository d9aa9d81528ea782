use crate::OrderedId;
use core::fmt;

/// The part of the timeline a fetch is for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FetchEnd {
    /// Newer records above the first record.
    Top,
    /// Older records below the last record.
    Bottom,
    /// The hole behind the gap keyed by this id.
    Gap(OrderedId),
    /// A full replacement of the timeline.
    Reload,
}

impl fmt::Display for FetchEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => f.write_str("top"),
            Self::Bottom => f.write_str("bottom"),
            Self::Gap(id) => write!(f, "gap {id}"),
            Self::Reload => f.write_str("reload"),
        }
    }
}

/// In-flight bookkeeping for a coordinator.
///
/// At most one fetch runs per edge. A reload excludes every other fetch.
/// Gaps are locked by their own `loading` flag in the timeline; this only
/// counts them so the coordinator knows when it is idle.
///
/// The generation is bumped on every invalidation. Outcomes tagged with an
/// older generation are discarded on arrival.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchState {
    generation: u64,
    top: bool,
    bottom: bool,
    reload: bool,
    gaps: usize,
}

impl FetchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn is_idle(&self) -> bool {
        !self.top && !self.bottom && !self.reload && self.gaps == 0
    }

    pub const fn in_flight(&self) -> usize {
        self.top as usize + self.bottom as usize + self.reload as usize + self.gaps
    }

    pub const fn is_in_flight(&self, end: &FetchEnd) -> bool {
        match end {
            FetchEnd::Top => self.top,
            FetchEnd::Bottom => self.bottom,
            FetchEnd::Gap(_) => self.gaps > 0,
            FetchEnd::Reload => self.reload,
        }
    }

    /// Claims `end`. Returns `false` if it, or a reload, is already running.
    pub fn try_begin(&mut self, end: &FetchEnd) -> bool {
        if self.reload {
            return false;
        }
        match end {
            FetchEnd::Top if self.top => false,
            FetchEnd::Bottom if self.bottom => false,
            FetchEnd::Top => {
                self.top = true;
                true
            }
            FetchEnd::Bottom => {
                self.bottom = true;
                true
            }
            FetchEnd::Gap(_) => {
                self.gaps += 1;
                true
            }
            FetchEnd::Reload => {
                self.reload = true;
                true
            }
        }
    }

    /// Releases `end` after its outcome arrived.
    pub fn finish(&mut self, end: &FetchEnd) {
        match end {
            FetchEnd::Top => self.top = false,
            FetchEnd::Bottom => self.bottom = false,
            FetchEnd::Gap(_) => self.gaps = self.gaps.saturating_sub(1),
            FetchEnd::Reload => self.reload = false,
        }
    }

    /// Forgets every in-flight fetch and starts a new generation.
    pub fn invalidate(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.top = false;
        self.bottom = false;
        self.reload = false;
        self.gaps = 0;
        self.generation
    }
}
