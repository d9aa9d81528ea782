use crate::{
    CoordinatorConfig, Dispatch, Entry, Error, FetchDirection, FetchEnd, FetchOutcome,
    FetchRequest, FetchState, FilterPipeline, Filterable, OrderedId, Origin, Page, PageSource,
    Result, Timeline, TimelineRecord, TimelineUpdate, validate_page,
};
use core::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Drives a [`Timeline`] from a network source and an optional cache.
///
/// The coordinator is owned by a single task. Load requests spawn the fetch
/// on the tokio runtime and return immediately; outcomes are posted back over
/// a channel and merged, in arrival order, when the owner awaits
/// [`Self::next_update`]. Each edge (top, bottom, reload) admits one fetch at
/// a time, and each gap is locked by its `loading` flag.
///
/// [`Self::set_filters`], [`Self::jump_to`] and [`Self::teardown`] start a new
/// generation: in-flight fetches are cancelled, and any outcome that was
/// already posted is discarded on arrival.
///
/// # Panics
///
/// Load requests spawn tokio tasks and panic if called outside a runtime.
pub struct FetchCoordinator<R, V> {
    timeline: Timeline<R, V>,
    filters: FilterPipeline<R>,
    network: Arc<dyn PageSource<R>>,
    cache: Option<Arc<dyn PageSource<R>>>,
    config: CoordinatorConfig,
    state: FetchState,
    token: CancellationToken,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome<R>>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome<R>>,
}

impl<R, V> FetchCoordinator<R, V>
where
    R: Filterable + Send + 'static,
    V: Clone,
{
    pub fn new(
        timeline: Timeline<R, V>,
        network: Arc<dyn PageSource<R>>,
        config: CoordinatorConfig,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            timeline,
            filters: FilterPipeline::new(),
            network,
            cache: None,
            config,
            state: FetchState::new(),
            token: CancellationToken::new(),
            outcome_tx,
            outcome_rx,
        }
    }

    /// Reads the first page from `cache` on [`Self::load_initial`] and after
    /// a filter change.
    pub fn with_cache(mut self, cache: Arc<dyn PageSource<R>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_filters(mut self, filters: FilterPipeline<R>) -> Self {
        self.filters = filters;
        self
    }

    pub const fn timeline(&self) -> &Timeline<R, V> {
        &self.timeline
    }

    pub const fn filters(&self) -> &FilterPipeline<R> {
        &self.filters
    }

    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub const fn state(&self) -> &FetchState {
        &self.state
    }

    /// Whether no fetch of the current generation is outstanding.
    pub const fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Replaces the timeline with the newest page, read from the cache when
    /// one is configured. A cached page is followed by a network refresh once
    /// it has merged.
    pub fn load_initial(&mut self) -> Dispatch {
        if self.state.is_in_flight(&FetchEnd::Reload) {
            return Dispatch::InFlight;
        }
        self.reload()
    }

    /// Fetches records newer than the first record.
    ///
    /// The request is anchored just below the first record so the page
    /// overlaps it whenever nothing is missing in between.
    pub fn refresh(&mut self) -> Dispatch {
        let direction = match self.timeline.first_record_id() {
            Some(first) => FetchDirection::After(first.predecessor()),
            None => FetchDirection::Latest,
        };
        let network = Arc::clone(&self.network);
        self.begin(FetchEnd::Top, network, direction)
    }

    /// Fetches the page below the last record.
    pub fn load_bottom(&mut self) -> Dispatch {
        if self.timeline.is_fully_loaded_bottom() {
            return Dispatch::Exhausted;
        }
        if self.state.is_in_flight(&FetchEnd::Reload) || self.state.is_in_flight(&FetchEnd::Bottom)
        {
            return Dispatch::InFlight;
        }

        let trailing = self.timeline.trailing_gap().cloned();
        if trailing.as_ref().is_some_and(|gap| gap.loading) {
            return Dispatch::InFlight;
        }
        let direction = self.bottom_direction();
        if let Some(gap) = trailing {
            if let Err(_e) = self.timeline.set_gap_loading(&gap.id, true) {
                #[cfg(feature = "tracing")]
                tracing::warn!("Trailing gap refused bottom fetch: {_e}");
                return Dispatch::InFlight;
            }
        }

        let network = Arc::clone(&self.network);
        self.begin(FetchEnd::Bottom, network, direction)
    }

    /// Fetches the records hidden behind the gap keyed `id`.
    ///
    /// The trailing gap is loaded as the bottom edge. A leading gap, with no
    /// record above it, is filled from the newest records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GapNotFound`] if the timeline has no such gap.
    pub fn load_gap(&mut self, id: &OrderedId) -> Result<Dispatch> {
        let index = self
            .timeline
            .gap_index(id)
            .ok_or_else(|| Error::GapNotFound { id: id.clone() })?;
        if index + 1 == self.timeline.len() {
            return Ok(self.load_bottom());
        }
        if self.state.is_in_flight(&FetchEnd::Reload) {
            return Ok(Dispatch::InFlight);
        }

        let direction = if index == 0 {
            FetchDirection::Latest
        } else {
            FetchDirection::Before(id.successor())
        };
        match self.timeline.set_gap_loading(id, true) {
            Ok(()) => {}
            Err(Error::GapBusy { .. }) => return Ok(Dispatch::InFlight),
            Err(e) => return Err(e),
        }

        let network = Arc::clone(&self.network);
        Ok(self.begin(FetchEnd::Gap(id.clone()), network, direction))
    }

    /// Drops the current timeline and rebuilds it around `id`, for example
    /// when opening a notification or a link to an older record.
    pub fn jump_to(&mut self, id: &OrderedId) -> Dispatch {
        self.invalidate();
        let network = Arc::clone(&self.network);
        self.begin(FetchEnd::Reload, network, FetchDirection::Around(id.clone()))
    }

    /// Swaps the filter pipeline and reloads.
    ///
    /// Records already merged were filtered by the old rules, so the timeline
    /// is cleared and rebuilt from the cache (or the network).
    pub fn set_filters(&mut self, filters: FilterPipeline<R>) -> Dispatch {
        self.filters = filters;
        self.timeline.clear();
        self.reload()
    }

    /// See [`Timeline::update_record`].
    pub fn update_record(&mut self, id: &OrderedId, f: impl FnOnce(&mut R)) -> bool {
        self.timeline.update_record(id, f)
    }

    /// See [`Timeline::patch_view`].
    pub fn patch_view(&mut self, id: &OrderedId, f: impl FnOnce(&mut V)) -> bool {
        self.timeline.patch_view(id, f)
    }

    /// See [`Timeline::remove_record`].
    pub fn remove_record(&mut self, id: &OrderedId) -> Option<R> {
        self.timeline.remove_record(id)
    }

    /// Drains local changes without waiting for fetches.
    pub fn take_update(&mut self) -> Option<TimelineUpdate<V>> {
        self.timeline.take_update()
    }

    /// Waits for the next change to the timeline.
    ///
    /// Pending local changes are returned first. Otherwise this waits for
    /// the next fetch outcome and merges it. Returns `None` once nothing is
    /// pending and no fetch is in flight.
    ///
    /// A failed or malformed fetch yields `Some(Err(_))`; the timeline is
    /// left as it was apart from the gap the fetch was for, which returns
    /// to idle so it can be retried.
    pub async fn next_update(&mut self) -> Option<Result<TimelineUpdate<V>>> {
        loop {
            if let Some(update) = self.timeline.take_update() {
                return Some(Ok(update));
            }
            if self.state.is_idle() {
                return None;
            }
            let outcome = self.outcome_rx.recv().await?;
            if let Err(e) = self.apply(outcome) {
                return Some(Err(e));
            }
        }
    }

    /// Validates, filters and merges a fetch outcome.
    ///
    /// Outcomes from an older generation are dropped without effect.
    ///
    /// # Errors
    ///
    /// - [`Error::Fetch`] if the source failed.
    /// - [`Error::MalformedPage`] if the page broke the request's contract.
    pub fn apply(&mut self, outcome: FetchOutcome<R>) -> Result<()> {
        let FetchOutcome {
            generation,
            end,
            request,
            origin,
            result,
        } = outcome;
        if generation != self.state.generation() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                generation,
                current = self.state.generation(),
                %end,
                "Discarding outdated fetch outcome"
            );
            return Ok(());
        }
        self.state.finish(&end);

        let checked = result
            .map_err(Error::from)
            .and_then(|records| validate_page(&request, &records).map(|()| records));
        let records = match checked {
            Ok(records) => records,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%end, direction = %request.direction, "Fetch rejected: {e}");
                self.release(&end);
                return Err(e);
            }
        };

        let page = self
            .filters
            .apply_page(Page::with_origin(records, request.limit, origin));
        #[cfg(feature = "tracing")]
        tracing::debug!(
            %end,
            direction = %request.direction,
            fetched = page.fetched(),
            kept = page.len(),
            ?origin,
            "Merging page"
        );

        match end {
            FetchEnd::Top => self.timeline.merge_top(page),
            // A top merge may have replaced the bottom edge (stale trim)
            // while this page was in flight. Appending it would leave a hole
            // with no gap in front of it.
            FetchEnd::Bottom if request.direction != self.bottom_direction() => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    direction = %request.direction,
                    "Bottom edge moved while loading, discarding page"
                );
            }
            FetchEnd::Bottom => self.timeline.merge_bottom(page),
            FetchEnd::Gap(id) => match self.timeline.gap_index(&id) {
                Some(index) => self.timeline.merge_middle(page, index),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(%id, "Gap merged away while loading, upserting page");
                    self.timeline.merge_records(page.into_records());
                }
            },
            FetchEnd::Reload => {
                if matches!(request.direction, FetchDirection::Around(_)) {
                    self.timeline.reset_around(page);
                } else {
                    self.timeline.reset(page);
                }
                if origin == Origin::Cache {
                    self.refresh();
                }
            }
        }
        Ok(())
    }

    /// Cancels every in-flight fetch. Outcomes that still arrive are
    /// discarded.
    pub fn teardown(&mut self) {
        self.invalidate();
    }

    fn reload(&mut self) -> Dispatch {
        self.invalidate();
        let source = self
            .cache
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.network));
        self.begin(FetchEnd::Reload, source, FetchDirection::Latest)
    }

    fn invalidate(&mut self) {
        let _generation = self.state.invalidate();
        self.token.cancel();
        self.token = CancellationToken::new();

        let loading: Vec<OrderedId> = self
            .timeline
            .iter()
            .filter_map(Entry::as_gap)
            .filter(|gap| gap.loading)
            .map(|gap| gap.id.clone())
            .collect();
        for id in &loading {
            self.release_gap(id);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(generation = _generation, "Invalidated in-flight fetches");
    }

    /// Returns the gap behind a failed fetch to idle.
    /// Where the next page below the timeline starts.
    fn bottom_direction(&self) -> FetchDirection {
        match (self.timeline.trailing_gap(), self.timeline.last_record_id()) {
            (Some(gap), _) => FetchDirection::Before(gap.id.successor()),
            (None, Some(last)) => FetchDirection::Before(last.clone()),
            (None, None) => FetchDirection::Latest,
        }
    }

    fn release(&mut self, end: &FetchEnd) {
        let gap = match end {
            FetchEnd::Gap(id) => Some(id.clone()),
            FetchEnd::Bottom => self
                .timeline
                .trailing_gap()
                .filter(|gap| gap.loading)
                .map(|gap| gap.id.clone()),
            FetchEnd::Top | FetchEnd::Reload => None,
        };
        if let Some(id) = gap {
            self.release_gap(&id);
        }
    }

    fn release_gap(&mut self, id: &OrderedId) {
        // A gap that is gone was bridged or dropped by another merge.
        if let Err(_e) = self.timeline.set_gap_loading(id, false) {
            #[cfg(feature = "tracing")]
            tracing::trace!("Nothing to release: {_e}");
        }
    }

    fn begin(
        &mut self,
        end: FetchEnd,
        source: Arc<dyn PageSource<R>>,
        direction: FetchDirection,
    ) -> Dispatch {
        if !self.state.try_begin(&end) {
            #[cfg(feature = "tracing")]
            tracing::trace!(%end, "Fetch already in flight");
            return Dispatch::InFlight;
        }

        let request = FetchRequest::new(direction, self.config.page_size);
        let generation = self.state.generation();
        let origin = source.origin();
        #[cfg(feature = "tracing")]
        tracing::debug!(
            %end,
            direction = %request.direction,
            limit = request.limit,
            generation,
            ?origin,
            "Dispatching fetch"
        );

        let fetch = source.fetch(request.clone());
        let token = self.token.clone();
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = token.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(%end, generation, "Fetch cancelled");
                    return;
                }
                result = fetch => result,
            };
            let outcome = FetchOutcome {
                generation,
                end,
                request,
                origin,
                result,
            };
            if outcome_tx.send(outcome).is_err() {
                #[cfg(feature = "tracing")]
                tracing::trace!("Coordinator dropped before fetch completed");
            }
        });
        Dispatch::Started
    }
}

impl<R, V> Drop for FetchCoordinator<R, V> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl<R: TimelineRecord, V> fmt::Debug for FetchCoordinator<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("entries", &self.timeline.len())
            .field("filters", &self.filters)
            .field("has_cache", &self.cache.is_some())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
