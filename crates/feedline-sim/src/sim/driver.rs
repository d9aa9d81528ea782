//! A scripted user session.
//!
//! The script mirrors what a client does with a home timeline: open it from
//! a stale cache, pull to refresh, scroll, come back after a while, tap the
//! "load more" gaps, favourite something, mute a phrase, and jump to an older
//! post. Failed fetches are retried a few times, the way a user would tap
//! again.

use super::{
    config::SimConfig,
    feed::{CacheSource, Feed, NetworkSource},
    status::{Status, StatusView},
};
use anyhow::bail;
use feedline::{
    CoordinatorConfig, Dispatch, Entry, ExcludeReplies, FetchCoordinator, FilterPipeline,
    Filterable, KeywordFilter, OrderedId, Timeline,
};
use std::sync::Arc;
use tracing::instrument;

/// Retries per step before moving on.
const MAX_ATTEMPTS: usize = 5;

/// Upper bound on "load more" taps in one step.
const MAX_GAP_LOADS: usize = 64;

const SCROLLS: usize = 3;

pub type Coordinator = FetchCoordinator<Status, StatusView>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub updates: usize,
    pub failures: usize,
    pub records: usize,
    pub gaps: usize,
}

pub struct Session {
    feed: Feed,
    coordinator: Coordinator,
    config: SimConfig,
    report: SessionReport,
}

impl Session {
    pub fn new(config: SimConfig) -> Self {
        let feed = Feed::generate(config.seed, config.seed_posts);
        let cached = feed.snapshot(config.cached_posts);
        // Everything published after the cache was written.
        feed.publish(config.page_size * 3);

        let network = NetworkSource::new(feed.clone(), config.latency, config.failure_rate);
        let mut coordinator = FetchCoordinator::new(
            Timeline::new(StatusView::project),
            Arc::new(network),
            CoordinatorConfig::new(config.page_size),
        );
        if !cached.is_empty() {
            coordinator = coordinator.with_cache(Arc::new(CacheSource::new(cached)));
        }

        Self {
            feed,
            coordinator,
            config,
            report: SessionReport::default(),
        }
    }

    pub fn timeline(&self) -> &Timeline<Status, StatusView> {
        self.coordinator.timeline()
    }

    /// Runs the whole script.
    ///
    /// # Errors
    ///
    /// Fails if the timeline ends up out of order or with adjacent gaps.
    pub async fn run(&mut self) -> anyhow::Result<SessionReport> {
        self.step("open", |c| Ok(c.load_initial())).await;

        self.feed.publish(self.config.page_size / 2);
        self.step("refresh", |c| Ok(c.refresh())).await;

        for _ in 0..SCROLLS {
            if self.step("scroll", |c| Ok(c.load_bottom())).await == Dispatch::Exhausted {
                break;
            }
        }

        // Away long enough for more than a page to pile up.
        self.feed.publish(self.config.page_size * 2 + 1);
        self.step("refresh", |c| Ok(c.refresh())).await;
        self.fill_gaps("load more").await;

        self.favourite_first();

        let filters = FilterPipeline::new()
            .with_rule(ExcludeReplies)
            .with_rule(KeywordFilter::whole_word(&self.config.muted_phrase));
        let mut filters = Some(filters);
        self.step("mute", |c| {
            let pipeline = filters.take().unwrap_or_else(|| c.filters().clone());
            Ok(c.set_filters(pipeline))
        })
        .await;

        if let Some(target) = self.feed.id_at(self.feed.len() / 2) {
            tracing::info!(%target, "Jumping to an older post");
            self.step("jump", |c| Ok(c.jump_to(&target))).await;
            self.fill_gaps("catch up").await;
        }

        self.coordinator.teardown();
        self.verify()?;
        Ok(self.report.clone())
    }

    /// Dispatches with `dispatch` and drives the coordinator until idle,
    /// retrying while fetches fail.
    #[instrument(level = "info", skip(self, dispatch))]
    async fn step(
        &mut self,
        name: &str,
        mut dispatch: impl FnMut(&mut Coordinator) -> feedline::Result<Dispatch>,
    ) -> Dispatch {
        for attempt in 1..=MAX_ATTEMPTS {
            let dispatched = match dispatch(&mut self.coordinator) {
                Ok(dispatched) => dispatched,
                Err(e) => {
                    tracing::warn!("Request refused: {e}");
                    return Dispatch::InFlight;
                }
            };
            if dispatched != Dispatch::Started {
                tracing::debug!(?dispatched, "Nothing to fetch");
                return dispatched;
            }
            if self.settle().await {
                return Dispatch::Started;
            }
            tracing::warn!(attempt, "Retrying after failed fetch");
        }
        tracing::error!("Giving up after {MAX_ATTEMPTS} attempts");
        Dispatch::Started
    }

    /// Drains every update. Returns `false` if any fetch failed.
    async fn settle(&mut self) -> bool {
        let mut clean = true;
        while let Some(update) = self.coordinator.next_update().await {
            match update {
                Ok(update) => {
                    self.report.updates += 1;
                    tracing::info!(
                        ops = update.diff.len(),
                        net = update.diff.net_len_change(),
                        entries = update.snapshot.len(),
                        "Timeline updated"
                    );
                    for line in update.snapshot.iter().take(3) {
                        tracing::debug!("{line}");
                    }
                }
                Err(e) => {
                    self.report.failures += 1;
                    clean = false;
                    tracing::warn!("Fetch failed: {e}");
                }
            }
        }
        clean
    }

    /// Taps every gap that is not the trailing one until none is left.
    async fn fill_gaps(&mut self, name: &str) {
        for _ in 0..MAX_GAP_LOADS {
            let Some(gap) = self.inner_gap() else {
                return;
            };
            let before = self.coordinator.timeline().len();
            self.step(name, |c| c.load_gap(&gap)).await;
            if self.inner_gap().as_ref() == Some(&gap) && self.coordinator.timeline().len() == before
            {
                tracing::warn!(%gap, "Gap did not move, leaving it for later");
                return;
            }
        }
    }

    fn inner_gap(&self) -> Option<OrderedId> {
        let entries = self.coordinator.timeline().entries();
        entries[..entries.len().saturating_sub(1)]
            .iter()
            .find_map(Entry::as_gap)
            .map(|gap| gap.id.clone())
    }

    fn favourite_first(&mut self) {
        let Some(id) = self.coordinator.timeline().first_record_id().cloned() else {
            return;
        };
        self.coordinator.update_record(&id, |status| match status.reblog.as_deref_mut() {
            Some(original) => original.favourited = true,
            None => status.favourited = true,
        });
        if let Some(update) = self.coordinator.take_update() {
            self.report.updates += 1;
            tracing::info!(%id, ops = update.diff.len(), "Favourited");
        }
    }

    fn verify(&mut self) -> anyhow::Result<()> {
        let timeline = self.coordinator.timeline();
        for pair in timeline.entries().windows(2) {
            if pair[0].id() <= pair[1].id() {
                bail!("entries out of order: {} then {}", pair[0].id(), pair[1].id());
            }
            if pair[0].is_gap() && pair[1].is_gap() {
                bail!("adjacent gaps at {}", pair[0].id());
            }
        }
        if timeline.views().len() != timeline.len() {
            bail!(
                "projection out of step: {} views for {} entries",
                timeline.views().len(),
                timeline.len()
            );
        }

        self.report.records = timeline.records().count();
        self.report.gaps = timeline.len() - self.report.records;
        let replies = timeline.records().filter(|s| s.canonical().is_reply()).count();
        tracing::info!(
            records = self.report.records,
            gaps = self.report.gaps,
            replies,
            "Timeline verified"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    fn config(failure_rate: f64) -> SimConfig {
        SimConfig {
            page_size: 10,
            seed_posts: 200,
            cached_posts: 30,
            latency: Duration::ZERO,
            failure_rate,
            seed: 42,
            muted_phrase: "spoiler".into(),
            log_json: false,
        }
    }

    #[tokio::test]
    async fn clean_session_ends_filtered_and_consistent() {
        let mut session = Session::new(config(0.0));
        let report = session.run().await.unwrap();

        assert_eq!(report.failures, 0);
        assert!(report.records > 0);
        assert!(report.updates > 0);
        let timeline = session.timeline();
        assert!(timeline.records().all(|s| !s.canonical().is_reply()));
        assert!(
            timeline
                .records()
                .all(|s| !KeywordFilter::whole_word("spoiler").matches(s.canonical().text()))
        );
    }

    #[tokio::test]
    async fn flaky_session_stays_consistent() {
        let mut session = Session::new(config(0.4));
        let report = session.run().await.unwrap();
        assert!(report.failures > 0);
    }

    #[tokio::test]
    async fn session_without_cache_starts_from_network() {
        let mut session = Session::new(SimConfig {
            cached_posts: 0,
            ..config(0.0)
        });
        let report = session.run().await.unwrap();
        assert_eq!(report.failures, 0);
        assert!(report.records > 0);
    }
}
