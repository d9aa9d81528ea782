//! An in-memory feed server.
//!
//! The server keeps its posts newest first and answers [`FetchRequest`]s the
//! way a paginated REST timeline does: `Before` behaves like `max_id`, `After`
//! like `since_id` (the newest page above the anchor) and `Around` centres
//! the page on the anchor. Network pages are delayed and may fail at random.

use super::status::Status;
use core::time::Duration;
use feedline::{FetchDirection, FetchError, FetchRequest, OrderedId, Origin, PageSource};
use futures::{FutureExt, future::BoxFuture};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::Arc;

/// Roughly the id space of a 2020s snowflake feed.
const FIRST_ID: u64 = 110_000_000_000_000_000;

const ACCOUNTS: &[&str] = &["ana", "bo", "cy", "dee", "eli"];
const WORDS: &[&str] = &[
    "coffee", "rust", "release", "garden", "spoiler", "train", "cats", "review", "weekend",
    "deploy", "music", "finale",
];

struct FeedState {
    /// Newest first.
    posts: Vec<Status>,
    next_id: u64,
    rng: StdRng,
}

impl FeedState {
    fn generate(&mut self) -> Status {
        self.next_id += self.rng.random_range(1..=1_000);
        let account = ACCOUNTS[self.rng.random_range(0..ACCOUNTS.len())].to_string();
        let reblog = match self.posts.get(self.rng.random_range(0..self.posts.len().max(1))) {
            Some(original) if original.reblog.is_none() && self.rng.random_bool(0.1) => {
                Some(Box::new(original.clone()))
            }
            _ => None,
        };
        // A reblog wrapper never replies; the original it carries may.
        let in_reply_to = match self.posts.first() {
            Some(parent) if reblog.is_none() && self.rng.random_bool(0.2) => {
                Some(parent.id.clone())
            }
            _ => None,
        };
        let content = if reblog.is_some() {
            String::new()
        } else {
            (0..self.rng.random_range(2..=5))
                .map(|_| WORDS[self.rng.random_range(0..WORDS.len())])
                .collect::<Vec<_>>()
                .join(" ")
        };
        Status {
            id: self.next_id.into(),
            account,
            content,
            in_reply_to,
            reblog,
            favourited: false,
        }
    }
}

/// The server side of the simulation. Clones share state.
#[derive(Clone)]
pub struct Feed {
    state: Arc<Mutex<FeedState>>,
}

impl Feed {
    /// A feed with `posts` generated posts.
    pub fn generate(seed: u64, posts: usize) -> Self {
        let feed = Self {
            state: Arc::new(Mutex::new(FeedState {
                posts: Vec::with_capacity(posts),
                next_id: FIRST_ID,
                rng: StdRng::seed_from_u64(seed),
            })),
        };
        feed.publish(posts);
        feed
    }

    /// Adds `count` new posts on top and returns the newest id.
    pub fn publish(&self, count: usize) -> Option<OrderedId> {
        let mut state = self.state.lock();
        for _ in 0..count {
            let status = state.generate();
            state.posts.insert(0, status);
        }
        state.posts.first().map(|status| status.id.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().posts.len()
    }

    /// Id of the post `offset` positions below the newest one.
    pub fn id_at(&self, offset: usize) -> Option<OrderedId> {
        self.state
            .lock()
            .posts
            .get(offset)
            .map(|status| status.id.clone())
    }

    /// Copies the newest `count` posts, as a cache would have stored them.
    pub fn snapshot(&self, count: usize) -> Vec<Status> {
        self.state.lock().posts.iter().take(count).cloned().collect()
    }

    /// Answers `request` from the current posts.
    pub fn page(&self, request: &FetchRequest) -> Vec<Status> {
        select(&self.state.lock().posts, request)
    }

    /// Whether the next network call should fail.
    fn roll_failure(&self, rate: f64) -> bool {
        rate > 0.0 && self.state.lock().rng.random_bool(rate)
    }
}

/// Picks the page `request` asks for out of `posts` (newest first).
pub fn select(posts: &[Status], request: &FetchRequest) -> Vec<Status> {
    let limit = request.limit;
    let start = match &request.direction {
        FetchDirection::Latest => 0,
        FetchDirection::Before(anchor) => posts.partition_point(|status| status.id >= *anchor),
        FetchDirection::After(anchor) => {
            // since_id: newest page strictly above the anchor.
            let above = posts.partition_point(|status| status.id > *anchor);
            return posts[..above].iter().take(limit).cloned().collect();
        }
        FetchDirection::Around(anchor) => {
            let at = posts.partition_point(|status| status.id > *anchor);
            at.saturating_sub(limit / 2)
        }
    };
    posts[start..].iter().take(limit).cloned().collect()
}

/// The remote API.
pub struct NetworkSource {
    feed: Feed,
    latency: Duration,
    failure_rate: f64,
}

impl NetworkSource {
    pub const fn new(feed: Feed, latency: Duration, failure_rate: f64) -> Self {
        Self {
            feed,
            latency,
            failure_rate,
        }
    }
}

impl PageSource<Status> for NetworkSource {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Vec<Status>, FetchError>> {
        let result = if self.feed.roll_failure(self.failure_rate) {
            Err(FetchError::Network(format!(
                "503 Service Unavailable ({})",
                request.direction
            )))
        } else {
            Ok(self.feed.page(&request))
        };
        let latency = self.latency;
        async move {
            tokio::time::sleep(latency).await;
            result
        }
        .boxed()
    }
}

/// The on-device store: a frozen snapshot of an older state of the feed.
pub struct CacheSource {
    posts: Arc<[Status]>,
}

impl CacheSource {
    pub fn new(posts: Vec<Status>) -> Self {
        Self {
            posts: posts.into(),
        }
    }
}

impl PageSource<Status> for CacheSource {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Vec<Status>, FetchError>> {
        futures::future::ready(Ok(select(&self.posts, &request))).boxed()
    }

    fn origin(&self) -> Origin {
        Origin::Cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedline::TimelineRecord;

    fn ids(page: &[Status]) -> Vec<OrderedId> {
        page.iter().map(|status| status.id().clone()).collect()
    }

    #[test]
    fn generated_feed_is_descending_and_deterministic() {
        let feed = Feed::generate(1, 50);
        let again = Feed::generate(1, 50);
        let page = feed.page(&FetchRequest::new(FetchDirection::Latest, 50));
        assert_eq!(page.len(), 50);
        assert!(page.windows(2).all(|w| w[0].id > w[1].id));
        assert_eq!(page, again.page(&FetchRequest::new(FetchDirection::Latest, 50)));
    }

    #[test]
    fn directions_follow_rest_semantics() {
        let feed = Feed::generate(3, 30);
        let all = feed.snapshot(30);
        let anchor = all[10].id.clone();

        let before = feed.page(&FetchRequest::new(FetchDirection::Before(anchor.clone()), 5));
        assert_eq!(ids(&before), ids(&all[11..16]));

        let after = feed.page(&FetchRequest::new(FetchDirection::After(anchor.clone()), 5));
        assert_eq!(ids(&after), ids(&all[..5]));

        let around = feed.page(&FetchRequest::new(FetchDirection::Around(anchor), 6));
        assert_eq!(ids(&around), ids(&all[7..13]));
    }

    #[test]
    fn reblogs_carry_no_reply_target() {
        let posts = Feed::generate(13, 300).snapshot(300);
        assert!(posts.iter().any(|status| status.reblog.is_some()));
        assert!(posts.iter().any(|status| status.in_reply_to.is_some()));
        assert!(
            posts
                .iter()
                .filter(|status| status.reblog.is_some())
                .all(|status| status.in_reply_to.is_none())
        );
    }

    #[test]
    fn publish_adds_newer_posts() {
        let feed = Feed::generate(5, 10);
        let before = feed.id_at(0).unwrap();
        let newest = feed.publish(3).unwrap();
        assert!(newest > before);
        assert_eq!(feed.len(), 13);
        assert_eq!(feed.id_at(3), Some(before));
    }

    #[tokio::test]
    async fn cache_is_a_frozen_snapshot() {
        let feed = Feed::generate(9, 20);
        let cache = CacheSource::new(feed.snapshot(10));
        feed.publish(5);

        let page = cache
            .fetch(FetchRequest::new(FetchDirection::Latest, 20))
            .await
            .unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(cache.origin(), Origin::Cache);
        assert_eq!(Some(page[0].id.clone()), feed.id_at(5));
    }

    #[tokio::test]
    async fn network_failures_are_injected() {
        let feed = Feed::generate(11, 20);
        let flaky = NetworkSource::new(feed.clone(), Duration::ZERO, 0.999);
        let result = flaky
            .fetch(FetchRequest::new(FetchDirection::Latest, 5))
            .await;
        assert!(matches!(result, Err(FetchError::Network(_))));

        let steady = NetworkSource::new(feed, Duration::ZERO, 0.0);
        let page = steady
            .fetch(FetchRequest::new(FetchDirection::Latest, 5))
            .await
            .unwrap();
        assert_eq!(page.len(), 5);
    }
}
