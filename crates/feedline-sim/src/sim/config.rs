use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Largest page a simulated server will hand out, mirroring the caps real
/// feed APIs put on `limit`.
pub const MAX_PAGE_SIZE: usize = 80;

/// Runtime configuration for the `feedline-sim` binary.
///
/// Every value can be given as a flag or an environment variable (a `.env`
/// file is loaded first). The defaults run a short, deterministic session
/// with a stale cache, a few refreshes and some injected failures.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "feedline-sim",
    version,
    about = "Drives a feedline timeline against a simulated feed server"
)]
pub struct CliArgs {
    /// Records requested per page.
    ///
    /// Environment variable: `PAGE_SIZE`
    #[arg(long, env = "PAGE_SIZE", default_value_t = 20)]
    pub page_size: usize,

    /// Posts on the simulated server before the session starts.
    ///
    /// Environment variable: `SEED_POSTS`
    #[arg(long, env = "SEED_POSTS", default_value_t = 400)]
    pub seed_posts: usize,

    /// Posts in the local cache. The cache is a snapshot taken before newer
    /// posts were published, so it starts out stale. Use 0 for no cache.
    ///
    /// Environment variable: `CACHED_POSTS`
    #[arg(long, env = "CACHED_POSTS", default_value_t = 60)]
    pub cached_posts: usize,

    /// Simulated network round trip, in milliseconds.
    ///
    /// Environment variable: `LATENCY_MS`
    #[arg(long, env = "LATENCY_MS", default_value_t = 25)]
    pub latency_ms: u64,

    /// Probability in `[0, 1)` that a network fetch fails.
    ///
    /// Environment variable: `FAILURE_RATE`
    #[arg(long, env = "FAILURE_RATE", default_value_t = 0.1)]
    pub failure_rate: f64,

    /// Seed for post generation and failure injection.
    ///
    /// Environment variable: `SEED`
    #[arg(long, env = "SEED", default_value_t = 7)]
    pub seed: u64,

    /// Phrase hidden by the filter that is switched on mid-session.
    ///
    /// Environment variable: `MUTED_PHRASE`
    #[arg(long, env = "MUTED_PHRASE", default_value_t = String::from("spoiler"))]
    pub muted_phrase: String,

    /// Emit logs as JSON lines instead of human-readable text.
    ///
    /// Environment variable: `LOG_JSON`
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub page_size: usize,
    pub seed_posts: usize,
    pub cached_posts: usize,
    pub latency: Duration,
    pub failure_rate: f64,
    pub seed: u64,
    pub muted_phrase: String,
    pub log_json: bool,
}

impl TryFrom<CliArgs> for SimConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.page_size == 0 {
            bail!("PAGE_SIZE must be greater than 0");
        }

        if args.page_size > MAX_PAGE_SIZE {
            bail!(
                "PAGE_SIZE ({}) exceeds the server limit (max = {})",
                args.page_size,
                MAX_PAGE_SIZE
            );
        }

        if args.seed_posts == 0 {
            bail!("SEED_POSTS must be greater than 0");
        }

        if args.cached_posts > args.seed_posts {
            bail!(
                "CACHED_POSTS ({}) cannot exceed SEED_POSTS ({})",
                args.cached_posts,
                args.seed_posts
            );
        }

        if !(0.0..1.0).contains(&args.failure_rate) {
            bail!(
                "FAILURE_RATE ({}) must lie in [0, 1)",
                args.failure_rate
            );
        }

        if args.muted_phrase.trim().is_empty() {
            bail!("MUTED_PHRASE must not be blank");
        }

        Ok(Self {
            page_size: args.page_size,
            seed_posts: args.seed_posts,
            cached_posts: args.cached_posts,
            latency: Duration::from_millis(args.latency_ms),
            failure_rate: args.failure_rate,
            seed: args.seed,
            muted_phrase: args.muted_phrase,
            log_json: args.log_json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<SimConfig> {
        let argv = ["feedline-sim"].iter().chain(extra);
        SimConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.latency, Duration::from_millis(25));
        assert!(config.cached_posts <= config.seed_posts);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse(&["--page-size", "0"]).is_err());
        assert!(parse(&["--page-size", "81"]).is_err());
        assert!(parse(&["--seed-posts", "10", "--cached-posts", "11"]).is_err());
        assert!(parse(&["--failure-rate", "1.0"]).is_err());
        assert!(parse(&["--failure-rate", "-0.5"]).is_err());
        assert!(parse(&["--muted-phrase", "  "]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&["--page-size", "5", "--failure-rate", "0", "--log-json"]).unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.failure_rate, 0.0);
        assert!(config.log_json);
    }
}
