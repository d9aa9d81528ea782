//! Log output for the simulator.
//!
//! Levels are taken from `RUST_LOG` and default to `info`. Set
//! `RUST_LOG=feedline=debug` to see every dispatch and merge inside the
//! library, or `trace` for cancellations and discarded outcomes.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339()),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_timer(fmt::time::ChronoLocal::rfc_3339()),
            )
            .try_init()?;
    }

    Ok(())
}
