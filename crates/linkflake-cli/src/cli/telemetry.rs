//! Log output for the `linkflake` binary.
//!
//! Events go to stderr so that stdout carries nothing but command output and
//! can be piped. The filter is read from `RUST_LOG` and defaults to `info`:
//!
//! ```bash
//! RUST_LOG=linkflake=trace linkflake mint --count 10000
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false),
        )
        .try_init()?;

    Ok(())
}
