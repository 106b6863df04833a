//! Tracing setup for structured logging.

use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Install the global subscriber writing to stdout.
///
/// `RUST_LOG` selects the filter (default `info`); `LOG_JSON=1|true` switches
/// to one JSON object per line.
pub fn init_from_env() {
    init_with_writer(std::io::stdout);
}

/// Same as [`init_from_env`] but writing to `writer`, e.g. stderr for the CLI
pub fn init_with_writer<W>(writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_requested(std::env::var("LOG_JSON").ok().as_deref()) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true).with_writer(writer))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_writer(writer))
            .init();
    }
}

fn json_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
}
