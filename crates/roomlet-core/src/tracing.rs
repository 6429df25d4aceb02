use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the JSON stdout subscriber. Level comes from `RUST_LOG`,
/// defaulting to `info` when unset.
///
/// Idempotent: a second call is a no-op rather than a panic, so binaries and
/// test harnesses can both call it unconditionally.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true))
        .try_init();
}
