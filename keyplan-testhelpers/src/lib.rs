#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub use keyplan_testhelpers_macros::test;

use std::sync::LazyLock;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding a `Targets` filter, e.g. `keyplan_format=debug`.
pub const LOG_ENV: &str = "KEYPLAN_LOG";

/// Parses a `Targets` filter, falling back to everything at `TRACE`.
fn log_filter(spec: Option<&str>) -> Targets {
    spec.and_then(|s| s.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_default(tracing::Level::TRACE))
}

static SUBSCRIBER: LazyLock<()> = LazyLock::new(|| {
    let spec = std::env::var(LOG_ENV).ok();
    let layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .without_time()
        .with_target(true)
        .with_line_number(true)
        .compact();
    // another harness may already own the global subscriber
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(log_filter(spec.as_deref()))
        .try_init();
});

/// Installs the test subscriber. Every call after the first is a no-op.
pub fn setup() {
    LazyLock::force(&SUBSCRIBER);
}
