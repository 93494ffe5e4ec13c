//! Tracing setup for the daemon and its crates.

use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt};

/// Event on the daemon's internal target, outside any request or send.
#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($arg:tt)+) => {
        $crate::tracing::event!(
            target: "herald::internal",
            $crate::tracing::Level::$level,
            $($arg)+
        )
    };

    ($($arg:tt)+) => {
        $crate::internal!(level = TRACE, $($arg)+)
    };
}

/// Install the global subscriber.
///
/// Only the workspace's own targets are emitted; dependency chatter stays
/// off. `HERALD_LOG` overrides the level (trace in debug builds, info
/// otherwise).
pub fn init() {
    let fallback = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let level = match std::env::var("HERALD_LOG") {
        Ok(value) => LevelFilter::from_str(&value).unwrap_or_else(|_| {
            eprintln!("unrecognised HERALD_LOG value {value:?}, using {fallback}");
            fallback
        }),
        Err(_) => fallback,
    };

    let targets = Targets::new()
        .with_target("herald", level)
        .with_target("herald_common", level)
        .with_target("herald_delivery", level)
        .with_target("herald_control", level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(false)
                .with_line_number(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(targets),
        )
        .init();
}
