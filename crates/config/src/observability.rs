//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::Settings;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `observability.log_level`. Calling this
/// twice keeps the first subscriber.
pub fn init_tracing(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = settings.observability.log_level.to_lowercase();
        format!("slotfill={}", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    if let Err(e) = subscriber.with(fmt_layer).try_init() {
        eprintln!("Tracing already initialized: {}", e);
    }
}
