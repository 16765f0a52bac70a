//! Tracing/logging initialization.
//!
//! JSON lines with timestamps in production, compact human-readable output
//! in development. `RUST_LOG` overrides the default directive.

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn for_environment(production: bool) -> Self {
        if production { LogFormat::Json } else { LogFormat::Compact }
    }
}

/// JSON logs at `info`.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(LogFormat::Json, "info");
}

pub fn init_with(format: LogFormat, default_directive: &str) {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), default_directive);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
}

/// An unparsable `RUST_LOG` falls back to the default instead of silencing logs.
fn build_filter(env: Option<&str>, default_directive: &str) -> EnvFilter {
    env.and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive))
}
