//! Tracing subscriber setup
//!
//! Logs go to stderr; stdout carries frames only.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log output options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// One JSON object per log line
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

impl LogOptions {
    /// `RUST_LOG` wins over `level`
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Install the global subscriber
pub fn init(options: &LogOptions) {
    let layer = if options.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(options.filter())
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(options.filter())
            .boxed()
    };
    tracing_subscriber::registry().with(layer).init();
}
