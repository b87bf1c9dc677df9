//! Folder-level funding opportunity extraction.
//!
//! Ties PDF reading and text preparation from `ingest` to the model-backed
//! extraction in `extract`, and assembles the run report.

pub mod config;
pub mod metrics;
pub mod runner;

pub use config::{ConfigError, ConfigUpdate, DEFAULT_KEYWORDS, LlmConfig, PipelineConfig, RetryConfig};
pub use metrics::{Metrics, MetricsSnapshot, TimedOperation};
pub use runner::{EMPTY_PDF_SUMMARY, FolderRun, Pipeline};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over
/// `default_filter`; `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
