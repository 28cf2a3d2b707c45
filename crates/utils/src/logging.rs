//! provides logging helpers

use std::path::Path;

use tracing::Subscriber;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Environment variable naming a file that receives the regular log output.
pub const LOG_PATH_ENV_VAR: &str = "NODE_TAINTER_LOG_PATH";

/// Builds the env filter, defaulting to `info` when `RUST_LOG` is unset.
pub fn env_filter() -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Returns the human readable fmt layer, writing to `log_path` if set and
/// to stderr otherwise.
pub fn get_fmt_layer<S>(log_path: Option<String>) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match log_path.as_deref().map(Path::new) {
        Some(path) if path.file_name().is_some() => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file = tracing_appender::rolling::never(dir, path.file_name().unwrap_or_default());
            layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .boxed()
        }
        _ => layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    }
}

/// initiate the global tracing subscriber
pub fn init() {
    let log_path = std::env::var(LOG_PATH_ENV_VAR).ok();
    let fmt_layer = get_fmt_layer(log_path).with_filter(env_filter());

    registry().with(fmt_layer).init();
}
