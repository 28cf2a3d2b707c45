//! Daemon logging: human readable logs plus a raw metrics stream.

use std::env;
use std::fmt;
use std::path::Path;

use anyhow::Context as _;
use tracing::field::Field;
use tracing::field::Visit;
use tracing::Event;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter;
use tracing_subscriber::filter::FilterExt;
use tracing_subscriber::fmt::format;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::FormatFields;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::registry::LookupSpan;
use utils::logging::LOG_PATH_ENV_VAR;

pub const METRICS_TARGET: &str = "metrics";

/// Writes the event's fields verbatim. Metrics lines are already encoded.
struct RawLineFormatter;

struct FieldVisitor {
    msg: String,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, _: &Field, value: &str) {
        self.msg.push_str(value);
    }

    fn record_debug(&mut self, _: &Field, value: &dyn fmt::Debug) {
        self.msg.push_str(&format!("{value:?}"));
    }
}

impl<S, N> FormatEvent<S, N> for RawLineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldVisitor { msg: String::new() };
        event.record(&mut visitor);
        write!(writer, "{}", visitor.msg)
    }
}

fn is_metrics(metadata: &tracing::Metadata<'_>) -> bool {
    metadata.target() == METRICS_TARGET
}

/// Installs the global subscriber for the daemon.
///
/// Metrics lines go to a daily rotated file when `metrics_file` is set and
/// to stdout otherwise. The returned guard must live until shutdown.
///
/// # Errors
///
/// Fails if the metrics file path has no file name or the appender cannot
/// be created.
pub fn init(metrics_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let log_path = env::var(LOG_PATH_ENV_VAR).ok();
    let fmt_layer = utils::logging::get_fmt_layer(log_path).with_filter(
        utils::logging::env_filter().and(filter::filter_fn(|metadata| !is_metrics(metadata))),
    );

    let (metrics_layer, guard) = match metrics_file {
        Some(metrics_file) => {
            let file = metrics_file
                .file_name()
                .and_then(|f| f.to_str())
                .with_context(|| format!("invalid metrics file {}", metrics_file.display()))?;
            let dir = metrics_file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(file)
                .max_log_files(3)
                .build(dir)
                .context("failed to create metrics file appender")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = layer()
                .event_format(RawLineFormatter)
                .fmt_fields(format::DefaultFields::new())
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter::filter_fn(is_metrics))
                .boxed();
            (layer, Some(guard))
        }
        None => {
            let layer = layer()
                .event_format(RawLineFormatter)
                .fmt_fields(format::DefaultFields::new())
                .with_writer(std::io::stdout)
                .with_ansi(false)
                .with_filter(filter::filter_fn(is_metrics))
                .boxed();
            (layer, None)
        }
    };

    registry().with(fmt_layer).with(metrics_layer).init();
    Ok(guard)
}
