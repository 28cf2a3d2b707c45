use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::args::ClusterArgs;
use crate::config::args::PolicyArgs;
use crate::config::args::PrometheusArgs;

#[derive(Parser, Clone, Debug)]
pub struct DaemonArgs {
    #[command(flatten)]
    pub cluster: ClusterArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,

    #[command(flatten)]
    pub prometheus: PrometheusArgs,

    #[arg(
        long,
        env = "RECONCILE_INTERVAL_SECS",
        default_value = "60",
        help = "Seconds between two reconcile cycles"
    )]
    pub interval_secs: u64,

    #[arg(
        long,
        env = "DRY_RUN",
        help = "Log the taint patches instead of writing them",
        default_value_t = false,
        action = clap::ArgAction::SetTrue
    )]
    pub dry_run: bool,

    #[arg(
        long,
        env = "TAINT_METRICS_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Path for printing plan metrics, e.g. /logs/metrics.log (stdout when unset)"
    )]
    pub metrics_file: Option<PathBuf>,

    #[arg(
        long,
        env = "TAINT_METRICS_FORMAT",
        default_value = "influx",
        help = "Metrics format, either 'influx' or 'json'"
    )]
    pub metrics_format: String,
}

impl DaemonArgs {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}
