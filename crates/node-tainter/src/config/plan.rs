use clap::Parser;

use crate::config::args::ClusterArgs;
use crate::config::args::PolicyArgs;
use crate::config::args::PrometheusArgs;

#[derive(Parser, Clone, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub cluster: ClusterArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,

    #[command(flatten)]
    pub prometheus: PrometheusArgs,

    #[arg(long, help = "Write the planned patches to the cluster after printing them")]
    pub apply: bool,
}
