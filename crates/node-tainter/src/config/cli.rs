use clap::Parser;
use clap::Subcommand;
use utils::version;

use crate::config::daemon::DaemonArgs;
use crate::config::plan::PlanArgs;

/// Taints busy OpenShift worker nodes based on their CPU pressure stall
/// information so the scheduler prefers idle nodes.
#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile node taints periodically
    Daemon(Box<DaemonArgs>),
    /// Compute a single taint plan and print it as JSON
    Plan(Box<PlanArgs>),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_plan_subcommand() {
        let cli = Cli::try_parse_from([
            "node-tainter",
            "plan",
            "--prometheus-url",
            "http://localhost:9090",
            "--apply",
        ])
        .expect("valid arguments");

        let Commands::Plan(args) = cli.command else {
            panic!("expected plan subcommand");
        };
        assert!(args.apply);
        assert_eq!(args.prometheus.prometheus_url.as_deref(), Some("http://localhost:9090"));
    }
}
