use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use node_tainter::app::build_reconciler;
use node_tainter::app::ApplicationBuilder;
use node_tainter::config::Cli;
use node_tainter::config::Commands;
use node_tainter::config::DaemonArgs;
use node_tainter::config::PlanArgs;
use node_tainter::logging;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon(daemon_args) => run_daemon(*daemon_args).await,
        Commands::Plan(plan_args) => run_plan(*plan_args).await,
    }
}

async fn run_daemon(daemon_args: DaemonArgs) -> Result<()> {
    let _guard = logging::init(daemon_args.metrics_file.as_deref())?;

    tracing::info!(
        "Starting node tainter daemon {} (branch {})",
        &**version::VERSION,
        version::branch()
    );

    let app = ApplicationBuilder::new(daemon_args).build().await?;
    app.run().await?;

    tracing::info!("Node tainter daemon stopped");
    Ok(())
}

async fn run_plan(plan_args: PlanArgs) -> Result<()> {
    utils::logging::init();

    let reconciler = build_reconciler(
        &plan_args.cluster,
        &plan_args.policy,
        &plan_args.prometheus,
        false,
    )
    .await?;

    if plan_args.apply {
        let report = reconciler
            .reconcile_once()
            .await
            .map_err(|e| anyhow::anyhow!("Reconcile cycle failed: {e:?}"))?;
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize cycle report")?
        );
        if !report.failed.is_empty() {
            anyhow::bail!("{} taint patches could not be applied", report.failed.len());
        }
    } else {
        let plan = reconciler
            .plan()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to compute taint plan: {e:?}"))?;
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("failed to serialize taint plan")?
        );
    }

    Ok(())
}
