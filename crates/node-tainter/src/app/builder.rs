use std::sync::Arc;

use anyhow::Result;

use crate::app::services::ApplicationServices;
use crate::app::services::KubeReconciler;
use crate::app::Application;
use crate::config::ClusterArgs;
use crate::config::DaemonArgs;
use crate::config::PolicyArgs;
use crate::config::PrometheusArgs;
use crate::domain::reconciler::TaintReconciler;
use crate::domain::taint::TaintPlanner;
use crate::infrastructure::k8s::discover_prometheus_url;
use crate::infrastructure::k8s::KubeNodeSource;
use crate::infrastructure::k8s::KubeTaintExecutor;
use crate::infrastructure::kube_client::init_kube_client;
use crate::infrastructure::metrics::encoders::create_encoder;
use crate::infrastructure::prometheus::CredentialPaths;
use crate::infrastructure::prometheus::Credentials;
use crate::infrastructure::prometheus::PrometheusClient;

/// Application builder
pub struct ApplicationBuilder {
    daemon_args: DaemonArgs,
}

impl ApplicationBuilder {
    pub fn new(daemon_args: DaemonArgs) -> Self {
        Self { daemon_args }
    }

    /// Build complete application
    pub async fn build(self) -> Result<Application> {
        tracing::info!("Building application components...");

        let args = &self.daemon_args;
        let reconciler = build_reconciler(
            &args.cluster,
            &args.policy,
            &args.prometheus,
            args.dry_run,
        )
        .await?;

        let services = ApplicationServices {
            reconciler: Arc::new(reconciler),
            metrics_encoder: Arc::from(create_encoder(&args.metrics_format)),
        };

        Ok(Application::new(services, self.daemon_args))
    }
}

/// Connects to the cluster and Prometheus and assembles a reconciler.
///
/// The Prometheus URL comes from `--prometheus-url` when given and from the
/// OpenShift route otherwise.
pub async fn build_reconciler(
    cluster: &ClusterArgs,
    policy: &PolicyArgs,
    prometheus: &PrometheusArgs,
    dry_run: bool,
) -> Result<KubeReconciler> {
    let policy = policy
        .policy()
        .map_err(|e| anyhow::anyhow!("Invalid taint policy: {e:?}"))?;
    let planner = TaintPlanner::new(policy.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create taint planner: {e:?}"))?;

    let client = init_kube_client(cluster.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {e:?}"))?;

    let prometheus_url = match &prometheus.prometheus_url {
        Some(url) => url.clone(),
        None => discover_prometheus_url(
            client.clone(),
            &prometheus.prometheus_namespace,
            &prometheus.prometheus_route,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to discover Prometheus: {e:?}"))?,
    };

    let credential_paths = CredentialPaths::resolve(
        prometheus.prometheus_token_file.clone(),
        prometheus.prometheus_ca_file.clone(),
    );
    let credentials = Credentials::load(&credential_paths)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load Prometheus credentials: {e:?}"))?;

    let metrics_source = PrometheusClient::new(
        &prometheus_url,
        credentials,
        prometheus.psi_query.clone(),
        prometheus.request_timeout(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to create Prometheus client: {e:?}"))?;

    let node_source = KubeNodeSource::new(
        client.clone(),
        policy.taint_key.as_str(),
        cluster.worker_selector.as_str(),
    );
    let executor = KubeTaintExecutor::new(client, policy.taint_key.as_str(), dry_run);

    tracing::info!(
        taint_key = %policy.taint_key,
        hard_threshold = policy.hard_threshold,
        soft_threshold = policy.soft_threshold,
        max_taint_ratio = policy.max_taint_ratio,
        dry_run,
        "taint reconciler ready"
    );

    Ok(TaintReconciler::new(node_source, metrics_source, executor, planner))
}
