use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use error_stack::Report;

use crate::config::policy::PolicyConfig;
use crate::config::policy::parse_policy_config;
use crate::domain::taint::quota::DEFAULT_MAX_TAINT_RATIO;
use crate::domain::taint::policy::DEFAULT_HARD_THRESHOLD;
use crate::domain::taint::policy::DEFAULT_SOFT_THRESHOLD;
use crate::domain::taint::PlanError;
use crate::domain::taint::TaintPolicy;
use crate::domain::taint::DEFAULT_TAINT_KEY;
use crate::infrastructure::k8s::node_source::DEFAULT_WORKER_SELECTOR;
use crate::infrastructure::k8s::route::DEFAULT_PROMETHEUS_NAMESPACE;
use crate::infrastructure::k8s::route::DEFAULT_PROMETHEUS_ROUTE;
use crate::infrastructure::prometheus::PSI_CPU_QUERY;

#[derive(Args, Clone, Debug)]
pub struct ClusterArgs {
    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        env = "WORKER_SELECTOR",
        default_value = DEFAULT_WORKER_SELECTOR,
        help = "Label selector picking the worker nodes to manage"
    )]
    pub worker_selector: String,
}

#[derive(Args, Clone, Debug)]
pub struct PolicyArgs {
    #[arg(long, env = "TAINT_KEY", default_value = DEFAULT_TAINT_KEY, help = "Key of the managed taint")]
    pub taint_key: String,

    #[arg(
        long,
        env = "HARD_THRESHOLD",
        default_value_t = DEFAULT_HARD_THRESHOLD,
        help = "CPU pressure percentage at or above which a node may get a NoSchedule taint"
    )]
    pub hard_threshold: f64,

    #[arg(
        long,
        env = "SOFT_THRESHOLD",
        default_value_t = DEFAULT_SOFT_THRESHOLD,
        help = "CPU pressure percentage at or above which a node may get a PreferNoSchedule taint"
    )]
    pub soft_threshold: f64,

    #[arg(
        long,
        env = "MAX_TAINT_RATIO",
        default_value_t = DEFAULT_MAX_TAINT_RATIO,
        help = "Share of worker nodes that may be tainted at once"
    )]
    pub max_taint_ratio: f64,

    #[arg(
        long,
        env = "TAINT_POLICY_CONFIG",
        help = "Taint policy as JSON string (taintKey, hardThreshold, softThreshold, maxTaintRatio), overrides the single flags",
        value_parser = parse_policy_config
    )]
    pub policy_config: Option<PolicyConfig>,
}

impl PolicyArgs {
    /// Flag values with the JSON policy config applied on top.
    ///
    /// # Errors
    ///
    /// - [`PlanError::InvalidPolicy`] if the resulting policy does not validate
    pub fn policy(&self) -> Result<TaintPolicy, Report<PlanError>> {
        let mut policy = TaintPolicy {
            taint_key: self.taint_key.clone(),
            hard_threshold: self.hard_threshold,
            soft_threshold: self.soft_threshold,
            max_taint_ratio: self.max_taint_ratio,
        };
        if let Some(config) = &self.policy_config {
            config.apply_to(&mut policy);
        }
        policy.validate()?;
        Ok(policy)
    }
}

#[derive(Args, Clone, Debug)]
pub struct PrometheusArgs {
    #[arg(
        long,
        env = "PROMETHEUS_URL",
        help = "Prometheus base URL, e.g. https://prometheus.example.com (discovered from the OpenShift route when unset)"
    )]
    pub prometheus_url: Option<String>,

    #[arg(long, default_value = DEFAULT_PROMETHEUS_NAMESPACE, help = "Namespace of the Prometheus route")]
    pub prometheus_namespace: String,

    #[arg(long, default_value = DEFAULT_PROMETHEUS_ROUTE, help = "Name of the Prometheus route")]
    pub prometheus_route: String,

    #[arg(
        long,
        env = "PROMETHEUS_TOKEN_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Bearer token file (defaults to the service account token, then ./token)"
    )]
    pub prometheus_token_file: Option<PathBuf>,

    #[arg(
        long,
        env = "PROMETHEUS_CA_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "CA bundle for the Prometheus endpoint (defaults to the service account CA, then ./ca.crt)"
    )]
    pub prometheus_ca_file: Option<PathBuf>,

    #[arg(long, env = "PSI_QUERY", default_value = PSI_CPU_QUERY, help = "PromQL query returning the CPU stall ratio per instance")]
    pub psi_query: String,

    #[arg(long, default_value = "30", help = "Timeout for a single Prometheus request in seconds")]
    pub request_timeout_secs: u64,
}

impl PrometheusArgs {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use similar_asserts::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        policy: PolicyArgs,
    }

    #[test]
    fn flags_build_policy() {
        let cli = TestCli::try_parse_from(["test", "--hard-threshold", "70", "--max-taint-ratio", "0.25"])
            .expect("valid arguments");

        let policy = cli.policy.policy().expect("valid policy");
        assert_eq!(policy.hard_threshold, 70.0);
        assert_eq!(policy.soft_threshold, DEFAULT_SOFT_THRESHOLD);
        assert_eq!(policy.max_taint_ratio, 0.25);
        assert_eq!(policy.taint_key, DEFAULT_TAINT_KEY);
    }

    #[test]
    fn json_config_overrides_flags() {
        let cli = TestCli::try_parse_from([
            "test",
            "--hard-threshold",
            "70",
            "--policy-config",
            r#"{"hardThreshold": "80", "taintKey": "psi"}"#,
        ])
        .expect("valid arguments");

        let policy = cli.policy.policy().expect("valid policy");
        assert_eq!(policy.hard_threshold, 80.0);
        assert_eq!(policy.taint_key, "psi");
    }

    #[test]
    fn soft_above_hard_is_rejected() {
        let cli = TestCli::try_parse_from(["test", "--soft-threshold", "60"]).expect("valid arguments");

        let err = cli.policy.policy().expect_err("soft above hard");
        assert!(matches!(err.current_context(), PlanError::InvalidPolicy { .. }));
    }
}
