use std::path::Path;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;
use tracing::debug;

use crate::infrastructure::k8s::KubernetesError;

/// Builds a Kubernetes client.
///
/// An explicit kubeconfig wins. Otherwise the in-cluster service account is
/// tried first and the usual `KUBECONFIG` / `~/.kube/config` lookup second.
pub async fn init_kube_client(kubeconfig: Option<&Path>) -> Result<Client, Report<KubernetesError>> {
    let config = match kubeconfig {
        Some(path) => config_from_file(path).await?,
        None => match Config::incluster() {
            Ok(config) => {
                debug!("using in-cluster Kubernetes configuration");
                config
            }
            Err(e) => {
                debug!("in-cluster configuration unavailable ({e}), inferring from environment");
                Config::infer()
                    .await
                    .change_context(KubernetesError::ConnectionFailed {
                        message: "Failed to infer Kubernetes configuration".to_string(),
                    })?
            }
        },
    };

    Client::try_from(config).change_context(KubernetesError::ConnectionFailed {
        message: "Failed to create Kubernetes client".to_string(),
    })
}

async fn config_from_file(path: &Path) -> Result<Config, Report<KubernetesError>> {
    let kubeconfig =
        Kubeconfig::read_from(path).change_context(KubernetesError::ConnectionFailed {
            message: format!("Failed to read kubeconfig file: {}", path.display()),
        })?;

    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .change_context(KubernetesError::ConnectionFailed {
            message: format!("Failed to create config from kubeconfig: {}", path.display()),
        })
}
