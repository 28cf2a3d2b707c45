use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::Api;
use kube::Client;
use tracing::debug;
use tracing::warn;

use crate::domain::taint::Taint;
use crate::domain::taint::TaintEffect;
use crate::domain::traits::ClusterNode;
use crate::domain::traits::NodeSource;
use crate::infrastructure::k8s::KubernetesError;

/// Label selecting the nodes eligible for psi taints.
pub const DEFAULT_WORKER_SELECTOR: &str = "node-role.kubernetes.io/worker";

/// Lists worker nodes through the Kubernetes API.
pub struct KubeNodeSource {
    client: Client,
    taint_key: String,
    worker_selector: String,
}

impl KubeNodeSource {
    pub fn new(client: Client, taint_key: impl Into<String>, worker_selector: impl Into<String>) -> Self {
        Self {
            client,
            taint_key: taint_key.into(),
            worker_selector: worker_selector.into(),
        }
    }
}

#[async_trait]
impl NodeSource for KubeNodeSource {
    type Error = KubernetesError;

    #[tracing::instrument(skip(self), fields(selector = %self.worker_selector))]
    async fn list_worker_nodes(&self) -> Result<Vec<ClusterNode>, Report<KubernetesError>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let params = ListParams::default().labels(&self.worker_selector);

        let nodes = api
            .list(&params)
            .await
            .change_context(KubernetesError::ListFailed {
                message: format!("label selector {}", self.worker_selector),
            })?;

        let nodes: Vec<ClusterNode> = nodes
            .items
            .into_iter()
            .filter_map(|node| cluster_node(node, &self.taint_key))
            .collect();
        debug!(count = nodes.len(), "listed worker nodes");
        Ok(nodes)
    }
}

fn cluster_node(node: Node, taint_key: &str) -> Option<ClusterNode> {
    let Some(name) = node.metadata.name else {
        warn!("skipping node without a name");
        return None;
    };
    let existing_taint = node
        .spec
        .and_then(|spec| spec.taints)
        .and_then(|taints| existing_psi_taint(&name, &taints, taint_key));

    Some(ClusterNode {
        name,
        existing_taint,
    })
}

/// Last taint under `taint_key` with an effect the tainter manages.
fn existing_psi_taint(
    node_name: &str,
    taints: &[k8s_openapi::api::core::v1::Taint],
    taint_key: &str,
) -> Option<Taint> {
    taints
        .iter()
        .filter(|t| t.key == taint_key)
        .filter_map(|t| match TaintEffect::from_kubernetes(&t.effect) {
            Some(effect) => Some(Taint {
                key: t.key.clone(),
                effect,
                value: t.value.clone().unwrap_or_default(),
            }),
            None => {
                warn!(node = node_name, effect = %t.effect, "ignoring {taint_key} taint with unmanaged effect");
                None
            }
        })
        .last()
}
