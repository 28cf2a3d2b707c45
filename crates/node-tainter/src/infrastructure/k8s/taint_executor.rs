use std::time::Duration;

use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::Taint as K8sTaint;
use kube::api::Patch as KubePatch;
use kube::api::PatchParams;
use kube::Api;
use kube::Client;
use serde_json::json;
use tokio::time::sleep;
use tracing::info;
use tracing::warn;

use crate::domain::taint::Patch;
use crate::domain::taint::PatchOperation;
use crate::domain::taint::Taint;
use crate::domain::traits::PatchExecutor;
use crate::infrastructure::k8s::KubernetesError;

const MAX_RETRIES: u32 = 3;
const FIELD_MANAGER: &str = "node-tainter";
const BASE_BACKOFF: Duration = Duration::from_millis(200);

/// Writes taint patches to nodes.
///
/// The executor owns every taint under its key: applying a patch drops all
/// of them and, for add and update, appends the desired one.
pub struct KubeTaintExecutor {
    client: Client,
    taint_key: String,
    dry_run: bool,
}

impl KubeTaintExecutor {
    pub fn new(client: Client, taint_key: impl Into<String>, dry_run: bool) -> Self {
        Self {
            client,
            taint_key: taint_key.into(),
            dry_run,
        }
    }

    async fn patch_node_taints(
        &self,
        api: &Api<Node>,
        patch: &Patch,
    ) -> Result<(), Report<KubernetesError>> {
        let failed = |message: &str| KubernetesError::PatchFailed {
            node_name: patch.node_name.clone(),
            message: message.to_string(),
        };

        let node = api
            .get(&patch.node_name)
            .await
            .change_context_lazy(|| failed("failed to read node"))?;

        let current = node.spec.and_then(|spec| spec.taints).unwrap_or_default();
        let taints = desired_taints(current, &self.taint_key, &patch.operation);

        // a stale resourceVersion makes the API server reject the write
        let body = json!({
            "metadata": { "resourceVersion": node.metadata.resource_version },
            "spec": { "taints": taints },
        });

        api.patch(
            &patch.node_name,
            &PatchParams {
                field_manager: Some(FIELD_MANAGER.to_string()),
                ..Default::default()
            },
            &KubePatch::Merge(&body),
        )
        .await
        .change_context_lazy(|| failed("failed to write node taints"))?;

        Ok(())
    }
}

#[async_trait]
impl PatchExecutor for KubeTaintExecutor {
    type Error = KubernetesError;

    #[tracing::instrument(skip(self), fields(node = %patch.node_name, op = patch.operation.kind()))]
    async fn apply(&self, patch: &Patch) -> Result<(), Report<KubernetesError>> {
        if self.dry_run {
            info!("[DRY-RUN] Would {patch}");
            return Ok(());
        }

        let api: Api<Node> = Api::all(self.client.clone());
        let mut retry_count = 0;

        loop {
            match self.patch_node_taints(&api, patch).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    retry_count += 1;
                    warn!(
                        "Failed to patch node taints (attempt {}/{}): {e:?}",
                        retry_count, MAX_RETRIES
                    );

                    if retry_count >= MAX_RETRIES {
                        return Err(e.attach_printable(format!(
                            "gave up after {MAX_RETRIES} attempts"
                        )));
                    }
                    sleep(backoff(retry_count)).await;
                }
            }
        }
    }
}

/// Delay before retry number `failed_attempts + 1`, doubling from
/// [`BASE_BACKOFF`].
fn backoff(failed_attempts: u32) -> Duration {
    BASE_BACKOFF * (1 << failed_attempts.saturating_sub(1))
}

/// Node taint list after applying `operation`. Taints under other keys
/// keep their relative order.
fn desired_taints(current: Vec<K8sTaint>, taint_key: &str, operation: &PatchOperation) -> Vec<K8sTaint> {
    let mut taints: Vec<K8sTaint> = current.into_iter().filter(|t| t.key != taint_key).collect();

    match operation {
        PatchOperation::Add(taint) | PatchOperation::Update(taint) => {
            taints.push(to_k8s_taint(taint));
        }
        PatchOperation::Remove(_) => {}
    }
    taints
}

fn to_k8s_taint(taint: &Taint) -> K8sTaint {
    K8sTaint {
        key: taint.key.clone(),
        effect: taint.effect.as_str().to_string(),
        value: Some(taint.value.clone()),
        time_added: None,
    }
}
