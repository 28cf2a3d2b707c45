use error_stack::Report;
use error_stack::ResultExt;
use kube::api::ApiResource;
use kube::api::DynamicObject;
use kube::api::GroupVersionKind;
use kube::Api;
use kube::Client;
use tracing::info;

use crate::infrastructure::k8s::KubernetesError;

pub const DEFAULT_PROMETHEUS_NAMESPACE: &str = "openshift-monitoring";
pub const DEFAULT_PROMETHEUS_ROUTE: &str = "prometheus-k8s";

/// Resolves the external Prometheus URL from an OpenShift `Route`.
///
/// # Errors
///
/// - [`KubernetesError::RouteNotFound`] if the route cannot be read or has no
///   admitted ingress host
pub async fn discover_prometheus_url(
    client: Client,
    namespace: &str,
    name: &str,
) -> Result<String, Report<KubernetesError>> {
    let not_found = |message: &str| KubernetesError::RouteNotFound {
        name: name.to_string(),
        namespace: namespace.to_string(),
        message: message.to_string(),
    };

    let gvk = GroupVersionKind::gvk("route.openshift.io", "v1", "Route");
    let resource = ApiResource::from_gvk(&gvk);
    let api: Api<DynamicObject> = Api::namespaced_with(client, namespace, &resource);

    let route = api
        .get(name)
        .await
        .change_context_lazy(|| not_found("failed to read route"))?;

    let host = ingress_host(&route.data)
        .ok_or_else(|| Report::new(not_found("route has no ingress host")))?;
    let url = format!("https://{host}");
    info!(%url, "discovered Prometheus route");
    Ok(url)
}

fn ingress_host(data: &serde_json::Value) -> Option<&str> {
    data.get("status")?
        .get("ingress")?
        .get(0)?
        .get("host")?
        .as_str()
        .filter(|host| !host.is_empty())
}
