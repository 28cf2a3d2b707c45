use std::sync::Arc;

use crate::domain::reconciler::TaintReconciler;
use crate::infrastructure::k8s::KubeNodeSource;
use crate::infrastructure::k8s::KubeTaintExecutor;
use crate::infrastructure::metrics::encoders::MetricsEncoder;
use crate::infrastructure::prometheus::PrometheusClient;

/// Reconciler backed by the live cluster.
pub type KubeReconciler = TaintReconciler<KubeNodeSource, PrometheusClient, KubeTaintExecutor>;

/// Application dependencies
pub struct ApplicationServices {
    pub reconciler: Arc<KubeReconciler>,
    pub metrics_encoder: Arc<dyn MetricsEncoder + Send + Sync>,
}
