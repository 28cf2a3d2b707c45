pub mod app;
pub mod config;
mod domain;
mod infrastructure;

// Re-export main modules
pub use domain::reconciler;
pub use domain::taint;
pub use domain::traits;
pub use infrastructure::k8s;
pub use infrastructure::kube_client;
pub use infrastructure::logging;
pub use infrastructure::metrics;
pub use infrastructure::prometheus;
