//! Application module
//!
//! Wiring of the Kubernetes and Prometheus adapters into a reconciler and
//! the lifecycle of the daemon task.

pub mod builder;
pub mod core;
pub mod services;
pub mod tasks;

pub use builder::build_reconciler;
pub use builder::ApplicationBuilder;
pub use self::core::Application;
pub use services::ApplicationServices;
pub use services::KubeReconciler;
