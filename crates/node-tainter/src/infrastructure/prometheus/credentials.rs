//! Bearer token and CA bundle for the Prometheus route.

use std::path::Path;
use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use tracing::debug;

use super::error::PrometheusError;

pub const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
/// Out-of-cluster fallbacks, relative to the working directory.
pub const LOCAL_TOKEN: &str = "token";
pub const LOCAL_CA: &str = "ca.crt";

/// Where the token and CA bundle are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPaths {
    pub token: PathBuf,
    /// `None` keeps the platform trust roots.
    pub ca: Option<PathBuf>,
}

impl CredentialPaths {
    /// Explicit paths win. Otherwise the service account files are used when
    /// running in a pod, and `./token` / `./ca.crt` elsewhere. A fallback CA
    /// that does not exist is skipped.
    pub fn resolve(token: Option<PathBuf>, ca: Option<PathBuf>) -> Self {
        Self::resolve_with(token, ca, Path::new(SERVICE_ACCOUNT_TOKEN).exists(), |p| {
            p.exists()
        })
    }

    fn resolve_with(
        token: Option<PathBuf>,
        ca: Option<PathBuf>,
        in_cluster: bool,
        exists: impl Fn(&Path) -> bool,
    ) -> Self {
        let (default_token, default_ca) = if in_cluster {
            (SERVICE_ACCOUNT_TOKEN, SERVICE_ACCOUNT_CA)
        } else {
            (LOCAL_TOKEN, LOCAL_CA)
        };

        let ca = ca.or_else(|| {
            let fallback = PathBuf::from(default_ca);
            exists(&fallback).then_some(fallback)
        });

        Self {
            token: token.unwrap_or_else(|| PathBuf::from(default_token)),
            ca,
        }
    }
}

/// Loaded credential material.
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub ca_pem: Option<Vec<u8>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("ca_pem", &self.ca_pem.as_ref().map(Vec::len))
            .finish()
    }
}

impl Credentials {
    /// # Errors
    ///
    /// - [`PrometheusError::Credentials`] if a file cannot be read or the token is empty
    pub async fn load(paths: &CredentialPaths) -> Result<Self, Report<PrometheusError>> {
        debug!(token = %paths.token.display(), ca = ?paths.ca, "loading Prometheus credentials");

        let token = tokio::fs::read_to_string(&paths.token)
            .await
            .change_context_lazy(|| PrometheusError::Credentials {
                message: format!("failed to read token file {}", paths.token.display()),
            })?
            .trim()
            .to_string();
        if token.is_empty() {
            return Err(Report::new(PrometheusError::Credentials {
                message: format!("token file {} is empty", paths.token.display()),
            }));
        }

        let ca_pem = match &paths.ca {
            Some(ca) => Some(tokio::fs::read(ca).await.change_context_lazy(|| {
                PrometheusError::Credentials {
                    message: format!("failed to read CA bundle {}", ca.display()),
                }
            })?),
            None => None,
        };

        Ok(Self { token, ca_pem })
    }
}
