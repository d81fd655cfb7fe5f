use std::fmt::{self, Display};
use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::{Client, Config};
use thiserror::Error;
use tracing::info;

pub type EndpointResult<T> = std::result::Result<T, EndpointError>;

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("kubeconfig load error: {0}")]
    Kubeconfig(#[from] KubeconfigError),

    #[error("client build error: {0}")]
    ClientBuild(#[from] kube::Error),
}

/// Role of a cluster endpoint in the registration workflow
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterEndpoint {
    Target,
    ControlPlane,
}

impl Display for ClusterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterEndpoint::Target => f.write_str("target"),
            ClusterEndpoint::ControlPlane => f.write_str("control-plane"),
        }
    }
}

/// A cluster API endpoint with its own credentials.
///
/// Every remote operation goes through one of these values, so the cluster
/// being talked to is always explicit in the call site and the logs.
#[derive(Clone)]
pub struct KubeCluster {
    endpoint: ClusterEndpoint,
    client: Client,
}

impl KubeCluster {
    /// Build a client for `endpoint` from the kubeconfig at `path`
    pub async fn connect(endpoint: ClusterEndpoint, path: &Path) -> EndpointResult<Self> {
        let kubeconfig = Kubeconfig::read_from(path)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        let client = Client::try_from(config)?;

        info!(%endpoint, kubeconfig = %path.display(), "connected cluster endpoint");
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> ClusterEndpoint {
        self.endpoint
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn connect_fails_for_missing_kubeconfig() {
        let result =
            KubeCluster::connect(ClusterEndpoint::Target, Path::new("/nonexistent/kubeconfig"))
                .await;

        assert!(matches!(result, Err(EndpointError::Kubeconfig(_))));
    }

    #[tokio::test]
    async fn connect_fails_for_malformed_kubeconfig() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not: [valid: kubeconfig").unwrap();

        let result = KubeCluster::connect(ClusterEndpoint::ControlPlane, file.path()).await;

        assert!(matches!(result, Err(EndpointError::Kubeconfig(_))));
    }

    #[test]
    fn endpoint_names_for_audit_logs() {
        assert_eq!(ClusterEndpoint::Target.to_string(), "target");
        assert_eq!(ClusterEndpoint::ControlPlane.to_string(), "control-plane");
    }
}
