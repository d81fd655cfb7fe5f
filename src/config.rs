use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// clap's default PathBuf parser rejects empty values at parse time; the author's
// intent (see `validate` below) is that empty paths parse and are caught there.
fn pathbuf_allow_empty(value: &str) -> Result<PathBuf, std::convert::Infallible> {
    Ok(PathBuf::from(value))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required input {0} is empty")]
    EmptyInput(&'static str),
}

#[derive(Parser, Debug)]
#[command(name = "argocd-cluster-registrar", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a cluster as an ArgoCD managed target
    Add(AddArgs),
    /// Deregister a cluster and clean up its manager identity
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Display name for the cluster; doubles as the registration secret name
    #[arg(long = "name", env = "CLUSTER_NAME")]
    pub cluster_name: String,

    /// API server URL of the target cluster
    #[arg(long = "server", env = "CLUSTER_API_SERVER")]
    pub api_server_url: String,

    /// Free-text environment tag recorded on the registration secret
    #[arg(long, env = "LABEL")]
    pub label: Option<String>,

    /// Kubeconfig granting access to the target cluster
    #[arg(long, env = "TARGET_KUBECONFIG", value_parser = pathbuf_allow_empty)]
    pub target_kubeconfig: PathBuf,

    /// Kubeconfig granting access to the ArgoCD control-plane cluster
    #[arg(long, env = "ARGOCD_KUBECONFIG", value_parser = pathbuf_allow_empty)]
    pub argocd_kubeconfig: PathBuf,

    /// Verify TLS on the control plane's connection back to the target
    #[arg(long = "tls-verify", env = "TLS_VERIFY")]
    pub tls_verify: bool,

    /// Lifetime of the issued bearer token in seconds
    #[arg(long, env = "TOKEN_TTL_SECONDS", default_value_t = 3600)]
    pub token_ttl_seconds: u64,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Name the cluster was registered under
    #[arg(long = "name", env = "CLUSTER_NAME")]
    pub cluster_name: String,

    /// Kubeconfig granting access to the target cluster
    #[arg(long, env = "TARGET_KUBECONFIG", value_parser = pathbuf_allow_empty)]
    pub target_kubeconfig: PathBuf,

    /// Kubeconfig granting access to the ArgoCD control-plane cluster
    #[arg(long, env = "ARGOCD_KUBECONFIG", value_parser = pathbuf_allow_empty)]
    pub argocd_kubeconfig: PathBuf,
}

impl AddArgs {
    // clap rejects absent flags; empty values coming through env vars are on us
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cluster_name.is_empty() {
            return Err(ConfigError::EmptyInput("cluster name"));
        }
        if self.api_server_url.is_empty() {
            return Err(ConfigError::EmptyInput("api server url"));
        }
        if self.target_kubeconfig.as_os_str().is_empty() {
            return Err(ConfigError::EmptyInput("target kubeconfig"));
        }
        if self.argocd_kubeconfig.as_os_str().is_empty() {
            return Err(ConfigError::EmptyInput("argocd kubeconfig"));
        }
        Ok(())
    }

    /// Environment tag, with empty values treated as unset
    pub fn environment(&self) -> Option<String> {
        self.label.clone().filter(|label| !label.is_empty())
    }
}

impl RemoveArgs {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cluster_name.is_empty() {
            return Err(ConfigError::EmptyInput("cluster name"));
        }
        if self.target_kubeconfig.as_os_str().is_empty() {
            return Err(ConfigError::EmptyInput("target kubeconfig"));
        }
        if self.argocd_kubeconfig.as_os_str().is_empty() {
            return Err(ConfigError::EmptyInput("argocd kubeconfig"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn add_parses_with_all_inputs() {
        let cli = parse(&[
            "argocd-cluster-registrar",
            "add",
            "--name",
            "prod-east",
            "--server",
            "https://10.0.0.5:6443",
            "--label",
            "prod",
            "--target-kubeconfig",
            "/tmp/target.yaml",
            "--argocd-kubeconfig",
            "/tmp/argocd.yaml",
        ])
        .unwrap();

        match cli.command {
            Command::Add(args) => {
                assert_eq!(args.cluster_name, "prod-east");
                assert_eq!(args.api_server_url, "https://10.0.0.5:6443");
                assert_eq!(args.environment(), Some("prod".to_string()));
                assert!(!args.tls_verify);
                assert_eq!(args.token_ttl_seconds, 3600);
                assert!(args.validate().is_ok());
            }
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn add_rejects_missing_server() {
        let result = parse(&[
            "argocd-cluster-registrar",
            "add",
            "--name",
            "prod-east",
            "--target-kubeconfig",
            "/tmp/target.yaml",
            "--argocd-kubeconfig",
            "/tmp/argocd.yaml",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn unknown_verb_is_a_usage_error() {
        assert!(parse(&["argocd-cluster-registrar", "sync"]).is_err());
        assert!(parse(&["argocd-cluster-registrar"]).is_err());
    }

    #[test]
    fn empty_name_fails_validation() {
        let cli = parse(&[
            "argocd-cluster-registrar",
            "add",
            "--name",
            "",
            "--server",
            "https://10.0.0.5:6443",
            "--target-kubeconfig",
            "/tmp/target.yaml",
            "--argocd-kubeconfig",
            "/tmp/argocd.yaml",
        ])
        .unwrap();

        match cli.command {
            Command::Add(args) => {
                let error = args.validate().unwrap_err();
                assert_eq!(error.to_string(), "required input cluster name is empty");
            }
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn empty_kubeconfig_path_fails_validation() {
        let cli = parse(&[
            "argocd-cluster-registrar",
            "remove",
            "--name",
            "prod-east",
            "--target-kubeconfig",
            "",
            "--argocd-kubeconfig",
            "/tmp/argocd.yaml",
        ])
        .unwrap();

        match cli.command {
            Command::Remove(args) => {
                assert!(matches!(
                    args.validate(),
                    Err(ConfigError::EmptyInput("target kubeconfig"))
                ));
            }
            other => panic!("expected remove, got {other:?}"),
        }
    }

    #[test]
    fn empty_label_is_treated_as_unset() {
        let cli = parse(&[
            "argocd-cluster-registrar",
            "add",
            "--name",
            "prod-east",
            "--server",
            "https://10.0.0.5:6443",
            "--label",
            "",
            "--target-kubeconfig",
            "/tmp/target.yaml",
            "--argocd-kubeconfig",
            "/tmp/argocd.yaml",
        ])
        .unwrap();

        match cli.command {
            Command::Add(args) => assert_eq!(args.environment(), None),
            other => panic!("expected add, got {other:?}"),
        }
    }
}
