use std::time::Duration;

use argocd_cluster_registrar::config::{AddArgs, Cli, Command, RemoveArgs};
use argocd_cluster_registrar::endpoint::{ClusterEndpoint, KubeCluster};
use argocd_cluster_registrar::registrar::workflow::{
    self, AddRequest, DEFAULT_READINESS_INTERVAL, DEFAULT_READINESS_TIMEOUT,
};
use argocd_cluster_registrar::{telemetry, Result};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Add(args) => add(args).await?,
        Command::Remove(args) => remove(args).await?,
    }

    Ok(())
}

async fn add(args: AddArgs) -> Result<()> {
    // Reject bad input before any remote call is made
    args.validate()?;

    let target = KubeCluster::connect(ClusterEndpoint::Target, &args.target_kubeconfig).await?;
    let control_plane =
        KubeCluster::connect(ClusterEndpoint::ControlPlane, &args.argocd_kubeconfig).await?;

    let request = AddRequest {
        name: args.cluster_name.clone(),
        api_server_url: args.api_server_url.clone(),
        environment: args.environment(),
        insecure_skip_tls_verify: !args.tls_verify,
        token_ttl: Duration::from_secs(args.token_ttl_seconds),
        readiness_timeout: DEFAULT_READINESS_TIMEOUT,
        readiness_interval: DEFAULT_READINESS_INTERVAL,
    };

    workflow::add(&target, &control_plane, request).await?;
    Ok(())
}

async fn remove(args: RemoveArgs) -> Result<()> {
    args.validate()?;

    let target = KubeCluster::connect(ClusterEndpoint::Target, &args.target_kubeconfig).await?;
    let control_plane =
        KubeCluster::connect(ClusterEndpoint::ControlPlane, &args.argocd_kubeconfig).await?;

    workflow::remove(&target, &control_plane, &args.cluster_name).await?;
    Ok(())
}
