use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::api::registration::ClusterRegistration;
use crate::telemetry;

use super::ops::{ControlPlaneOps, Removal, TargetClusterOps};
use super::{AddResult, CleanupError, RemoveResult, TokenError};

pub static DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(30);
pub static DEFAULT_READINESS_INTERVAL: Duration = Duration::from_secs(1);

/// Parameters for one registration
pub struct AddRequest {
    pub name: String,
    pub api_server_url: String,
    pub environment: Option<String>,
    pub insecure_skip_tls_verify: bool,
    pub token_ttl: Duration,
    pub readiness_timeout: Duration,
    pub readiness_interval: Duration,
}

/// Identity objects already applied on the target cluster, tracked so a
/// failed registration can be unwound in reverse order.
#[derive(Clone, Copy, Debug)]
enum Provisioned {
    ManagerAccount,
    AdminBinding,
}

/// Register a cluster: provision the manager identity on the target,
/// exchange it for a bearer token, publish the registration secret on the
/// control plane. Any failure unwinds the identity objects applied so far
/// before surfacing.
#[instrument(skip_all, fields(trace_id = display(telemetry::get_trace_id()), cluster = %request.name))]
pub async fn add<T, C>(target: &T, control_plane: &C, request: AddRequest) -> AddResult<()>
where
    T: TargetClusterOps,
    C: ControlPlaneOps,
{
    info!(cluster = %request.name, "registering cluster");

    let mut provisioned = Vec::new();
    let result = run_add(target, control_plane, &request, &mut provisioned).await;
    if result.is_err() {
        unwind(target, provisioned).await;
    }

    result
}

async fn run_add<T, C>(
    target: &T,
    control_plane: &C,
    request: &AddRequest,
    provisioned: &mut Vec<Provisioned>,
) -> AddResult<()>
where
    T: TargetClusterOps,
    C: ControlPlaneOps,
{
    target.apply_manager_account().await?;
    provisioned.push(Provisioned::ManagerAccount);

    target.apply_admin_binding().await?;
    provisioned.push(Provisioned::AdminBinding);

    wait_for_identity(target, request.readiness_timeout, request.readiness_interval).await?;

    let bearer_token = target.request_token(request.token_ttl).await?;

    let registration = ClusterRegistration {
        name: request.name.clone(),
        api_server_url: request.api_server_url.clone(),
        environment: request.environment.clone(),
        bearer_token,
        insecure_skip_tls_verify: request.insecure_skip_tls_verify,
    };
    control_plane.publish_registration(&registration).await?;

    info!(cluster = %request.name, "cluster registered, run `argocd cluster list` to confirm");
    Ok(())
}

/// Identity propagation on the target cluster is asynchronous, poll until
/// the account is queryable instead of guessing a settle time.
async fn wait_for_identity<T>(target: &T, timeout: Duration, interval: Duration) -> AddResult<()>
where
    T: TargetClusterOps,
{
    let start = Instant::now();
    loop {
        if target.manager_account_exists().await? {
            info!(elapsed = ?start.elapsed(), "manager account is visible");
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(TokenError::NotReady { timeout }.into());
        }
        sleep(interval).await;
    }
}

async fn unwind<T>(target: &T, provisioned: Vec<Provisioned>)
where
    T: TargetClusterOps,
{
    warn!("registration failed, rolling back provisioned identity objects");
    for step in provisioned.into_iter().rev() {
        let result = match step {
            Provisioned::AdminBinding => target.delete_admin_binding().await,
            Provisioned::ManagerAccount => target.delete_manager_account().await,
        };
        match result {
            Ok(_) => info!(?step, "rolled back"),
            Err(error) => warn!(%error, ?step, "rollback failed, object may need manual cleanup"),
        }
    }
}

/// Deregister a cluster. Deletions are converging: absence of any object is
/// logged and tolerated. After the deletes, both clusters are re-queried and
/// anything still present is reported as an error.
#[instrument(skip_all, fields(trace_id = display(telemetry::get_trace_id()), cluster = %name))]
pub async fn remove<T, C>(target: &T, control_plane: &C, name: &str) -> RemoveResult<()>
where
    T: TargetClusterOps,
    C: ControlPlaneOps,
{
    info!(cluster = %name, "removing cluster registration");

    match control_plane.delete_registration(name).await? {
        Removal::Deleted => info!(cluster = %name, "deleted registration secret"),
        Removal::NotFound => warn!(cluster = %name, "registration secret not found, continuing"),
    }

    match target.delete_manager_account().await? {
        Removal::Deleted => info!("deleted manager service account"),
        Removal::NotFound => warn!("manager service account not found, continuing"),
    }

    match target.delete_admin_binding().await? {
        Removal::Deleted => info!("deleted admin role binding"),
        Removal::NotFound => warn!("admin role binding not found, continuing"),
    }

    let mut lingering: Vec<&str> = target.identity_lingering().await?;
    if control_plane.registration_exists(name).await? {
        lingering.push("registration secret");
    }
    if !lingering.is_empty() {
        return Err(CleanupError::Lingering(lingering.join(", ")).into());
    }

    info!(cluster = %name, "cluster removed, run `argocd cluster list` to confirm");
    Ok(())
}
