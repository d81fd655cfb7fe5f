use std::fmt::Debug;
use std::time::Duration;

use k8s_openapi::api::authentication::v1::{TokenRequest, TokenRequestSpec};
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::ClusterRoleBinding;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::api::identity::{
    self, ManagerAccount, ManagerBinding, MANAGER_ACCOUNT_NAME, MANAGER_ACCOUNT_NAMESPACE,
    MANAGER_BINDING_NAME,
};
use crate::api::registration::{
    BearerToken, ClusterRegistration, RegistrationSecret, REGISTRATION_NAMESPACE,
};
use crate::endpoint::KubeCluster;

use super::{
    CleanupError, CleanupResult, ProvisionError, ProvisionResult, PublishError, PublishResult,
    TokenError, TokenResult,
};

pub static FIELD_MANAGER: &str = "argocd-cluster-registrar";

/// Outcome of a converging delete
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    NotFound,
}

/// Remote operations performed against the cluster being registered
pub trait TargetClusterOps {
    async fn apply_manager_account(&self) -> ProvisionResult<()>;
    async fn apply_admin_binding(&self) -> ProvisionResult<()>;
    async fn manager_account_exists(&self) -> ProvisionResult<bool>;
    async fn request_token(&self, ttl: Duration) -> TokenResult<BearerToken>;
    async fn delete_manager_account(&self) -> CleanupResult<Removal>;
    async fn delete_admin_binding(&self) -> CleanupResult<Removal>;
    async fn identity_lingering(&self) -> CleanupResult<Vec<&'static str>>;
}

/// Remote operations performed against the ArgoCD control-plane cluster
pub trait ControlPlaneOps {
    async fn publish_registration(&self, registration: &ClusterRegistration) -> PublishResult<()>;
    async fn delete_registration(&self, name: &str) -> CleanupResult<Removal>;
    async fn registration_exists(&self, name: &str) -> CleanupResult<bool>;
}

impl TargetClusterOps for KubeCluster {
    async fn apply_manager_account(&self) -> ProvisionResult<()> {
        let api: Api<ManagerAccount> =
            Api::namespaced(self.client(), MANAGER_ACCOUNT_NAMESPACE);

        api.patch(
            MANAGER_ACCOUNT_NAME,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&identity::manager_account()),
        )
        .await
        .map_err(ProvisionError::AccountApply)?;

        info!(endpoint = %self.endpoint(), account = MANAGER_ACCOUNT_NAME, "applied manager service account");
        Ok(())
    }

    async fn apply_admin_binding(&self) -> ProvisionResult<()> {
        let api: Api<ManagerBinding> = Api::all(self.client());

        api.patch(
            MANAGER_BINDING_NAME,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&identity::manager_binding()),
        )
        .await
        .map_err(ProvisionError::BindingApply)?;

        info!(endpoint = %self.endpoint(), binding = MANAGER_BINDING_NAME, "applied admin role binding");
        Ok(())
    }

    async fn manager_account_exists(&self) -> ProvisionResult<bool> {
        let api: Api<ServiceAccount> =
            Api::namespaced(self.client(), MANAGER_ACCOUNT_NAMESPACE);

        let account = api
            .get_metadata_opt(MANAGER_ACCOUNT_NAME)
            .await
            .map_err(ProvisionError::Lookup)?;

        Ok(account.is_some())
    }

    async fn request_token(&self, ttl: Duration) -> TokenResult<BearerToken> {
        let api: Api<ServiceAccount> =
            Api::namespaced(self.client(), MANAGER_ACCOUNT_NAMESPACE);

        let request = TokenRequest {
            spec: TokenRequestSpec {
                expiration_seconds: Some(ttl.as_secs() as i64),
                ..Default::default()
            },
            ..Default::default()
        };

        let response: TokenRequest = api
            .create_subresource(
                "token",
                MANAGER_ACCOUNT_NAME,
                &PostParams::default(),
                serde_json::to_vec(&request)?,
            )
            .await
            .map_err(TokenError::Request)?;

        let token = response
            .status
            .map(|status| status.token)
            .filter(|token| !token.is_empty())
            .ok_or(TokenError::MissingToken)?;

        info!(endpoint = %self.endpoint(), account = MANAGER_ACCOUNT_NAME, "issued bearer token");
        Ok(BearerToken::new(token))
    }

    async fn delete_manager_account(&self) -> CleanupResult<Removal> {
        let api: Api<ServiceAccount> =
            Api::namespaced(self.client(), MANAGER_ACCOUNT_NAMESPACE);
        delete_converging(&api, MANAGER_ACCOUNT_NAME).await
    }

    async fn delete_admin_binding(&self) -> CleanupResult<Removal> {
        let api: Api<ClusterRoleBinding> = Api::all(self.client());
        delete_converging(&api, MANAGER_BINDING_NAME).await
    }

    async fn identity_lingering(&self) -> CleanupResult<Vec<&'static str>> {
        let mut lingering = Vec::new();

        let accounts: Api<ServiceAccount> =
            Api::namespaced(self.client(), MANAGER_ACCOUNT_NAMESPACE);
        if accounts
            .get_metadata_opt(MANAGER_ACCOUNT_NAME)
            .await
            .map_err(CleanupError::Verify)?
            .is_some()
        {
            lingering.push(MANAGER_ACCOUNT_NAME);
        }

        let bindings: Api<ClusterRoleBinding> = Api::all(self.client());
        if bindings
            .get_metadata_opt(MANAGER_BINDING_NAME)
            .await
            .map_err(CleanupError::Verify)?
            .is_some()
        {
            lingering.push(MANAGER_BINDING_NAME);
        }

        Ok(lingering)
    }
}

impl ControlPlaneOps for KubeCluster {
    async fn publish_registration(&self, registration: &ClusterRegistration) -> PublishResult<()> {
        let api: Api<RegistrationSecret> =
            Api::namespaced(self.client(), REGISTRATION_NAMESPACE);

        // Apply overwrites an existing registration under the same name,
        // which is also the credential rotation path.
        api.patch(
            &registration.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&RegistrationSecret::from(registration)),
        )
        .await
        .map_err(PublishError::Apply)?;

        info!(endpoint = %self.endpoint(), cluster = %registration.name, "published registration secret");
        Ok(())
    }

    async fn delete_registration(&self, name: &str) -> CleanupResult<Removal> {
        let api: Api<Secret> = Api::namespaced(self.client(), REGISTRATION_NAMESPACE);
        delete_converging(&api, name).await
    }

    async fn registration_exists(&self, name: &str) -> CleanupResult<bool> {
        let api: Api<Secret> = Api::namespaced(self.client(), REGISTRATION_NAMESPACE);

        let secret = api
            .get_metadata_opt(name)
            .await
            .map_err(CleanupError::Verify)?;

        Ok(secret.is_some())
    }
}

async fn delete_converging<K>(api: &Api<K>, name: &str) -> CleanupResult<Removal>
where
    K: Clone + DeserializeOwned + Debug,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(Removal::Deleted),
        Err(kube::Error::Api(response)) if response.code == 404 => Ok(Removal::NotFound),
        Err(error) => Err(CleanupError::Delete(error)),
    }
}
