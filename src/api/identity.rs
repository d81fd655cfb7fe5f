use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleRef, Subject};
use kube::api::{ObjectMeta, TypeMeta};
use kube::Resource;
use serde::{Deserialize, Serialize};

pub static MANAGER_ACCOUNT_NAME: &str = "argocd-manager";
pub static MANAGER_ACCOUNT_NAMESPACE: &str = "kube-system";
pub static MANAGER_BINDING_NAME: &str = "argocd-manager-rolebinding";
pub static MANAGER_CLUSTER_ROLE: &str = "cluster-admin";

/// Service account the control plane authenticates as on the target cluster
#[derive(Resource, Serialize, Deserialize, Clone, Debug, Default)]
#[resource(inherit = ServiceAccount)]
pub struct ManagerAccount {
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    pub metadata: ObjectMeta,
}

/// Cluster-scoped binding granting the manager account admin privileges
#[derive(Resource, Serialize, Deserialize, Clone, Debug, Default)]
#[resource(inherit = ClusterRoleBinding)]
#[serde(rename_all = "camelCase")]
pub struct ManagerBinding {
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    pub metadata: ObjectMeta,
    pub role_ref: RoleRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<Subject>>,
}

pub fn manager_account() -> ManagerAccount {
    ManagerAccount {
        types: Some(TypeMeta::resource::<ManagerAccount>()),
        metadata: ObjectMeta {
            name: Some(MANAGER_ACCOUNT_NAME.to_string()),
            namespace: Some(MANAGER_ACCOUNT_NAMESPACE.to_string()),
            ..Default::default()
        },
    }
}

pub fn manager_binding() -> ManagerBinding {
    ManagerBinding {
        types: Some(TypeMeta::resource::<ManagerBinding>()),
        metadata: ObjectMeta {
            name: Some(MANAGER_BINDING_NAME.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: MANAGER_CLUSTER_ROLE.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: MANAGER_ACCOUNT_NAME.to_string(),
            namespace: Some(MANAGER_ACCOUNT_NAMESPACE.to_string()),
            ..Default::default()
        }]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_account_manifest() {
        let account = manager_account();
        let value = serde_json::to_value(&account).unwrap();

        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "ServiceAccount");
        assert_eq!(value["metadata"]["name"], "argocd-manager");
        assert_eq!(value["metadata"]["namespace"], "kube-system");
    }

    #[test]
    fn manager_binding_grants_cluster_admin_to_the_account() {
        let binding = manager_binding();
        let value = serde_json::to_value(&binding).unwrap();

        assert_eq!(value["apiVersion"], "rbac.authorization.k8s.io/v1");
        assert_eq!(value["kind"], "ClusterRoleBinding");
        assert_eq!(value["metadata"]["name"], "argocd-manager-rolebinding");
        assert!(value["metadata"].get("namespace").is_none());
        assert_eq!(value["roleRef"]["kind"], "ClusterRole");
        assert_eq!(value["roleRef"]["name"], "cluster-admin");

        let subject = &value["subjects"][0];
        assert_eq!(subject["kind"], "ServiceAccount");
        assert_eq!(subject["name"], "argocd-manager");
        assert_eq!(subject["namespace"], "kube-system");
    }
}
