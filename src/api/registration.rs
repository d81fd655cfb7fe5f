use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use k8s_openapi::api::core::v1::Secret;
use kube::api::{ObjectMeta, TypeMeta};
use kube::Resource;
use serde::{ser, Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

pub static REGISTRATION_NAMESPACE: &str = "argocd";
pub static SECRET_TYPE_LABEL: &str = "argocd.argoproj.io/secret-type";
pub static SECRET_TYPE_CLUSTER: &str = "cluster";
pub static ENVIRONMENT_LABEL: &str = "environment";

/// Opaque bearer credential. Redacted in debug output so it never leaks
/// through logs; the raw value is only reachable via [`BearerToken::expose`].
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

impl From<String> for BearerToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// One managed cluster registration
#[derive(Clone, Debug)]
pub struct ClusterRegistration {
    /// Unique name; doubles as the secret name on the control plane
    pub name: String,
    pub api_server_url: String,
    pub environment: Option<String>,
    pub bearer_token: BearerToken,
    pub insecure_skip_tls_verify: bool,
}

/// The cluster-credential secret ArgoCD picks up from its namespace
#[derive(Resource, Serialize, Deserialize, Clone, Debug, Default)]
#[resource(inherit = Secret)]
pub struct RegistrationSecret {
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    pub metadata: ObjectMeta,
    #[serde(rename = "stringData", default)]
    pub string_data: RegistrationData,
    #[serde(rename = "type", default)]
    pub secret_type: String,
}

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RegistrationData {
    pub name: String,
    pub server: String,
    #[serde_as(as = "DisplayFromStr")]
    pub config: ClusterConfig,
}

/// Credential document embedded in the secret as a JSON string
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub bearer_token: BearerToken,
    pub tls_client_config: TlsClientConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TlsClientConfig {
    pub insecure: bool,
}

impl FromStr for ClusterConfig {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl Display for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serde_json::to_string(self).map_err(ser::Error::custom)?)
    }
}

impl From<&ClusterRegistration> for RegistrationSecret {
    fn from(registration: &ClusterRegistration) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(SECRET_TYPE_LABEL.to_string(), SECRET_TYPE_CLUSTER.to_string());
        if let Some(environment) = &registration.environment {
            labels.insert(ENVIRONMENT_LABEL.to_string(), environment.clone());
        }

        Self {
            types: Some(TypeMeta::resource::<RegistrationSecret>()),
            metadata: ObjectMeta {
                name: Some(registration.name.clone()),
                namespace: Some(REGISTRATION_NAMESPACE.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            string_data: RegistrationData {
                name: registration.name.clone(),
                server: registration.api_server_url.clone(),
                config: ClusterConfig {
                    bearer_token: registration.bearer_token.clone(),
                    tls_client_config: TlsClientConfig {
                        insecure: registration.insecure_skip_tls_verify,
                    },
                },
            },
            secret_type: "Opaque".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> ClusterRegistration {
        ClusterRegistration {
            name: "prod-east".to_string(),
            api_server_url: "https://10.0.0.5:6443".to_string(),
            environment: Some("prod".to_string()),
            bearer_token: BearerToken::new("sa-token"),
            insecure_skip_tls_verify: true,
        }
    }

    #[test]
    fn secret_carries_recognition_labels_and_namespace() {
        let secret = RegistrationSecret::from(&registration());

        assert_eq!(secret.metadata.name.as_deref(), Some("prod-east"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("argocd"));
        assert_eq!(secret.secret_type, "Opaque");

        let labels = secret.metadata.labels.unwrap();
        assert_eq!(
            labels.get("argocd.argoproj.io/secret-type").map(String::as_str),
            Some("cluster")
        );
        assert_eq!(labels.get("environment").map(String::as_str), Some("prod"));
    }

    #[test]
    fn environment_label_is_omitted_without_a_tag() {
        let secret = RegistrationSecret::from(&ClusterRegistration {
            environment: None,
            ..registration()
        });

        let labels = secret.metadata.labels.unwrap();
        assert!(!labels.contains_key("environment"));
    }

    #[test]
    fn server_field_is_carried_byte_for_byte() {
        let secret = RegistrationSecret::from(&registration());
        assert_eq!(secret.string_data.server, "https://10.0.0.5:6443");
    }

    #[test]
    fn config_payload_is_an_embedded_json_document() {
        let secret = RegistrationSecret::from(&registration());
        let value = serde_json::to_value(&secret).unwrap();

        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "Secret");
        assert_eq!(value["stringData"]["name"], "prod-east");
        assert_eq!(value["stringData"]["server"], "https://10.0.0.5:6443");

        // stringData.config is a JSON document carried as a plain string
        let config = value["stringData"]["config"].as_str().unwrap();
        let config: ClusterConfig = config.parse().unwrap();
        assert_eq!(config.bearer_token.expose(), "sa-token");
        assert!(config.tls_client_config.insecure);
    }

    #[test]
    fn tls_verification_can_be_turned_on() {
        let secret = RegistrationSecret::from(&ClusterRegistration {
            insecure_skip_tls_verify: false,
            ..registration()
        });

        assert!(!secret.string_data.config.tls_client_config.insecure);
    }

    #[test]
    fn cluster_config_wire_format() {
        let config: ClusterConfig = r#"{
            "bearerToken": "abc123",
            "tlsClientConfig": { "insecure": true }
        }"#
        .parse()
        .unwrap();

        assert_eq!(config.bearer_token.expose(), "abc123");

        let rendered = config.to_string();
        assert!(rendered.contains(r#""bearerToken":"abc123""#));
        assert!(rendered.contains(r#""insecure":true"#));
    }

    #[test]
    fn bearer_token_debug_output_is_redacted() {
        let token = BearerToken::new("very-secret");
        let debug = format!("{token:?}");

        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("redacted"));
    }
}
