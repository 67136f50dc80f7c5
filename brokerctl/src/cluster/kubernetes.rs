//! Kubernetes implementation of the broker cluster collaborators

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{ConfigMap, Container, Namespace, PodSpec, PodTemplateSpec, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::rbac::{self, CLIENT_ROLE, CLIENT_SERVICE_ACCOUNT, CLIENT_TOKEN_SECRET};
use super::{BrokerCluster, ConnectionResolver};
use crate::deploy::request::BrokerSpec;
use crate::deploy::validate::parse_global_cidr;
use crate::descriptor::{ClientToken, SecretValue};
use crate::errors::ClusterError;
use crate::utils::Backoff;

/// Field manager used for server-side apply
const FIELD_MANAGER: &str = "brokerctl";

/// Name of the operator deployment and its service account
const OPERATOR_NAME: &str = "submariner-operator";

/// Name of the broker custom resource
const BROKER_NAME: &str = "submariner-broker";

/// ConfigMap holding the globalnet addressing configuration
pub const GLOBALNET_CONFIGMAP: &str = "submariner-globalnet-info";

/// Recorded per-cluster global CIDR allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GlobalNetwork {
    #[serde(rename = "clusterID")]
    cluster_id: String,

    #[serde(rename = "globalCidr", default)]
    global_cidr: Vec<String>,
}

/// Resolves a cluster connection from a kubeconfig
#[derive(Debug, Clone, Default)]
pub struct KubeconfigResolver {
    /// Explicit kubeconfig path, otherwise inferred from the environment
    pub kubeconfig: Option<PathBuf>,

    /// Context to use instead of the current one
    pub context: Option<String>,
}

impl KubeconfigResolver {
    pub fn new(kubeconfig: Option<PathBuf>, context: Option<String>) -> Self {
        Self { kubeconfig, context }
    }
}

#[async_trait]
impl ConnectionResolver for KubeconfigResolver {
    async fn connect(&self) -> Result<Arc<dyn BrokerCluster>, ClusterError> {
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };

        let config = match (&self.kubeconfig, &self.context) {
            (Some(path), _) => {
                debug!("Loading kubeconfig from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options).await?,
            (None, None) => Config::infer().await?,
        };

        let server_url = config.cluster_url.to_string().trim_end_matches('/').to_string();
        let client = Client::try_from(config)?;
        info!(server = %server_url, "connected to broker cluster");

        Ok(Arc::new(KubeCluster::new(client, server_url)))
    }
}

/// Broker cluster backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    server_url: String,
}

impl KubeCluster {
    pub fn new(client: Client, server_url: String) -> Self {
        Self { client, server_url }
    }

    async fn ensure_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(managed_labels()),
                ..Default::default()
            },
            ..Default::default()
        };
        apply(&api, name, &ns).await
    }

    async fn ensure_service_account(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        let sa = ServiceAccount {
            metadata: object_meta(name, namespace),
            ..Default::default()
        };
        apply(&api, name, &sa).await
    }
}

fn broker_resource() -> ApiResource {
    ApiResource {
        group: "submariner.io".to_string(),
        version: "v1alpha1".to_string(),
        api_version: "submariner.io/v1alpha1".to_string(),
        kind: "Broker".to_string(),
        plural: "brokers".to_string(),
    }
}

fn managed_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "app.kubernetes.io/managed-by".to_string(),
        FIELD_MANAGER.to_string(),
    )])
}

fn object_meta(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(managed_labels()),
        ..Default::default()
    }
}

/// Operator deployment, with verbose logging when `operator_debug` is set
fn operator_deployment(namespace: &str, image: &str, operator_debug: bool) -> Deployment {
    let labels = BTreeMap::from([("name".to_string(), OPERATOR_NAME.to_string())]);
    let args = if operator_debug { vec!["-v=3".to_string()] } else { Vec::new() };
    Deployment {
        metadata: object_meta(OPERATOR_NAME, namespace),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(OPERATOR_NAME.to_string()),
                    containers: vec![Container {
                        name: OPERATOR_NAME.to_string(),
                        image: Some(image.to_string()),
                        image_pull_policy: Some("IfNotPresent".to_string()),
                        args: Some(args),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Server-side apply, which creates or updates in one idempotent call
async fn apply<K>(api: &Api<K>, name: &str, obj: &K) -> Result<(), ClusterError>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    api.patch(name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(obj))
        .await?;
    debug!(name = %name, "applied object");
    Ok(())
}

async fn get_opt<K>(api: &Api<K>, name: &str) -> Result<Option<K>, ClusterError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    match api.get(name).await {
        Ok(obj) => Ok(Some(obj)),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl BrokerCluster for KubeCluster {
    fn server_url(&self) -> String {
        self.server_url.clone()
    }

    async fn ensure_rbac(
        &self,
        components: &BTreeSet<String>,
        allow_disable: bool,
        namespace: &str,
    ) -> Result<(), ClusterError> {
        self.ensure_namespace(namespace).await?;
        self.ensure_service_account(namespace, CLIENT_SERVICE_ACCOUNT).await?;

        let roles: Api<Role> = Api::namespaced(self.client.clone(), namespace);
        let mut rules = rbac::client_role_rules(components);
        if !allow_disable {
            if let Some(existing) = get_opt(&roles, CLIENT_ROLE).await? {
                rules = rbac::merge_rules(&existing.rules.unwrap_or_default(), rules);
            }
        }
        let role = Role {
            metadata: object_meta(CLIENT_ROLE, namespace),
            rules: Some(rules),
        };
        apply(&roles, CLIENT_ROLE, &role).await?;

        let bindings: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        let binding = RoleBinding {
            metadata: object_meta(CLIENT_ROLE, namespace),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "Role".to_string(),
                name: CLIENT_ROLE.to_string(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: CLIENT_SERVICE_ACCOUNT.to_string(),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            }]),
        };
        apply(&bindings, CLIENT_ROLE, &binding).await?;

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let mut meta = object_meta(CLIENT_TOKEN_SECRET, namespace);
        meta.annotations = Some(BTreeMap::from([(
            "kubernetes.io/service-account.name".to_string(),
            CLIENT_SERVICE_ACCOUNT.to_string(),
        )]));
        let secret = Secret {
            metadata: meta,
            type_: Some("kubernetes.io/service-account-token".to_string()),
            ..Default::default()
        };
        apply(&secrets, CLIENT_TOKEN_SECRET, &secret).await?;

        info!(namespace = %namespace, components = ?components, "broker RBAC in place");
        Ok(())
    }

    async fn ensure_operator(&self, namespace: &str, image: &str, operator_debug: bool) -> Result<(), ClusterError> {
        self.ensure_namespace(namespace).await?;
        self.ensure_service_account(namespace, OPERATOR_NAME).await?;

        let deployment = operator_deployment(namespace, image, operator_debug);
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        apply(&api, OPERATOR_NAME, &deployment).await?;
        info!(namespace = %namespace, image = %image, operator_debug = operator_debug, "operator deployment applied");
        Ok(())
    }

    async fn ensure_broker_resource(&self, namespace: &str, spec: &BrokerSpec) -> Result<(), ClusterError> {
        let ar = broker_resource();
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        let broker = DynamicObject::new(BROKER_NAME, &ar)
            .within(namespace)
            .data(serde_json::json!({ "spec": serde_json::to_value(spec)? }));

        api.patch(BROKER_NAME, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&broker))
            .await?;
        info!(namespace = %namespace, "broker resource applied");
        Ok(())
    }

    async fn validate_no_existing_addressing_config(&self, namespace: &str) -> Result<(), ClusterError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let Some(existing) = get_opt(&api, GLOBALNET_CONFIGMAP).await? else {
            return Ok(());
        };
        let data = existing.data.unwrap_or_default();

        if data.get("globalnetEnabled").map(String::as_str) != Some("true") {
            return Err(ClusterError::Conflict(
                "globalnet was not enabled when the broker was first deployed".to_string(),
            ));
        }

        if let Some(range) = data.get("globalnetCidrRange") {
            parse_global_cidr(range).map_err(|e| ClusterError::Conflict(e.to_string()))?;
        }

        let networks: Vec<GlobalNetwork> = match data.get("clusterInfo") {
            Some(info) if !info.trim().is_empty() => serde_json::from_str(info)?,
            _ => Vec::new(),
        };
        for network in &networks {
            for cidr in &network.global_cidr {
                parse_global_cidr(cidr).map_err(|e| {
                    ClusterError::Conflict(format!("cluster {}: {}", network.cluster_id, e))
                })?;
            }
        }

        debug!(clusters = networks.len(), "existing globalnet configuration is valid");
        Ok(())
    }

    async fn create_addressing_config(
        &self,
        enabled: bool,
        cidr: &str,
        cluster_size: u32,
        namespace: &str,
    ) -> Result<(), ClusterError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let config_map = ConfigMap {
            metadata: object_meta(GLOBALNET_CONFIGMAP, namespace),
            data: Some(BTreeMap::from([
                ("globalnetEnabled".to_string(), enabled.to_string()),
                ("globalnetCidrRange".to_string(), cidr.to_string()),
                ("globalnetClusterSize".to_string(), cluster_size.to_string()),
                ("clusterInfo".to_string(), "[]".to_string()),
            ])),
            ..Default::default()
        };

        // Cluster allocations are recorded in this map later, never overwrite it
        match api.create(&PostParams::default(), &config_map).await {
            Ok(_) => {
                info!(namespace = %namespace, enabled = enabled, "globalnet configmap created");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                debug!(namespace = %namespace, "globalnet configmap already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn broker_client_token(&self, namespace: &str) -> Result<ClientToken, ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let backoff = Backoff::default();

        // The token controller fills the secret in asynchronously
        for attempt in 0..backoff.attempts {
            if let Some(secret) = get_opt(&api, CLIENT_TOKEN_SECRET).await? {
                let data = secret.data.unwrap_or_default();
                if let (Some(token), Some(ca)) = (data.get("token"), data.get("ca.crt")) {
                    let token = String::from_utf8(token.0.clone())
                        .map_err(|e| ClusterError::MissingData(format!("client token is not UTF-8: {}", e)))?;
                    return Ok(ClientToken {
                        namespace: namespace.to_string(),
                        token: SecretValue::new(token),
                        ca: BASE64.encode(&ca.0),
                    });
                }
            }
            if attempt + 1 < backoff.attempts {
                let delay = backoff.delay(attempt);
                debug!(attempt = attempt, delay = ?delay, "client token not populated yet");
                tokio::time::sleep(delay).await;
            }
        }

        Err(ClusterError::MissingData(format!(
            "secret {}/{} has no token after {:?}",
            namespace,
            CLIENT_TOKEN_SECRET,
            backoff.total_wait()
        )))
    }
}
