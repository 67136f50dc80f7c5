//! Cluster-side collaborators

pub mod image;
pub mod kubernetes;
pub mod rbac;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::deploy::request::BrokerSpec;
use crate::descriptor::ClientToken;
use crate::errors::ClusterError;

pub use self::image::{ImageResolver, RegistryImageResolver};
pub use self::kubernetes::{KubeCluster, KubeconfigResolver};

/// Provisioning operations against the broker cluster.
///
/// Every `ensure_*` operation must succeed when the objects already exist.
#[async_trait]
pub trait BrokerCluster: Send + Sync {
    /// API server URL joining clusters use to reach the broker
    fn server_url(&self) -> String;

    /// Ensure the broker roles, service accounts and bindings exist.
    ///
    /// With `allow_disable` unset, permissions granted for components that
    /// are not requested are kept.
    async fn ensure_rbac(
        &self,
        components: &BTreeSet<String>,
        allow_disable: bool,
        namespace: &str,
    ) -> Result<(), ClusterError>;

    /// Ensure the operator runs with the given image
    async fn ensure_operator(&self, namespace: &str, image: &str, operator_debug: bool) -> Result<(), ClusterError>;

    /// Create or update the broker resource
    async fn ensure_broker_resource(&self, namespace: &str, spec: &BrokerSpec) -> Result<(), ClusterError>;

    /// Fail if an existing addressing configuration conflicts with globalnet
    async fn validate_no_existing_addressing_config(&self, namespace: &str) -> Result<(), ClusterError>;

    /// Record the globalnet addressing configuration on the broker
    async fn create_addressing_config(
        &self,
        enabled: bool,
        cidr: &str,
        cluster_size: u32,
        namespace: &str,
    ) -> Result<(), ClusterError>;

    /// Credentials joining clusters authenticate with
    async fn broker_client_token(&self, namespace: &str) -> Result<ClientToken, ClusterError>;
}

/// Produces a connection to the broker cluster
#[async_trait]
pub trait ConnectionResolver: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn BrokerCluster>, ClusterError>;
}
