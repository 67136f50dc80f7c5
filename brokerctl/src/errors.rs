//! Error types for broker deployment

use thiserror::Error;

/// Errors returned by a broker deployment run
///
/// Every variant names the phase that failed. Provisioning variants keep the
/// collaborator error as their source.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("invalid components parameter: {0}")]
    InvalidComponents(String),

    #[error("invalid GlobalCIDR configuration: {0}")]
    InvalidCidr(String),

    #[error("invalid GlobalCIDR configuration: {0}")]
    InvalidClusterSize(String),

    #[error("the provided kubeconfig is invalid: {0}")]
    InvalidKubeconfig(#[source] ClusterError),

    #[error("error setting up broker RBAC: {0}")]
    RbacProvisioning(#[source] ClusterError),

    #[error("error getting operator image: {0}")]
    OperatorImageResolution(#[source] ImageError),

    #[error("error deploying the operator: {0}")]
    OperatorDeployment(#[source] ClusterError),

    #[error("error deploying the broker: {0}")]
    BrokerResource(#[source] ClusterError),

    #[error("error creating globalCIDR configmap on broker: {0}")]
    AddressingConfig(#[source] ClusterError),

    #[error("error preparing the broker information: {0}")]
    DescriptorBuild(#[source] ClusterError),

    #[error("{context}: {source}")]
    DescriptorIo {
        context: String,
        #[source]
        source: StoreError,
    },
}

impl DeployError {
    pub(crate) fn descriptor_io(context: impl Into<String>, source: StoreError) -> Self {
        DeployError::DescriptorIo {
            context: context.into(),
            source,
        }
    }
}

/// Errors raised by the cluster collaborators
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("Kubeconfig inference error: {0}")]
    Infer(#[from] kube::config::InferConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Conflicting configuration: {0}")]
    Conflict(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Errors raised while resolving the operator image reference
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("invalid repository {0:?}")]
    InvalidRepository(String),

    #[error("invalid image version {0:?}")]
    InvalidVersion(String),
}

/// Errors raised by the descriptor store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(String),
}
