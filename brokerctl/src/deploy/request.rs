//! Deployment request model

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Service discovery component name
pub const SERVICE_DISCOVERY: &str = "service-discovery";

/// Connectivity component name
pub const CONNECTIVITY: &str = "connectivity";

/// Globalnet component name, only ever added by the deployer
pub const GLOBALNET: &str = "globalnet";

/// Default globalnet CIDR range
pub const DEFAULT_GLOBALNET_CIDR_RANGE: &str = "242.0.0.0/8";

/// Default broker namespace
pub const DEFAULT_BROKER_NAMESPACE: &str = "submariner-k8s-broker";

/// The set of component names a caller may request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentVocabulary {
    names: BTreeSet<String>,
}

impl ComponentVocabulary {
    /// Create a vocabulary from the given names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for ComponentVocabulary {
    fn default() -> Self {
        Self::new([SERVICE_DISCOVERY, CONNECTIVITY])
    }
}

/// Input for a single broker deployment
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Requested components
    pub components: BTreeSet<String>,

    /// Enable globalnet address translation
    pub globalnet_enabled: bool,

    /// Global CIDR range handed out to joining clusters
    pub globalnet_cidr_range: String,

    /// Per-cluster global CIDR size, 0 to derive it from the range
    pub default_globalnet_cluster_size: u32,

    /// Custom domains for service discovery
    pub default_custom_domains: Vec<String>,

    /// Namespace holding the broker resources
    pub broker_namespace: String,

    /// Operator image repository, empty for the default
    pub repository: String,

    /// Operator image version, empty for the default
    pub image_version: String,

    /// Run the operator with debug logging
    pub operator_debug: bool,

    /// Descriptor file whose IPsec PSK must be reused
    pub existing_descriptor_path: Option<PathBuf>,
}

impl Default for DeployRequest {
    fn default() -> Self {
        Self {
            components: [SERVICE_DISCOVERY, CONNECTIVITY]
                .into_iter()
                .map(String::from)
                .collect(),
            globalnet_enabled: false,
            globalnet_cidr_range: DEFAULT_GLOBALNET_CIDR_RANGE.to_string(),
            default_globalnet_cluster_size: 0,
            default_custom_domains: Vec::new(),
            broker_namespace: DEFAULT_BROKER_NAMESPACE.to_string(),
            repository: String::new(),
            image_version: String::new(),
            operator_debug: false,
            existing_descriptor_path: None,
        }
    }
}

impl DeployRequest {
    /// Build the broker resource spec from this request
    pub fn broker_spec(&self) -> BrokerSpec {
        BrokerSpec {
            components: self.components.iter().cloned().collect(),
            default_custom_domains: self.default_custom_domains.clone(),
            globalnet_cidr_range: self.globalnet_cidr_range.clone(),
            default_globalnet_cluster_size: self.default_globalnet_cluster_size,
            globalnet_enabled: self.globalnet_enabled,
        }
    }
}

/// Spec of the broker custom resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerSpec {
    pub components: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_custom_domains: Vec<String>,

    #[serde(rename = "globalnetCIDRRange", default)]
    pub globalnet_cidr_range: String,

    #[serde(default)]
    pub default_globalnet_cluster_size: u32,

    #[serde(default)]
    pub globalnet_enabled: bool,
}
