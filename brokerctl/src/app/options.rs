//! Deployer configuration options

use std::path::PathBuf;

use crate::deploy::request::ComponentVocabulary;
use crate::deploy::validate::GlobalnetPolicy;

/// Namespace the operator is deployed into
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "submariner-operator";

/// What to do when a previous descriptor exists but cannot be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptDescriptorPolicy {
    /// Treat it as missing and generate a new PSK
    #[default]
    Regenerate,

    /// Abort the deployment
    Fail,
}

/// Options shared by every deployment a deployer runs
#[derive(Debug, Clone)]
pub struct DeployerOptions {
    /// Directory the descriptor is written to
    pub descriptor_dir: PathBuf,

    /// Namespace for the operator deployment
    pub operator_namespace: String,

    /// Full operator image reference overriding repository and version
    pub operator_image: Option<String>,

    /// Components callers may request
    pub components: ComponentVocabulary,

    /// Globalnet cluster size limits
    pub globalnet: GlobalnetPolicy,

    /// Handling of unreadable previous descriptors
    pub corrupt_descriptor: CorruptDescriptorPolicy,
}

impl Default for DeployerOptions {
    fn default() -> Self {
        Self {
            descriptor_dir: PathBuf::from("."),
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            operator_image: None,
            components: ComponentVocabulary::default(),
            globalnet: GlobalnetPolicy::default(),
            corrupt_descriptor: CorruptDescriptorPolicy::default(),
        }
    }
}
