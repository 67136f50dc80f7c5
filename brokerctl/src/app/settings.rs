//! Settings file and command line handling

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::app::options::{CorruptDescriptorPolicy, DeployerOptions, DEFAULT_OPERATOR_NAMESPACE};
use crate::deploy::request::{
    DeployRequest, CONNECTIVITY, DEFAULT_BROKER_NAMESPACE, DEFAULT_GLOBALNET_CIDR_RANGE, SERVICE_DISCOVERY,
};
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Settings file looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "brokerctl.json";

/// brokerctl settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Kubeconfig path, inferred when unset
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context
    #[serde(default)]
    pub context: Option<String>,

    /// Components to deploy
    #[serde(default = "default_components")]
    pub components: Vec<String>,

    /// Globalnet configuration
    #[serde(default)]
    pub globalnet: GlobalnetSettings,

    /// Custom domains for service discovery
    #[serde(default)]
    pub custom_domains: Vec<String>,

    /// Broker namespace
    #[serde(default = "default_broker_namespace")]
    pub broker_namespace: String,

    /// Operator namespace
    #[serde(default = "default_operator_namespace")]
    pub operator_namespace: String,

    /// Operator image repository
    #[serde(default)]
    pub repository: String,

    /// Operator image version
    #[serde(default)]
    pub image_version: String,

    /// Full operator image reference
    #[serde(default)]
    pub operator_image: Option<String>,

    /// Run the operator with debug logging
    #[serde(default)]
    pub operator_debug: bool,

    /// Descriptor to take the IPsec PSK from
    #[serde(default)]
    pub ipsec_psk_from: Option<PathBuf>,

    /// Directory the descriptor is written to
    #[serde(default = "default_descriptor_dir")]
    pub descriptor_dir: PathBuf,

    /// Abort when a previous descriptor cannot be read
    #[serde(default)]
    pub fail_on_corrupt_descriptor: bool,
}

fn default_components() -> Vec<String> {
    vec![SERVICE_DISCOVERY.to_string(), CONNECTIVITY.to_string()]
}

fn default_broker_namespace() -> String {
    DEFAULT_BROKER_NAMESPACE.to_string()
}

fn default_operator_namespace() -> String {
    DEFAULT_OPERATOR_NAMESPACE.to_string()
}

fn default_descriptor_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_json: false,
            kubeconfig: None,
            context: None,
            components: default_components(),
            globalnet: GlobalnetSettings::default(),
            custom_domains: Vec::new(),
            broker_namespace: default_broker_namespace(),
            operator_namespace: default_operator_namespace(),
            repository: String::new(),
            image_version: String::new(),
            operator_image: None,
            operator_debug: false,
            ipsec_psk_from: None,
            descriptor_dir: default_descriptor_dir(),
            fail_on_corrupt_descriptor: false,
        }
    }
}

/// Globalnet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalnetSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_cidr_range")]
    pub cidr_range: String,

    /// 0 derives the size from the range
    #[serde(default)]
    pub cluster_size: u32,
}

fn default_cidr_range() -> String {
    DEFAULT_GLOBALNET_CIDR_RANGE.to_string()
}

impl Default for GlobalnetSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cidr_range: default_cidr_range(),
            cluster_size: 0,
        }
    }
}

/// Parse `--key=value` and `--flag` arguments
pub fn parse_args<I, S>(args: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cli_args = HashMap::new();
    for arg in args {
        let arg = arg.as_ref();
        if let Some((key, value)) = arg.split_once('=') {
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }
    cli_args
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    value
        .parse()
        .map_err(|_| anyhow!("--{} expects true or false, got {:?}", key, value))
}

impl Settings {
    /// Load settings from `path`, or from the default file when present
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (file, required) = match path {
            Some(p) => (File::new(p), true),
            None => (File::new(DEFAULT_SETTINGS_FILE), false),
        };

        match file.read_string_if_exists().await {
            Ok(Some(contents)) => serde_json::from_str(&contents)
                .with_context(|| format!("invalid settings file {}", file.path().display())),
            Ok(None) if required => Err(anyhow!("settings file {} does not exist", file.path().display())),
            Ok(None) => Ok(Self::default()),
            Err(e) => Err(anyhow!("unable to read settings file {}: {}", file.path().display(), e)),
        }
    }

    /// Override settings with command line arguments
    pub fn apply_args(&mut self, args: &HashMap<String, String>) -> anyhow::Result<()> {
        for (key, value) in args {
            match key.as_str() {
                "components" => self.components = parse_list(value),
                "globalnet" => self.globalnet.enabled = parse_bool(key, value)?,
                "globalnet-cidr-range" => self.globalnet.cidr_range = value.clone(),
                "globalnet-cluster-size" => {
                    self.globalnet.cluster_size = value
                        .parse()
                        .with_context(|| format!("--{} expects a number", key))?;
                }
                "custom-domains" => self.custom_domains = parse_list(value),
                "namespace" => self.broker_namespace = value.clone(),
                "operator-namespace" => self.operator_namespace = value.clone(),
                "repository" => self.repository = value.clone(),
                "version-tag" => self.image_version = value.clone(),
                "operator-image" => self.operator_image = Some(value.clone()),
                "operator-debug" => self.operator_debug = parse_bool(key, value)?,
                "ipsec-psk-from" => self.ipsec_psk_from = Some(PathBuf::from(value)),
                "kubeconfig" => self.kubeconfig = Some(PathBuf::from(value)),
                "context" => self.context = Some(value.clone()),
                "descriptor-dir" => self.descriptor_dir = PathBuf::from(value),
                "fail-on-corrupt-descriptor" => self.fail_on_corrupt_descriptor = parse_bool(key, value)?,
                "log-level" => self.log_level = value.parse().map_err(|e: String| anyhow!(e))?,
                "log-json" => self.log_json = parse_bool(key, value)?,
                // Handled by the entry point
                "config" | "version" | "help" => {}
                other => return Err(anyhow!("unknown option --{}", other)),
            }
        }
        Ok(())
    }

    /// The deployment request described by these settings
    pub fn deploy_request(&self) -> DeployRequest {
        DeployRequest {
            components: self.components.iter().cloned().collect::<BTreeSet<_>>(),
            globalnet_enabled: self.globalnet.enabled,
            globalnet_cidr_range: self.globalnet.cidr_range.clone(),
            default_globalnet_cluster_size: self.globalnet.cluster_size,
            default_custom_domains: self.custom_domains.clone(),
            broker_namespace: self.broker_namespace.clone(),
            repository: self.repository.clone(),
            image_version: self.image_version.clone(),
            operator_debug: self.operator_debug,
            existing_descriptor_path: self.ipsec_psk_from.clone(),
        }
    }

    /// Deployer options described by these settings
    pub fn deployer_options(&self) -> DeployerOptions {
        DeployerOptions {
            descriptor_dir: self.descriptor_dir.clone(),
            operator_namespace: self.operator_namespace.clone(),
            operator_image: self.operator_image.clone(),
            corrupt_descriptor: if self.fail_on_corrupt_descriptor {
                CorruptDescriptorPolicy::Fail
            } else {
                CorruptDescriptorPolicy::Regenerate
            },
            ..Default::default()
        }
    }
}
