//! Descriptor persistence

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};

use crate::cluster::BrokerCluster;
use crate::descriptor::{BrokerDescriptor, SecretValue};
use crate::errors::{ClusterError, StoreError};
use crate::filesys::file::File;

/// Storage for broker descriptors
#[async_trait]
pub trait DescriptorStore: Send + Sync {
    /// Load the descriptor at `path`, `None` when there is no file
    async fn load_if_exists(&self, path: &Path) -> Result<Option<BrokerDescriptor>, StoreError>;

    /// Move an existing file at `path` aside and return where it went
    async fn backup_if_exists(&self, path: &Path) -> Result<Option<PathBuf>, StoreError>;

    /// Replace the contents of `path` with `descriptor`
    async fn persist(&self, descriptor: &BrokerDescriptor, path: &Path) -> Result<(), StoreError>;
}

/// Filesystem-backed descriptor store
#[derive(Debug, Clone, Default)]
pub struct FileDescriptorStore;

impl FileDescriptorStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DescriptorStore for FileDescriptorStore {
    async fn load_if_exists(&self, path: &Path) -> Result<Option<BrokerDescriptor>, StoreError> {
        match File::new(path).read_string_if_exists().await? {
            Some(contents) => BrokerDescriptor::decode(&contents).map(Some),
            None => Ok(None),
        }
    }

    async fn backup_if_exists(&self, path: &Path) -> Result<Option<PathBuf>, StoreError> {
        let file = File::new(path);
        if !file.exists().await {
            return Ok(None);
        }

        let target = backup_path(path).await;
        file.rename_to(&target).await?;
        info!("Backed up {} to {}", path.display(), target.display());
        Ok(Some(target))
    }

    async fn persist(&self, descriptor: &BrokerDescriptor, path: &Path) -> Result<(), StoreError> {
        let encoded = descriptor.encode()?;
        File::new(path).write_atomic(encoded.as_bytes()).await?;
        debug!("Wrote broker descriptor to {}", path.display());
        Ok(())
    }
}

/// Pick a backup name that does not collide with an existing file.
///
/// `<name>.<RFC 3339 timestamp with ':' replaced by '_'>`, then `.1`, `.2`
/// and so on if that is taken.
async fn backup_path(path: &Path) -> PathBuf {
    let stamp = Utc::now()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
        .replace(':', "_");
    let mut base = path.as_os_str().to_os_string();
    base.push(".");
    base.push(&stamp);

    let mut candidate = PathBuf::from(&base);
    let mut n = 1u32;
    while File::new(&candidate).exists().await {
        let mut numbered = base.clone();
        numbered.push(format!(".{}", n));
        candidate = PathBuf::from(numbered);
        n += 1;
    }
    candidate
}

/// Assemble a descriptor from live cluster state.
///
/// The PSK comes from `reused` when given, otherwise a new one is generated.
/// Components and custom domains are left for the caller to fill in.
pub async fn build_from_cluster(
    cluster: &dyn BrokerCluster,
    namespace: &str,
    reused: Option<&BrokerDescriptor>,
) -> Result<BrokerDescriptor, ClusterError> {
    let client_token = cluster.broker_client_token(namespace).await?;

    let ipsec_psk = match reused {
        Some(previous) => {
            debug!("Carrying over the IPsec PSK of the previous descriptor");
            previous.ipsec_psk.clone()
        }
        None => SecretValue::generate_psk(),
    };

    Ok(BrokerDescriptor {
        broker_url: cluster.server_url(),
        client_token: Some(client_token),
        ipsec_psk,
        service_discovery: false,
        components: Vec::new(),
        custom_domains: None,
    })
}
