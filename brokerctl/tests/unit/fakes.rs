//! In-memory collaborators for deployment tests

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use brokerctl::app::options::DeployerOptions;
use brokerctl::cluster::{BrokerCluster, ConnectionResolver, RegistryImageResolver};
use brokerctl::deploy::orchestrator::BrokerDeployer;
use brokerctl::deploy::request::BrokerSpec;
use brokerctl::descriptor::{BrokerDescriptor, ClientToken, DescriptorStore, FileDescriptorStore, SecretValue};
use brokerctl::errors::{ClusterError, StoreError};

pub const SERVER_URL: &str = "https://broker.example:6443";

/// A call made against the fake cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Rbac(Vec<String>),
    Operator { namespace: String, image: String, debug: bool },
    Broker(BrokerSpec),
    ValidateAddressing,
    CreateAddressing { enabled: bool, cidr: String, cluster_size: u32 },
    ClientToken,
}

/// Operations the fake cluster can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Rbac,
    Operator,
    Broker,
    ClientToken,
    Addressing,
}

#[derive(Default)]
pub struct FakeCluster {
    pub fail_at: Option<FailAt>,
    calls: Mutex<Vec<Call>>,
}

impl FakeCluster {
    pub fn failing_at(fail_at: FailAt) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call, op: FailAt) -> Result<(), ClusterError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_at == Some(op) {
            return Err(ClusterError::Rejected(format!("{:?} refused", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerCluster for FakeCluster {
    fn server_url(&self) -> String {
        SERVER_URL.to_string()
    }

    async fn ensure_rbac(
        &self,
        components: &BTreeSet<String>,
        _allow_disable: bool,
        _namespace: &str,
    ) -> Result<(), ClusterError> {
        self.record(Call::Rbac(components.iter().cloned().collect()), FailAt::Rbac)
    }

    async fn ensure_operator(&self, namespace: &str, image: &str, debug: bool) -> Result<(), ClusterError> {
        self.record(
            Call::Operator {
                namespace: namespace.to_string(),
                image: image.to_string(),
                debug,
            },
            FailAt::Operator,
        )
    }

    async fn ensure_broker_resource(&self, _namespace: &str, spec: &BrokerSpec) -> Result<(), ClusterError> {
        self.record(Call::Broker(spec.clone()), FailAt::Broker)
    }

    async fn validate_no_existing_addressing_config(&self, _namespace: &str) -> Result<(), ClusterError> {
        self.record(Call::ValidateAddressing, FailAt::Addressing)
    }

    async fn create_addressing_config(
        &self,
        enabled: bool,
        cidr: &str,
        cluster_size: u32,
        _namespace: &str,
    ) -> Result<(), ClusterError> {
        self.record(
            Call::CreateAddressing {
                enabled,
                cidr: cidr.to_string(),
                cluster_size,
            },
            FailAt::Addressing,
        )
    }

    async fn broker_client_token(&self, namespace: &str) -> Result<ClientToken, ClusterError> {
        self.record(Call::ClientToken, FailAt::ClientToken)?;
        Ok(ClientToken {
            namespace: namespace.to_string(),
            token: SecretValue::new("client-token"),
            ca: "Y2EtYnVuZGxl".to_string(),
        })
    }
}

/// Hands out the same fake cluster, or fails to connect
pub struct FakeResolver {
    cluster: Option<Arc<FakeCluster>>,
    connects: Mutex<u32>,
}

impl FakeResolver {
    pub fn new(cluster: Arc<FakeCluster>) -> Self {
        Self {
            cluster: Some(cluster),
            connects: Mutex::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            cluster: None,
            connects: Mutex::new(0),
        }
    }

    pub fn connects(&self) -> u32 {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl ConnectionResolver for FakeResolver {
    async fn connect(&self) -> Result<Arc<dyn BrokerCluster>, ClusterError> {
        *self.connects.lock().unwrap() += 1;
        match &self.cluster {
            Some(cluster) => Ok(cluster.clone() as Arc<dyn BrokerCluster>),
            None => Err(ClusterError::MissingData("no current context".to_string())),
        }
    }
}

/// File store whose writes always fail
pub struct FailingPersistStore {
    inner: FileDescriptorStore,
}

impl FailingPersistStore {
    pub fn new() -> Self {
        Self {
            inner: FileDescriptorStore::new(),
        }
    }
}

#[async_trait]
impl DescriptorStore for FailingPersistStore {
    async fn load_if_exists(&self, path: &Path) -> Result<Option<BrokerDescriptor>, StoreError> {
        self.inner.load_if_exists(path).await
    }

    async fn backup_if_exists(&self, path: &Path) -> Result<Option<PathBuf>, StoreError> {
        self.inner.backup_if_exists(path).await
    }

    async fn persist(&self, _descriptor: &BrokerDescriptor, _path: &Path) -> Result<(), StoreError> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only filesystem").into())
    }
}

/// Deployer writing into `dir` and talking to `resolver`
pub fn deployer(resolver: Arc<FakeResolver>, dir: &Path) -> BrokerDeployer {
    deployer_with(resolver, Arc::new(FileDescriptorStore::new()), options(dir))
}

pub fn deployer_with(
    resolver: Arc<FakeResolver>,
    store: Arc<dyn DescriptorStore>,
    options: DeployerOptions,
) -> BrokerDeployer {
    BrokerDeployer::new(resolver, Arc::new(RegistryImageResolver::new()), store, options)
}

pub fn options(dir: &Path) -> DeployerOptions {
    DeployerOptions {
        descriptor_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

pub fn components(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}
