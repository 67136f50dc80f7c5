//! Broker deployment orchestration
//!
//! Phases run strictly in order and stop at the first failure. Nothing is
//! rolled back: every cluster-side phase is idempotent, so re-running the
//! deployment converges. The descriptor is only touched once every cluster
//! phase has succeeded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::options::{CorruptDescriptorPolicy, DeployerOptions};
use crate::cluster::{BrokerCluster, ConnectionResolver, ImageResolver};
use crate::deploy::request::{DeployRequest, GLOBALNET};
use crate::deploy::validate::{parse_global_cidr, validate_components, validate_globalnet_config};
use crate::descriptor::{build_from_cluster, BrokerDescriptor, DescriptorStore, DESCRIPTOR_FILENAME};
use crate::errors::DeployError;
use crate::reporter::Reporter;

/// Result of a successful deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    /// Where the descriptor was written
    pub descriptor_path: PathBuf,

    /// Where the previous descriptor was moved, if there was one
    pub backup_path: Option<PathBuf>,

    /// Whether the IPsec PSK was carried over from a previous descriptor
    pub psk_reused: bool,
}

/// Deploys the broker and writes its descriptor
pub struct BrokerDeployer {
    resolver: Arc<dyn ConnectionResolver>,
    images: Arc<dyn ImageResolver>,
    store: Arc<dyn DescriptorStore>,
    options: DeployerOptions,
}

impl BrokerDeployer {
    pub fn new(
        resolver: Arc<dyn ConnectionResolver>,
        images: Arc<dyn ImageResolver>,
        store: Arc<dyn DescriptorStore>,
        options: DeployerOptions,
    ) -> Self {
        Self {
            resolver,
            images,
            store,
            options,
        }
    }

    /// Path of the descriptor this deployer writes
    pub fn descriptor_path(&self) -> PathBuf {
        self.options.descriptor_dir.join(DESCRIPTOR_FILENAME)
    }

    /// Run a full deployment.
    ///
    /// Validation and connection errors are returned before any phase is
    /// reported. Callers must not run two deployments against the same
    /// descriptor directory at once.
    pub async fn deploy(
        &self,
        mut request: DeployRequest,
        reporter: &mut dyn Reporter,
    ) -> Result<DeployOutcome, DeployError> {
        validate_components(&request.components, &self.options.components)?;
        request.default_globalnet_cluster_size =
            validate_globalnet_config(&request, &self.options.globalnet)?;
        if request.globalnet_enabled {
            request.globalnet_cidr_range = parse_global_cidr(&request.globalnet_cidr_range)?.to_string();
            request.components.insert(GLOBALNET.to_string());
        }

        let cluster = self
            .resolver
            .connect()
            .await
            .map_err(DeployError::InvalidKubeconfig)?;

        info!(
            namespace = %request.broker_namespace,
            components = ?request.components,
            globalnet = request.globalnet_enabled,
            "deploying broker"
        );

        self.provision(&request, cluster.as_ref(), reporter).await?;
        self.configure_addressing(&request, cluster.as_ref(), reporter).await?;
        let outcome = self.write_descriptor(&request, cluster.as_ref(), reporter).await?;

        info!(path = %outcome.descriptor_path.display(), "broker deployed");
        Ok(outcome)
    }

    async fn provision(
        &self,
        request: &DeployRequest,
        cluster: &dyn BrokerCluster,
        reporter: &mut dyn Reporter,
    ) -> Result<(), DeployError> {
        let phase = reporter.started("Setting up broker RBAC");
        let result = cluster
            .ensure_rbac(&request.components, false, &request.broker_namespace)
            .await
            .map_err(DeployError::RbacProvisioning);
        reporter.ended_with(phase, result.as_ref().err().map(as_source));
        result?;

        let phase = reporter.started("Deploying the operator");
        let result = self.deploy_operator(request, cluster).await;
        reporter.ended_with(phase, result.as_ref().err().map(as_source));
        result?;

        let phase = reporter.started("Deploying the broker");
        match cluster
            .ensure_broker_resource(&request.broker_namespace, &request.broker_spec())
            .await
        {
            Ok(()) => {
                reporter.succeeded(&phase, "The broker has been deployed");
                reporter.ended_with(phase, None);
                Ok(())
            }
            Err(e) => {
                reporter.failed(&phase, "Broker deployment failed");
                let err = DeployError::BrokerResource(e);
                reporter.ended_with(phase, Some(&err));
                Err(err)
            }
        }
    }

    async fn deploy_operator(&self, request: &DeployRequest, cluster: &dyn BrokerCluster) -> Result<(), DeployError> {
        let image = self
            .images
            .resolve_operator_image(
                &request.image_version,
                &request.repository,
                self.options.operator_image.as_deref(),
            )
            .map_err(DeployError::OperatorImageResolution)?;
        debug!(image = %image, "resolved operator image");

        cluster
            .ensure_operator(&self.options.operator_namespace, &image, request.operator_debug)
            .await
            .map_err(DeployError::OperatorDeployment)
    }

    async fn write_descriptor(
        &self,
        request: &DeployRequest,
        cluster: &dyn BrokerCluster,
        reporter: &mut dyn Reporter,
    ) -> Result<DeployOutcome, DeployError> {
        let phase = reporter.started(&format!("Creating {} file", DESCRIPTOR_FILENAME));
        let path = self.descriptor_path();

        let result = async {
            let reused = match &request.existing_descriptor_path {
                Some(pinned) => Some(self.load_pinned(pinned).await?),
                None => self.load_previous(&path).await?,
            };
            match (&request.existing_descriptor_path, reused.is_some()) {
                (Some(pinned), _) => {
                    reporter.warned(&phase, &format!("Reusing IPsec PSK from {}", pinned.display()));
                }
                (None, true) => {
                    reporter.warned(&phase, &format!("Reusing IPsec PSK from existing {}", DESCRIPTOR_FILENAME));
                }
                (None, false) => {
                    reporter.succeeded(
                        &phase,
                        &format!("A new IPsec PSK will be generated for {}", DESCRIPTOR_FILENAME),
                    );
                }
            }

            let mut descriptor = build_from_cluster(cluster, &request.broker_namespace, reused.as_ref())
                .await
                .map_err(DeployError::DescriptorBuild)?;

            let backup_path = self
                .store
                .backup_if_exists(&path)
                .await
                .map_err(|e| DeployError::descriptor_io("error backing up the broker file", e))?;
            if let Some(backup) = &backup_path {
                reporter.succeeded(
                    &phase,
                    &format!("Backed up previous {} to {}", DESCRIPTOR_FILENAME, backup.display()),
                );
            }

            descriptor.set_components(&request.components);
            descriptor.set_custom_domains(&request.default_custom_domains);

            self.store
                .persist(&descriptor, &path)
                .await
                .map_err(|e| DeployError::descriptor_io("error writing the broker information", e))?;

            Ok::<_, DeployError>(DeployOutcome {
                descriptor_path: path.clone(),
                backup_path,
                psk_reused: reused.is_some(),
            })
        }
        .await;

        reporter.ended_with(phase, result.as_ref().err().map(as_source));
        result
    }

    /// A descriptor the caller pinned explicitly must be readable
    async fn load_pinned(&self, pinned: &Path) -> Result<BrokerDescriptor, DeployError> {
        match self.store.load_if_exists(pinned).await {
            Ok(Some(descriptor)) => Ok(descriptor),
            Ok(None) => Err(DeployError::descriptor_io(
                format!("error reading {}", pinned.display()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist").into(),
            )),
            Err(e) => Err(DeployError::descriptor_io(format!("error reading {}", pinned.display()), e)),
        }
    }

    /// Look for a descriptor left by an earlier run
    async fn load_previous(&self, path: &Path) -> Result<Option<BrokerDescriptor>, DeployError> {
        match self.store.load_if_exists(path).await {
            Ok(found) => Ok(found),
            Err(e) => match self.options.corrupt_descriptor {
                CorruptDescriptorPolicy::Regenerate => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable broker descriptor");
                    Ok(None)
                }
                CorruptDescriptorPolicy::Fail => Err(DeployError::descriptor_io(
                    format!("error reading existing {}", path.display()),
                    e,
                )),
            },
        }
    }

    async fn configure_addressing(
        &self,
        request: &DeployRequest,
        cluster: &dyn BrokerCluster,
        reporter: &mut dyn Reporter,
    ) -> Result<(), DeployError> {
        let phase = reporter.started("Configuring globalnet addressing");

        let result = async {
            if request.globalnet_enabled {
                cluster
                    .validate_no_existing_addressing_config(&request.broker_namespace)
                    .await
                    .map_err(DeployError::AddressingConfig)?;
            }

            cluster
                .create_addressing_config(
                    request.globalnet_enabled,
                    &request.globalnet_cidr_range,
                    request.default_globalnet_cluster_size,
                    &request.broker_namespace,
                )
                .await
                .map_err(DeployError::AddressingConfig)
        }
        .await;

        reporter.ended_with(phase, result.as_ref().err().map(as_source));
        result
    }
}

fn as_source(err: &DeployError) -> &(dyn std::error::Error + 'static) {
    err
}
