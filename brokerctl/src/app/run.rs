//! Command entry point wiring

use std::sync::Arc;

use tracing::{error, info};

use crate::app::settings::Settings;
use crate::cluster::{KubeconfigResolver, RegistryImageResolver};
use crate::deploy::orchestrator::{BrokerDeployer, DeployOutcome};
use crate::descriptor::FileDescriptorStore;
use crate::errors::DeployError;
use crate::reporter::{CliReporter, LogReporter, Reporter};

/// Build a deployer backed by the real cluster, registry and filesystem
pub fn deployer(settings: &Settings) -> BrokerDeployer {
    BrokerDeployer::new(
        Arc::new(KubeconfigResolver::new(
            settings.kubeconfig.clone(),
            settings.context.clone(),
        )),
        Arc::new(RegistryImageResolver::new()),
        Arc::new(FileDescriptorStore::new()),
        settings.deployer_options(),
    )
}

/// Deploy the broker described by `settings`.
///
/// Progress goes to stdout, or into the log stream when logging as JSON.
pub async fn run(settings: &Settings) -> Result<DeployOutcome, DeployError> {
    let mut reporter: Box<dyn Reporter> = if settings.log_json {
        Box::new(LogReporter::new())
    } else {
        Box::new(CliReporter::new())
    };
    run_with(&deployer(settings), settings, reporter.as_mut()).await
}

/// Deploy with the given deployer and reporter
pub async fn run_with(
    deployer: &BrokerDeployer,
    settings: &Settings,
    reporter: &mut dyn Reporter,
) -> Result<DeployOutcome, DeployError> {
    info!(
        descriptor = %deployer.descriptor_path().display(),
        "Running broker deployment"
    );
    match deployer.deploy(settings.deploy_request(), reporter).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            error!("Broker deployment failed: {}", e);
            Err(e)
        }
    }
}
