//! Settings to deployment wiring tests

use std::sync::Arc;

use brokerctl::app::run::run_with;
use brokerctl::app::settings::{parse_args, Settings};
use brokerctl::deploy::request::GLOBALNET;
use brokerctl::descriptor::{DescriptorStore, FileDescriptorStore};
use brokerctl::reporter::{RecordingReporter, Severity};

use crate::fakes::{deployer_with, Call, FakeCluster, FakeResolver};

#[tokio::test]
async fn test_settings_file_and_args_drive_deployment() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("brokerctl.json");
    std::fs::write(
        &config,
        r#"{
            "components": ["service-discovery"],
            "broker_namespace": "brokers",
            "globalnet": {"cidr_range": "244.0.0.0/16"}
        }"#,
    )
    .unwrap();

    let mut settings = Settings::load(Some(&config)).await.unwrap();
    let descriptor_dir = dir.path().join("out");
    settings
        .apply_args(&parse_args([
            "--globalnet".to_string(),
            "--globalnet-cluster-size=1024".to_string(),
            format!("--descriptor-dir={}", descriptor_dir.display()),
        ]))
        .unwrap();

    let cluster = Arc::new(FakeCluster::default());
    let deployer = deployer_with(
        Arc::new(FakeResolver::new(cluster.clone())),
        Arc::new(FileDescriptorStore::new()),
        settings.deployer_options(),
    );
    let mut reporter = RecordingReporter::new();
    let outcome = run_with(&deployer, &settings, &mut reporter).await.unwrap();

    assert_eq!(outcome.descriptor_path, descriptor_dir.join("broker-info.subm"));
    assert!(reporter.messages(Severity::Failed).is_empty());
    assert!(cluster.calls().contains(&Call::CreateAddressing {
        enabled: true,
        cidr: "244.0.0.0/16".to_string(),
        cluster_size: 1024,
    }));

    let descriptor = FileDescriptorStore::new()
        .load_if_exists(&outcome.descriptor_path)
        .await
        .unwrap()
        .unwrap();
    assert!(descriptor.service_discovery);
    assert_eq!(
        descriptor.components,
        vec![GLOBALNET.to_string(), "service-discovery".to_string()]
    );
    assert_eq!(descriptor.client_token.unwrap().namespace, "brokers");
}

#[tokio::test]
async fn test_oversized_cluster_size_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings
        .apply_args(&parse_args([
            "--globalnet",
            "--globalnet-cidr-range=244.0.0.0/24",
            "--globalnet-cluster-size=512",
        ]))
        .unwrap();
    settings.descriptor_dir = dir.path().to_path_buf();

    let resolver = Arc::new(FakeResolver::new(Arc::new(FakeCluster::default())));
    let deployer = deployer_with(
        resolver.clone(),
        Arc::new(FileDescriptorStore::new()),
        settings.deployer_options(),
    );
    let mut reporter = RecordingReporter::new();

    assert!(run_with(&deployer, &settings, &mut reporter).await.is_err());
    assert!(reporter.events().is_empty());
    assert_eq!(resolver.connects(), 0);
}
