//! Broker RBAC rules

use std::collections::BTreeSet;

use k8s_openapi::api::rbac::v1::PolicyRule;

use crate::deploy::request::{CONNECTIVITY, GLOBALNET, SERVICE_DISCOVERY};

/// Service account joining clusters authenticate as
pub const CLIENT_SERVICE_ACCOUNT: &str = "submariner-k8s-broker-client";

/// Role granted to joining clusters
pub const CLIENT_ROLE: &str = "submariner-k8s-broker-cluster";

/// Long-lived token secret for the client service account
pub const CLIENT_TOKEN_SECRET: &str = "submariner-k8s-broker-client-token";

const READ_WRITE: &[&str] = &["create", "get", "list", "watch", "patch", "update", "delete"];

fn rule(group: &str, resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![group.to_string()]),
        resources: Some(resources.iter().map(|r| r.to_string()).collect()),
        verbs: verbs.iter().map(|v| v.to_string()).collect(),
        ..Default::default()
    }
}

/// Rules joining clusters need for the given components
pub fn client_role_rules(components: &BTreeSet<String>) -> Vec<PolicyRule> {
    let mut rules = Vec::new();

    if components.contains(CONNECTIVITY) {
        rules.push(rule("submariner.io", &["clusters", "endpoints"], READ_WRITE));
    }

    if components.contains(SERVICE_DISCOVERY) {
        rules.push(rule("multicluster.x-k8s.io", &["serviceimports"], READ_WRITE));
        rules.push(rule("discovery.k8s.io", &["endpointslices"], READ_WRITE));
    }

    if components.contains(GLOBALNET) {
        rules.push(rule("", &["configmaps"], &["get", "list", "watch", "update"]));
    }

    rules
}

/// Keep every existing rule that `desired` does not already cover
pub fn merge_rules(existing: &[PolicyRule], desired: Vec<PolicyRule>) -> Vec<PolicyRule> {
    let mut merged = desired;
    for rule in existing {
        if !merged.contains(rule) {
            merged.push(rule.clone());
        }
    }
    merged
}
