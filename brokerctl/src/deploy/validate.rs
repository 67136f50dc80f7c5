//! Request validation
//!
//! Pure checks run before anything touches the cluster, so a typo in a
//! parameter never leaves a half-provisioned broker behind.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::deploy::request::{ComponentVocabulary, DeployRequest};
use crate::errors::DeployError;

/// Ranges a global CIDR must not overlap
const RESERVED_RANGES: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(224, 0, 0, 0), 4),
    (Ipv4Addr::new(255, 255, 255, 255), 32),
];

/// Limits applied when validating or deriving the globalnet cluster size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalnetPolicy {
    /// Smallest allowed per-cluster block
    pub min_cluster_size: u32,

    /// Number of clusters a derived size must leave room for
    pub min_cluster_count: u32,
}

impl Default for GlobalnetPolicy {
    fn default() -> Self {
        Self {
            min_cluster_size: 4,
            min_cluster_count: 256,
        }
    }
}

/// Check the requested components against the vocabulary
pub fn validate_components(
    requested: &BTreeSet<String>,
    vocabulary: &ComponentVocabulary,
) -> Result<(), DeployError> {
    if requested.is_empty() {
        return Err(DeployError::InvalidComponents(
            "at least one component must be provided for deployment".to_string(),
        ));
    }

    if let Some(unknown) = requested.iter().find(|c| !vocabulary.contains(c)) {
        return Err(DeployError::InvalidComponents(format!(
            "unknown component: {}, valid components are: {}",
            unknown,
            vocabulary.names().collect::<Vec<_>>().join(", ")
        )));
    }

    Ok(())
}

/// Validate the globalnet parameters and return the cluster size to use.
///
/// Returns 0 when globalnet is disabled.
pub fn validate_globalnet_config(
    request: &DeployRequest,
    policy: &GlobalnetPolicy,
) -> Result<u32, DeployError> {
    if !request.globalnet_enabled {
        return Ok(0);
    }

    let net = parse_global_cidr(&request.globalnet_cidr_range)?;
    cluster_size_for(&net, request.default_globalnet_cluster_size, policy)
}

/// Parse a global CIDR and reject reserved ranges
pub fn parse_global_cidr(cidr: &str) -> Result<Ipv4Net, DeployError> {
    let net: Ipv4Net = cidr
        .trim()
        .parse()
        .map_err(|e| DeployError::InvalidCidr(format!("{:?} is not a valid IPv4 CIDR: {}", cidr, e)))?;
    let net = net.trunc();

    for &(addr, prefix) in RESERVED_RANGES {
        let reserved = Ipv4Net::new(addr, prefix)
            .map_err(|e| DeployError::InvalidCidr(e.to_string()))?;
        if net.contains(&reserved.network()) || reserved.contains(&net.network()) {
            return Err(DeployError::InvalidCidr(format!(
                "{} overlaps the reserved range {}",
                cidr, reserved
            )));
        }
    }

    Ok(net)
}

fn cluster_size_for(net: &Ipv4Net, requested: u32, policy: &GlobalnetPolicy) -> Result<u32, DeployError> {
    let available: u64 = 1u64 << (32 - u32::from(net.prefix_len()));

    if requested == 0 {
        let clusters = u64::from(policy.min_cluster_count.max(1)).next_power_of_two();
        let size = available / clusters;
        if size < u64::from(policy.min_cluster_size) {
            return Err(DeployError::InvalidClusterSize(format!(
                "{} is too small to hold {} clusters of at least {} addresses",
                net, policy.min_cluster_count, policy.min_cluster_size
            )));
        }
        return u32::try_from(size)
            .map_err(|_| DeployError::InvalidClusterSize(format!("derived cluster size {} is too large", size)));
    }

    if !requested.is_power_of_two() {
        return Err(DeployError::InvalidClusterSize(format!(
            "cluster size {} does not evenly divide {}",
            requested, net
        )));
    }

    if requested < policy.min_cluster_size {
        return Err(DeployError::InvalidClusterSize(format!(
            "cluster size {} is below the minimum of {}",
            requested, policy.min_cluster_size
        )));
    }

    if u64::from(requested) > available {
        return Err(DeployError::InvalidClusterSize(format!(
            "cluster size {} should be <= {}",
            requested, available
        )));
    }

    Ok(requested)
}
