//! Broker descriptor
//!
//! The descriptor is what joining clusters need to reach the broker: its API
//! URL, client credentials, the IPsec PSK and the enabled components. It is
//! stored as base64-encoded JSON.

pub mod store;

use std::collections::BTreeSet;
use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::deploy::request::SERVICE_DISCOVERY;
use crate::errors::StoreError;

pub use store::{build_from_cluster, DescriptorStore, FileDescriptorStore};

/// Conventional descriptor filename
pub const DESCRIPTOR_FILENAME: &str = "broker-info.subm";

/// Number of random bytes in a generated PSK
const PSK_LEN: usize = 64;

/// A secret string that never shows up in `Debug` output
pub struct SecretValue(SecretString);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Generate a fresh IPsec PSK
    pub fn generate_psk() -> Self {
        let mut bytes = [0u8; PSK_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self::new(BASE64.encode(bytes))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretValue {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for SecretValue {}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([REDACTED])")
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SecretValue::new(s))
    }
}

/// Credentials joining clusters use to talk to the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientToken {
    pub namespace: String,
    pub token: SecretValue,
    /// Base64-encoded CA bundle
    pub ca: String,
}

/// Descriptor written after a successful broker deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerDescriptor {
    #[serde(rename = "brokerURL")]
    pub broker_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<ClientToken>,

    #[serde(rename = "ipsecPSK")]
    pub ipsec_psk: SecretValue,

    #[serde(default)]
    pub service_discovery: bool,

    #[serde(default)]
    pub components: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domains: Option<Vec<String>>,
}

impl BrokerDescriptor {
    /// Record the component set and derive the service discovery flag from it
    pub fn set_components(&mut self, components: &BTreeSet<String>) {
        self.service_discovery = components.contains(SERVICE_DISCOVERY);
        self.components = components.iter().cloned().collect();
    }

    /// Record custom domains, clearing them when the list is empty
    pub fn set_custom_domains(&mut self, domains: &[String]) {
        self.custom_domains = if domains.is_empty() {
            None
        } else {
            Some(domains.to_vec())
        };
    }

    /// Encode for storage
    pub fn encode(&self) -> Result<String, StoreError> {
        let json = serde_json::to_vec(self)?;
        Ok(BASE64.encode(json))
    }

    /// Decode from storage
    pub fn decode(contents: &str) -> Result<Self, StoreError> {
        let json = BASE64
            .decode(contents.trim())
            .map_err(|e| StoreError::Decode(format!("invalid base64: {}", e)))?;
        let descriptor = serde_json::from_slice(&json)?;
        Ok(descriptor)
    }
}
