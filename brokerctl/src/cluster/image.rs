//! Operator image resolution

use crate::errors::ImageError;

/// Default image repository
pub const DEFAULT_REPOSITORY: &str = "quay.io/submariner";

/// Default operator version
pub const DEFAULT_IMAGE_VERSION: &str = "0.20.0";

/// Operator image name
pub const OPERATOR_IMAGE: &str = "submariner-operator";

/// Resolves the operator image reference
pub trait ImageResolver: Send + Sync {
    /// Build the operator image reference.
    ///
    /// `default_override` replaces the computed reference entirely.
    fn resolve_operator_image(
        &self,
        version: &str,
        repository: &str,
        default_override: Option<&str>,
    ) -> Result<String, ImageError>;
}

/// Composes `<repository>/submariner-operator:<version>` references
#[derive(Debug, Clone, Default)]
pub struct RegistryImageResolver;

impl RegistryImageResolver {
    pub fn new() -> Self {
        Self
    }
}

impl ImageResolver for RegistryImageResolver {
    fn resolve_operator_image(
        &self,
        version: &str,
        repository: &str,
        default_override: Option<&str>,
    ) -> Result<String, ImageError> {
        if let Some(image) = default_override.map(str::trim).filter(|i| !i.is_empty()) {
            if image.contains(char::is_whitespace) {
                return Err(ImageError::InvalidRepository(image.to_string()));
            }
            return Ok(image.to_string());
        }

        let repository = match repository.trim() {
            "" => DEFAULT_REPOSITORY,
            r => r.trim_end_matches('/'),
        };
        if repository.is_empty() || repository.contains(char::is_whitespace) || repository.contains('@') {
            return Err(ImageError::InvalidRepository(repository.to_string()));
        }

        let version = match version.trim() {
            "" => DEFAULT_IMAGE_VERSION,
            v => v,
        };
        if version.contains(char::is_whitespace) || version.contains('/') {
            return Err(ImageError::InvalidVersion(version.to_string()));
        }

        // Digests are referenced with '@', tags with ':'
        if version.starts_with("sha256:") {
            Ok(format!("{}/{}@{}", repository, OPERATOR_IMAGE, version))
        } else {
            Ok(format!("{}/{}:{}", repository, OPERATOR_IMAGE, version))
        }
    }
}
