//! File operations

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::errors::StoreError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string, `None` when the file does not exist
    pub async fn read_string_if_exists(&self) -> Result<Option<String>, StoreError> {
        let mut file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        Ok(Some(contents))
    }

    /// Move the file to `target`
    pub async fn rename_to(&self, target: &Path) -> Result<File, StoreError> {
        fs::rename(&self.path, target).await?;
        Ok(File::new(target))
    }

    /// Set file permissions to owner-read/write only (0o600) on Unix.
    ///
    /// A no-op on non-Unix platforms.
    pub async fn set_permissions_600(&self) -> Result<(), StoreError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let meta = fs::metadata(&self.path).await?;
            let mut perms = meta.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms).await?;
        }
        Ok(())
    }

    /// Atomic write using a temporary sibling file.
    ///
    /// The target either keeps its previous contents or holds all of
    /// `contents`; the temporary file is removed if any step fails.
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = File::new(
            self.path
                .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4())),
        );

        let result = async {
            let mut file = fs::File::create(temp.path()).await?;
            file.write_all(contents).await?;
            file.sync_all().await?;
            drop(file);
            temp.set_permissions_600().await?;
            fs::rename(temp.path(), &self.path).await?;
            Ok::<(), StoreError>(())
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(temp.path()).await;
        }
        result
    }
}
