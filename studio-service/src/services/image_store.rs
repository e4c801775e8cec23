//! Flat on-disk directory of generated PNG files.
//!
//! The directory is the only record of what exists: no index, no metadata.
//! Files are swept by the housekeeping job once they are older than the grace
//! window.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file name: {0}")]
    InvalidName(String),
}

/// A file written by [`ImageStore::save`].
#[derive(Debug, Clone)]
pub struct SavedImage {
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    base_path: PathBuf,
}

impl ImageStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `{prefix}_{YYYYmmdd_HHMMSS}_{8 hex chars}.png`
    pub fn unique_filename(prefix: &str) -> String {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}.png", prefix, timestamp, &suffix[..8])
    }

    pub async fn save(&self, prefix: &str, data: &[u8]) -> Result<SavedImage, StoreError> {
        // The directory may have been removed from outside since startup.
        fs::create_dir_all(&self.base_path).await?;

        let filename = Self::unique_filename(prefix);
        let path = self.base_path.join(&filename);
        fs::write(&path, data).await?;

        tracing::info!(path = %path.display(), size = data.len(), "Image saved");

        Ok(SavedImage { filename, path })
    }

    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(filename)?;
        Ok(fs::read(path).await?)
    }

    /// Delete regular files older than `grace`. Subdirectories are left alone.
    ///
    /// Returns the number of files removed. Individual failures are logged and
    /// skipped so one stubborn file cannot stall the sweep.
    pub async fn sweep(&self, grace: Duration) -> Result<usize, StoreError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.base_path.display(),
                    "Generated images directory does not exist"
                );
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        let mut deleted = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat file");
                    continue;
                }
            };

            if metadata.is_dir() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < grace {
                tracing::debug!(path = %path.display(), age_secs = age.as_secs(), "Skipping recent file");
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    deleted += 1;
                    tracing::debug!(path = %path.display(), "Deleted generated image");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete file");
                }
            }
        }

        Ok(deleted)
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, StoreError> {
        let is_plain = !filename.is_empty()
            && Path::new(filename).file_name().and_then(|n| n.to_str()) == Some(filename);
        if !is_plain {
            return Err(StoreError::InvalidName(filename.to_string()));
        }
        Ok(self.base_path.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_follow_prefix_timestamp_suffix_pattern() {
        let name = ImageStore::unique_filename("edited_image");
        assert!(name.starts_with("edited_image_"));
        assert!(name.ends_with(".png"));

        let stem = name.trim_end_matches(".png");
        let parts: Vec<&str> = stem.rsplitn(3, '_').collect();
        assert_eq!(parts[0].len(), 8, "random suffix");
        assert_eq!(parts[1].len(), 6, "HHMMSS");
    }

    #[test]
    fn filenames_are_unique() {
        let a = ImageStore::unique_filename("generated_image");
        let b = ImageStore::unique_filename("generated_image");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn save_then_read_returns_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).await.unwrap();

        let saved = store.save("generated_image", b"png-bytes").await.unwrap();
        assert!(saved.path.exists());
        assert_eq!(store.read(&saved.filename).await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn read_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).await.unwrap();

        let result = store.read("../secret.png").await;
        assert!(matches!(result, Err(StoreError::InvalidName(_))));
    }

    #[tokio::test]
    async fn sweep_deletes_files_but_not_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).await.unwrap();

        store.save("generated_image", b"a").await.unwrap();
        store.save("composed_image", b"b").await.unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let deleted = store.sweep(Duration::ZERO).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(dir.path().join("nested").is_dir());
    }

    #[tokio::test]
    async fn sweep_spares_files_inside_grace_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path()).await.unwrap();

        let saved = store.save("edited_image", b"fresh").await.unwrap();

        let deleted = store.sweep(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(deleted, 0);
        assert!(saved.path.exists());
    }

    #[tokio::test]
    async fn sweep_of_missing_directory_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("images")).await.unwrap();
        std::fs::remove_dir(store.base_path()).unwrap();

        assert_eq!(store.sweep(Duration::ZERO).await.unwrap(), 0);
    }
}
