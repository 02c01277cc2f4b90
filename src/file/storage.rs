//! Physical blob storage.
//!
//! Uploaded bytes live outside the metadata store under UUID-based
//! names, sharded by the first 2 characters of the UUID:
//!
//! ```text
//! {base_path}/
//! ├── ab/
//! │   └── ab12cd34-5678-90ab-cdef-123456789012.txt
//! ├── cd/
//! │   └── cd90ab12-3456-7890-abcd-ef1234567890.bin
//! └── ...
//! ```
//!
//! The stored name is an opaque reference owned by exactly one upload
//! record. A record never points at a user-controlled path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{DropError, Result};

/// Blob store managing physical files.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for blob storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory is created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content under a fresh UUID-based name.
    ///
    /// `original_name` is only used to carry over the extension. Returns
    /// the stored name (UUID.extension).
    pub fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        let uuid = Uuid::new_v4();
        let ext = Self::extract_extension(original_name);
        let stored_name = format!("{uuid}.{ext}");

        let blob_path = self.blob_path(&stored_name);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&blob_path, content)?;

        Ok(stored_name)
    }

    /// Open a stored blob for async streaming.
    ///
    /// A missing blob surfaces as [`DropError::BlobMissing`]: the caller
    /// holds metadata that claims the blob exists, so absence (for
    /// example a race against the sweeper) is a consistency fault, not a
    /// NotFound.
    pub async fn open(&self, stored_name: &str) -> Result<tokio::fs::File> {
        let blob_path = self.blob_path(stored_name);

        match tokio::fs::File::open(&blob_path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DropError::BlobMissing(stored_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load a stored blob fully into memory.
    pub fn load(&self, stored_name: &str) -> Result<Vec<u8>> {
        let blob_path = self.blob_path(stored_name);

        match fs::read(&blob_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DropError::BlobMissing(stored_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it was already
    /// gone. Either way the blob no longer exists afterwards, which is
    /// all the sweeper needs.
    pub fn delete(&self, stored_name: &str) -> Result<bool> {
        let blob_path = self.blob_path(stored_name);

        match fs::remove_file(&blob_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists.
    pub fn exists(&self, stored_name: &str) -> bool {
        self.blob_path(stored_name).exists()
    }

    /// Get the size of a stored blob.
    pub fn file_size(&self, stored_name: &str) -> Result<u64> {
        let blob_path = self.blob_path(stored_name);

        match fs::metadata(&blob_path) {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DropError::BlobMissing(stored_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Full path for a stored name: {base_path}/{shard}/{stored_name}.
    pub fn blob_path(&self, stored_name: &str) -> PathBuf {
        let shard = Self::shard(stored_name);
        self.base_path.join(shard).join(stored_name)
    }

    /// Shard directory for a stored name (first 2 characters).
    fn shard(stored_name: &str) -> &str {
        if stored_name.len() >= 2 {
            &stored_name[..2]
        } else {
            stored_name
        }
    }

    /// Extract the file extension from a filename. "bin" when absent.
    fn extract_extension(filename: &str) -> &str {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("bin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().join("storage");

        assert!(!storage_path.exists());

        let storage = FileStorage::new(&storage_path).unwrap();

        assert!(storage_path.exists());
        assert_eq!(storage.base_path(), storage_path);
    }

    #[test]
    fn test_save_and_load() {
        let (_temp_dir, storage) = setup_storage();
        let content = b"Hello, World!";

        let stored_name = storage.save(content, "test.txt").unwrap();

        assert!(stored_name.ends_with(".txt"));
        assert!(stored_name.len() > 36);

        let loaded = storage.load(&stored_name).unwrap();
        assert_eq!(loaded, content);
    }

    #[test]
    fn test_save_extracts_extension() {
        let (_temp_dir, storage) = setup_storage();

        let stored_name = storage.save(b"data", "document.pdf").unwrap();
        assert!(stored_name.ends_with(".pdf"));

        let stored_name = storage.save(b"data", "no_extension").unwrap();
        assert!(stored_name.ends_with(".bin"));
    }

    #[test]
    fn test_save_creates_shard_directory() {
        let (_temp_dir, storage) = setup_storage();

        let stored_name = storage.save(b"data", "test.txt").unwrap();

        let shard = &stored_name[..2];
        let shard_dir = storage.base_path().join(shard);

        assert!(shard_dir.exists());
        assert!(shard_dir.is_dir());
    }

    #[test]
    fn test_load_missing_is_blob_missing() {
        let (_temp_dir, storage) = setup_storage();

        let result = storage.load("nonexistent.txt");

        assert!(matches!(result, Err(DropError::BlobMissing(_))));
    }

    #[tokio::test]
    async fn test_open_streams_blob() {
        let (_temp_dir, storage) = setup_storage();

        let stored_name = storage.save(b"stream me", "s.txt").unwrap();

        let mut file = storage.open(&stored_name).await.unwrap();
        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut file, &mut buf)
            .await
            .unwrap();
        assert_eq!(buf, b"stream me");
    }

    #[tokio::test]
    async fn test_open_missing_is_blob_missing() {
        let (_temp_dir, storage) = setup_storage();

        let result = storage.open("nonexistent.txt").await;
        assert!(matches!(result, Err(DropError::BlobMissing(_))));
    }

    #[test]
    fn test_delete() {
        let (_temp_dir, storage) = setup_storage();

        let stored_name = storage.save(b"to delete", "delete.txt").unwrap();
        assert!(storage.exists(&stored_name));

        let deleted = storage.delete(&stored_name).unwrap();
        assert!(deleted);
        assert!(!storage.exists(&stored_name));
    }

    #[test]
    fn test_delete_already_gone() {
        let (_temp_dir, storage) = setup_storage();

        let deleted = storage.delete("nonexistent.txt").unwrap();
        assert!(!deleted);
    }

    #[test]
    fn test_file_size() {
        let (_temp_dir, storage) = setup_storage();
        let content = b"Hello, World!";

        let stored_name = storage.save(content, "test.txt").unwrap();

        let size = storage.file_size(&stored_name).unwrap();
        assert_eq!(size, content.len() as u64);
    }

    #[test]
    fn test_blob_path() {
        let (_temp_dir, storage) = setup_storage();

        let stored_name = "ab12cd34-5678-90ab-cdef-123456789012.txt";
        let path = storage.blob_path(stored_name);

        assert_eq!(path, storage.base_path().join("ab").join(stored_name));
    }

    #[test]
    fn test_shard() {
        assert_eq!(FileStorage::shard("abcdef.txt"), "ab");
        assert_eq!(FileStorage::shard("12-345.bin"), "12");
        assert_eq!(FileStorage::shard("x"), "x");
        assert_eq!(FileStorage::shard(""), "");
    }

    #[test]
    fn test_extract_extension() {
        assert_eq!(FileStorage::extract_extension("test.txt"), "txt");
        assert_eq!(FileStorage::extract_extension("no_ext"), "bin");
        assert_eq!(FileStorage::extract_extension("file.tar.gz"), "gz");
        assert_eq!(FileStorage::extract_extension(".hidden"), "bin");
    }

    #[test]
    fn test_binary_content() {
        let (_temp_dir, storage) = setup_storage();

        let content: Vec<u8> = (0..=255).collect();

        let stored_name = storage.save(&content, "binary.bin").unwrap();
        let loaded = storage.load(&stored_name).unwrap();

        assert_eq!(loaded, content);
    }

    #[test]
    fn test_unicode_original_name() {
        let (_temp_dir, storage) = setup_storage();

        let stored_name = storage.save(b"data", "日本語ファイル.txt").unwrap();
        assert!(stored_name.ends_with(".txt"));
    }
}
