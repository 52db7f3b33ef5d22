//! Artifact storage backends
//!
//! A backend only knows how to answer "is there a blob under this name" and
//! "give me its bytes". Naming lives in the resolver, decoding and caching
//! in the store.

use dashmap::DashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Storage a model store reads artifacts from
pub trait ArtifactBackend: Send + Sync {
    /// Whether an artifact is stored under `name`
    fn exists(&self, name: &str) -> bool;

    /// Artifact bytes, `Ok(None)` when nothing is stored under `name`
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Artifacts stored as files in a single directory
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ArtifactBackend for FsBackend {
    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let path = self.path(name);
        // Only regular files are artifacts, matching `exists`
        if path.exists() && !path.is_file() {
            return Ok(None);
        }
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// In-memory artifact registry, used by tests and embedders
#[derive(Debug, Default)]
pub struct MemoryBackend {
    artifacts: DashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) an artifact
    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.artifacts.insert(name.into(), bytes.into());
    }

    pub fn remove(&self, name: &str) -> bool {
        self.artifacts.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactBackend for MemoryBackend {
    fn exists(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.artifacts.get(name).map(|bytes| bytes.clone()))
    }

    fn describe(&self) -> String {
        format!("memory ({} artifacts)", self.artifacts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_backend_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path());
        assert!(!backend.exists("diabetes_SVM.onnx"));
        assert!(backend.read("diabetes_SVM.onnx").unwrap().is_none());
    }

    #[test]
    fn test_fs_backend_reads_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("diabetes_SVM.json"), b"{}").unwrap();
        let backend = FsBackend::new(dir.path());
        assert!(backend.exists("diabetes_SVM.json"));
        assert_eq!(backend.read("diabetes_SVM.json").unwrap().unwrap(), b"{}");
    }

    #[test]
    fn test_fs_backend_directory_is_not_an_artifact() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested.onnx")).unwrap();
        let backend = FsBackend::new(dir.path());
        assert!(!backend.exists("nested.onnx"));
        assert!(backend.read("nested.onnx").unwrap().is_none());
    }

    #[test]
    fn test_memory_backend_insert_remove() {
        let backend = MemoryBackend::new();
        backend.insert("a", b"1".to_vec());
        assert!(backend.exists("a"));
        assert_eq!(backend.len(), 1);
        assert!(backend.remove("a"));
        assert!(backend.read("a").unwrap().is_none());
        assert!(backend.is_empty());
    }
}
