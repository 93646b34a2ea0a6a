use crate::common::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved locations of everything facegate persists. All storage
/// operations take this by reference; the process working directory is
/// never changed.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join("faces"))?;
        fs::create_dir_all(root.join("model"))?;
        fs::create_dir_all(root.join("accounts"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// One subdirectory per enrolled person, named by PersonDirectoryKey.
    pub fn corpus_dir(&self) -> PathBuf {
        self.root.join("faces")
    }

    pub fn transform_path(&self) -> PathBuf {
        self.root.join("model").join("pca.bin")
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.root.join("model").join("svc.bin")
    }

    pub fn name_map_path(&self) -> PathBuf {
        self.root.join("mapping.json")
    }

    pub fn accounts_dir(&self) -> PathBuf {
        self.root.join("accounts")
    }
}

/// Write via a temp file in the target directory, then rename. A reader
/// never observes a half-written artifact.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path().join("data")).unwrap();
        assert!(layout.corpus_dir().is_dir());
        assert!(layout.accounts_dir().is_dir());
        assert!(layout.transform_path().parent().unwrap().is_dir());
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!path.with_extension("tmp").exists());
    }
}
