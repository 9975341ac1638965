// Prize Draw Engine - Prize artifact storage
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::clock::UnixMillis;
use crate::utils;

/// Storage owning the prize artifact bytes. The engine only ever asks it to
/// let go of references it no longer tracks.
pub trait ArtifactStore: Send + Sync {
    /// Drop the stored artifact. Releasing something already gone is not an error.
    fn release(&self, reference: &str) -> io::Result<()>;
}

/// Keeps nothing, releases nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullArtifactStore;

impl ArtifactStore for NullArtifactStore {
    fn release(&self, _reference: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Artifacts stored as files under one directory
#[derive(Debug, Clone)]
pub struct DiskArtifactStore {
    root: PathBuf,
}

impl DiskArtifactStore {
    /// Open the store, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Write an upload and return its reference (the stored file name)
    pub fn store(&self, original_name: &str, bytes: &[u8], now: UnixMillis) -> io::Result<String> {
        let reference = utils::stored_file_name(now, original_name);
        fs::write(self.root.join(&reference), bytes)?;
        Ok(reference)
    }

    /// Location of a stored artifact, for serving it
    pub fn path_for(&self, reference: &str) -> io::Result<PathBuf> {
        // References are bare file names produced by `store`
        let name = Path::new(reference);
        if name.components().count() != 1 || name.file_name().is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid artifact reference {reference:?}"),
            ));
        }
        Ok(self.root.join(name))
    }
}

impl ArtifactStore for DiskArtifactStore {
    fn release(&self, reference: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(reference)?) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "prize-draw-artifacts-{}-{}",
            tag,
            std::process::id()
        ))
    }

    #[test]
    fn test_store_then_release() {
        let dir = scratch_dir("release");
        let store = DiskArtifactStore::open(&dir).unwrap();

        let reference = store.store("clip one.mp4", b"frames", 1_000).unwrap();
        assert!(reference.starts_with("1000_"));
        assert!(reference.ends_with("_clip one.mp4"));

        let path = store.path_for(&reference).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"frames");

        store.release(&reference).unwrap();
        assert!(!path.exists());

        // Second release is a no-op
        store.release(&reference).unwrap();

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_rejects_path_like_references() {
        let dir = scratch_dir("paths");
        let store = DiskArtifactStore::open(&dir).unwrap();

        assert!(store.path_for("../outside").is_err());
        assert!(store.path_for("a/b").is_err());
        assert!(store.release("..").is_err());

        let _ = fs::remove_dir_all(dir);
    }
}
