//! The minimal filesystem the Git implementation's object database lives
//! in: a hash map of file contents plus a set of directory paths,
//! satisfying the round-trip law of §3 (`restore(snapshot(fs)) ≡ fs`).
//!
//! `gix`'s plumbing expects a real directory on disk, so [`GitMemFs`] is
//! paired with a [`tempfile::TempDir`] in [`crate::repo::GitRepoCore`]:
//! `materialize_into` writes this structure onto disk before `gix` touches
//! it, and `capture_from` reads the directory back into this structure
//! afterwards, at the two points persistence must round-trip: init (§4.5.2)
//! and commit (§4.5.6). See `DESIGN.md` for the rationale.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use base64::Engine as _;

use crate::types::PackSnapshot;

/// The in-memory object-database filesystem: keys are paths relative to the
/// repository's `.git` directory, values are raw bytes, plus the set of
/// directory paths.
#[derive(Clone, Debug, Default)]
pub struct GitMemFs {
    files: HashMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl GitMemFs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialise to the `pack.json` shape (§3).
    #[must_use]
    pub fn snapshot(&self) -> PackSnapshot {
        PackSnapshot {
            files: self
                .files
                .iter()
                .map(|(path, bytes)| (path.clone(), base64::engine::general_purpose::STANDARD.encode(bytes)))
                .collect(),
            dirs: self.dirs.iter().cloned().collect(),
        }
    }

    /// Restore from a `pack.json` document. `restore(snapshot(fs)) == fs`.
    ///
    /// # Errors
    /// If any file's content is not valid base64.
    pub fn restore(snapshot: &PackSnapshot) -> Result<Self, base64::DecodeError> {
        let mut files = HashMap::with_capacity(snapshot.files.len());
        for (path, encoded) in &snapshot.files {
            files.insert(path.clone(), base64::engine::general_purpose::STANDARD.decode(encoded)?);
        }
        Ok(Self { files, dirs: snapshot.dirs.iter().cloned().collect() })
    }

    /// Write every file and directory of this structure onto a real
    /// filesystem rooted at `root` (typically a fresh [`tempfile::TempDir`]).
    ///
    /// # Errors
    /// Any I/O error creating directories or writing files.
    pub fn materialize_into(&self, root: &Path) -> std::io::Result<()> {
        for dir in &self.dirs {
            std::fs::create_dir_all(root.join(dir.trim_start_matches('/')))?;
        }
        for (path, bytes) in &self.files {
            let full = root.join(path.trim_start_matches('/'));
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, bytes)?;
        }
        Ok(())
    }

    /// Walk a real directory tree rooted at `root` and capture it into a
    /// fresh [`GitMemFs`].
    ///
    /// # Errors
    /// Any I/O error reading the directory tree.
    pub fn capture_from(root: &Path) -> std::io::Result<Self> {
        let mut fs = Self::new();
        fs.capture_recursive(root, root)?;
        Ok(fs)
    }

    fn capture_recursive(&mut self, root: &Path, dir: &Path) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let rel = format!("/{}", path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"));
            if entry.file_type()?.is_dir() {
                self.dirs.insert(rel);
                self.capture_recursive(root, &path)?;
            } else {
                self.files.insert(rel, std::fs::read(&path)?);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_restore_round_trip() {
        let mut fs = GitMemFs::new();
        fs.dirs.insert("/objects".to_owned());
        fs.files.insert("/HEAD".to_owned(), b"ref: refs/heads/main\n".to_vec());
        let restored = GitMemFs::restore(&fs.snapshot()).unwrap();
        assert_eq!(restored.files, fs.files);
        assert_eq!(restored.dirs, fs.dirs);
    }

    #[test]
    fn materialize_then_capture_round_trip() {
        let mut fs = GitMemFs::new();
        fs.dirs.insert("/objects/ab".to_owned());
        fs.files.insert("/HEAD".to_owned(), b"ref: refs/heads/main\n".to_vec());
        let tmp = tempfile::tempdir().unwrap();
        fs.materialize_into(tmp.path()).unwrap();
        let captured = GitMemFs::capture_from(tmp.path()).unwrap();
        assert_eq!(captured.files.get("/HEAD"), fs.files.get("/HEAD"));
        assert!(captured.dirs.contains("/objects"));
        assert!(captured.dirs.contains("/objects/ab"));
    }
}
