//! The mount router: path-prefix dispatch of filesystem operations onto the
//! correct adapter (§4.2).

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::FsError;
use crate::fs::{FileSystem, FsStat, ReadEncoding, RmOptions};
use crate::path::{self, is_ancestor_or_self};

/// One entry in the router's live mount set.
pub struct MountEntry {
    pub mount_point: String,
    pub fs_type: String,
    pub filesystem: Arc<dyn FileSystem>,
}

struct State {
    mounts: Vec<MountEntry>,
}

/// Composes a base filesystem with an ordered set of mounts. Not a
/// singleton: callers construct one and pass it around (§9, "Global mutable
/// state").
pub struct Router {
    base: Arc<dyn FileSystem>,
    state: Mutex<State>,
}

impl Router {
    #[must_use]
    pub fn new(base: Arc<dyn FileSystem>) -> Self {
        Self { base, state: Mutex::new(State { mounts: Vec::new() }) }
    }

    /// Register `filesystem` at `mount_point`.
    ///
    /// # Errors
    /// `Exists` if `mount_point` already holds a mount.
    pub fn mount(&self, mount_point: &str, fs_type: impl Into<String>, filesystem: Arc<dyn FileSystem>) -> Result<(), FsError> {
        let mp = path::normalize(mount_point);
        let mut state = self.state.lock().expect("router lock poisoned");
        if state.mounts.iter().any(|m| m.mount_point == mp) {
            return Err(FsError::exists("mount", mp));
        }
        state.mounts.push(MountEntry { mount_point: mp, fs_type: fs_type.into(), filesystem });
        Ok(())
    }

    /// Remove the mount at `mount_point`, dropping its adapter.
    ///
    /// # Errors
    /// `NotFound` if no mount matches.
    pub fn unmount(&self, mount_point: &str) -> Result<(), FsError> {
        let mp = path::normalize(mount_point);
        let mut state = self.state.lock().expect("router lock poisoned");
        let before = state.mounts.len();
        state.mounts.retain(|m| m.mount_point != mp);
        if state.mounts.len() == before {
            return Err(FsError::not_found("umount", mp));
        }
        Ok(())
    }

    /// The mount list, in insertion order.
    #[must_use]
    pub fn mounts(&self) -> Vec<(String, String)> {
        let state = self.state.lock().expect("router lock poisoned");
        state.mounts.iter().map(|m| (m.mount_point.clone(), m.fs_type.clone())).collect()
    }

    /// Select `(relative_path, filesystem)` for `path`: the mount whose
    /// mount point is `path` or a proper ancestor of it, with the longest
    /// prefix; falls back to the base filesystem.
    fn dispatch(&self, path: &str) -> (String, Arc<dyn FileSystem>) {
        let p = path::normalize(path);
        let state = self.state.lock().expect("router lock poisoned");
        let best = state
            .mounts
            .iter()
            .filter(|m| is_ancestor_or_self(&m.mount_point, &p))
            .max_by_key(|m| m.mount_point.len());
        match best {
            Some(mount) => (path::strip_prefix(&p, &mount.mount_point), Arc::clone(&mount.filesystem)),
            None => (p, Arc::clone(&self.base)),
        }
    }
}

#[async_trait]
impl FileSystem for Router {
    async fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.read_file_buffer(&rel).await
    }

    async fn read_file(&self, path: &str, encoding: Option<ReadEncoding>) -> Result<Vec<u8>, FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.read_file(&rel, encoding).await
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.write_file(&rel, contents).await
    }

    async fn append_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.append_file(&rel, contents).await
    }

    async fn exists(&self, path: &str) -> bool {
        let (rel, fs) = self.dispatch(path);
        fs.exists(&rel).await
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.stat(&rel).await
    }

    async fn lstat(&self, path: &str) -> Result<FsStat, FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.lstat(&rel).await
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.readdir(&rel).await
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.mkdir(&rel, recursive).await
    }

    async fn rm(&self, path: &str, options: RmOptions) -> Result<(), FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.rm(&rel, options).await
    }

    async fn cp(&self, src: &str, dest: &str, recursive: bool) -> Result<(), FsError> {
        // Cross-mount copy is not a transaction (§1 Non-goals); each side is
        // still dispatched independently through this same router.
        let (src_rel, src_fs) = self.dispatch(src);
        let (dest_rel, dest_fs) = self.dispatch(dest);
        if Arc::ptr_eq(&src_fs, &dest_fs) {
            return src_fs.cp(&src_rel, &dest_rel, recursive).await;
        }
        if recursive {
            return Err(FsError::not_supported("cp", dest));
        }
        let bytes = src_fs.read_file_buffer(&src_rel).await?;
        dest_fs.write_file(&dest_rel, &bytes).await
    }

    async fn mv(&self, src: &str, dest: &str) -> Result<(), FsError> {
        self.cp(src, dest, true).await?;
        self.rm(src, RmOptions { recursive: true, force: false }).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<(), FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.chmod(&rel, mode).await
    }

    async fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError> {
        let (rel, fs) = self.dispatch(link_path);
        fs.symlink(target, &rel).await
    }

    async fn readlink(&self, path: &str) -> Result<String, FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.readlink(&rel).await
    }

    async fn utimes(&self, path: &str, mtime: OffsetDateTime) -> Result<(), FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.utimes(&rel, mtime).await
    }

    async fn resolve_path(&self, path: &str) -> Result<String, FsError> {
        let (rel, fs) = self.dispatch(path);
        fs.resolve_path(&rel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfs::MemFs;

    #[tokio::test]
    async fn dispatches_writes_to_the_mounted_adapter() {
        let router = Router::new(Arc::new(MemFs::new()));
        let mount_fs: Arc<dyn FileSystem> = Arc::new(MemFs::new());
        router.mount("/data", "mem", Arc::clone(&mount_fs)).unwrap();
        router.write_file("/data/file.txt", b"hi").await.unwrap();
        assert_eq!(mount_fs.read_file_buffer("/file.txt").await.unwrap(), b"hi");
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let router = Router::new(Arc::new(MemFs::new()));
        let outer: Arc<dyn FileSystem> = Arc::new(MemFs::new());
        let inner: Arc<dyn FileSystem> = Arc::new(MemFs::new());
        router.mount("/mnt", "mem", Arc::clone(&outer)).unwrap();
        router.mount("/mnt/repo", "mem", Arc::clone(&inner)).unwrap();
        router.write_file("/mnt/repo/a.txt", b"x").await.unwrap();
        assert_eq!(inner.read_file_buffer("/a.txt").await.unwrap(), b"x");
        assert!(outer.read_file_buffer("/repo/a.txt").await.is_err());
    }

    #[tokio::test]
    async fn mount_twice_fails_exists() {
        let router = Router::new(Arc::new(MemFs::new()));
        router.mount("/data", "mem", Arc::new(MemFs::new())).unwrap();
        let err = router.mount("/data", "mem", Arc::new(MemFs::new())).unwrap_err();
        assert!(err.is_exists());
    }

    #[tokio::test]
    async fn unmount_missing_fails_not_found() {
        let router = Router::new(Arc::new(MemFs::new()));
        assert!(router.unmount("/nope").unwrap_err().is_not_found());
    }
}
