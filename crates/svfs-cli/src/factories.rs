//! [`AdapterFactory`] implementations wiring fstab `type` columns to
//! concrete adapters, used both by [`svfs_core::boot::boot`] and by the
//! `mount` command for types other than `git` (§4.4, §6).

use std::sync::Arc;

use async_trait::async_trait;
use svfs_core::boot::AdapterFactory;
use svfs_core::fstab::FstabEntry;
use svfs_core::{FileSystem, FsError};
use svfs_git::GitOverlayFs;
use svfs_store::{BlobBucket, D1Adapter, R2Adapter};

use crate::shell::GitMounts;

/// Builds a fresh in-process [`D1Adapter`] per entry, scoped to the
/// user whose session this factory was wired for.
pub struct D1Factory {
    pub user_id: String,
}

#[async_trait]
impl AdapterFactory for D1Factory {
    async fn build(&self, _entry: &FstabEntry) -> Result<Arc<dyn FileSystem>, FsError> {
        Ok(Arc::new(D1Adapter::new(self.user_id.clone())))
    }
}

/// Builds an [`R2Adapter`] over the session's shared blob bucket.
pub struct R2Factory {
    pub bucket: Arc<dyn BlobBucket>,
}

#[async_trait]
impl AdapterFactory for R2Factory {
    async fn build(&self, _entry: &FstabEntry) -> Result<Arc<dyn FileSystem>, FsError> {
        Ok(Arc::new(R2Adapter::new(Arc::clone(&self.bucket))))
    }
}

/// Builds a [`GitOverlayFs`] from a persisted fstab entry (`device` = the
/// remote URL, `options.ref`/`options.depth` round-tripped by
/// [`svfs_core::boot::append_git_fstab_entry`]), registering it into the
/// session's [`GitMounts`] so restored mounts are reachable by the `git`
/// command surface the same as freshly cloned ones (§4.5.9, §4.6).
pub struct GitFactory {
    pub user_id: String,
    pub bucket: Arc<dyn BlobBucket>,
    pub git_mounts: Arc<GitMounts>,
}

#[async_trait]
impl AdapterFactory for GitFactory {
    async fn build(&self, entry: &FstabEntry) -> Result<Arc<dyn FileSystem>, FsError> {
        let git_ref = entry.options.get("ref").cloned().flatten();
        let depth: u32 = entry.options.get("depth").cloned().flatten().and_then(|v| v.parse().ok()).unwrap_or(1);
        let fs = Arc::new(GitOverlayFs::new(
            self.user_id.clone(),
            entry.mount_point.clone(),
            Arc::clone(&self.bucket),
            entry.device.clone(),
            git_ref,
            depth,
            None,
        ));
        fs.init().await?;
        self.git_mounts.register(&entry.mount_point, Arc::clone(&fs));
        Ok(fs as Arc<dyn FileSystem>)
    }
}
