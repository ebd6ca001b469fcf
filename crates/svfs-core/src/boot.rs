//! Two-phase boot: bring up `/etc`, read the fstab through the router
//! itself, migrate legacy configurations, then mount everything else
//! (§4.4).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FsError;
use crate::fs::{FileSystem, RmOptions};
use crate::fstab::{self, FstabEntry};
use crate::router::Router;

const FSTAB_PATH: &str = "/etc/fstab";

/// Builds a concrete adapter from a parsed [`FstabEntry`]. Registered per
/// `fs_type` in a [`TypeRegistry`] by the CLI wiring layer, which is where
/// the concrete adapter crates (`svfs-store`, `svfs-git`) are known — this
/// keeps `svfs-core` free of a dependency on them.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn build(&self, entry: &FstabEntry) -> Result<Arc<dyn FileSystem>, FsError>;
}

/// Maps an fstab `type` column to the [`AdapterFactory`] that knows how to
/// construct it.
#[derive(Default)]
pub struct TypeRegistry {
    factories: BTreeMap<String, Arc<dyn AdapterFactory>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fs_type: impl Into<String>, factory: Arc<dyn AdapterFactory>) {
        self.factories.insert(fs_type.into(), factory);
    }

    #[must_use]
    pub fn get(&self, fs_type: &str) -> Option<Arc<dyn AdapterFactory>> {
        self.factories.get(fs_type).cloned()
    }
}

/// Boot a [`Router`] from persisted fstab state, using the router itself as
/// the medium for reading that state (§4.4).
///
/// # Errors
/// Only a failure to mount `/etc` itself is fatal; every other per-entry
/// mount failure is logged and skipped.
pub async fn boot(router: &Router, etc_adapter: Arc<dyn FileSystem>, registry: &TypeRegistry) -> Result<(), FsError> {
    // Phase 1 — /etc bootstrap.
    router.mount("/etc", "d1", Arc::clone(&etc_adapter))?;
    if !etc_adapter.exists("/").await {
        etc_adapter.mkdir("/", true).await?;
    }

    // Phase 2 — fstab acquisition.
    let mut entries = match router.read_file_buffer(FSTAB_PATH).await {
        Ok(bytes) => fstab::parse(&String::from_utf8_lossy(&bytes))?,
        Err(e) if e.is_not_found() => {
            let default_text = fstab::default_fstab();
            router.write_file(FSTAB_PATH, default_text.as_bytes()).await?;
            fstab::default_entries()
        }
        Err(e) => return Err(e),
    };

    // Phase 3 — legacy migration: no current mount types present means this
    // is a pre-upgrade fstab. Rewrite to the current defaults, preserving
    // any `git` entries so installed remotes aren't lost.
    let has_current_types = entries.iter().any(|e| e.fs_type == "d1" || e.fs_type == "r2");
    if !has_current_types {
        let preserved_git: Vec<FstabEntry> = entries.iter().filter(|e| e.fs_type == "git").cloned().collect();
        let mut rewritten = fstab::default_entries();
        rewritten.extend(preserved_git);
        let text = fstab::serialize(&rewritten);
        router.write_file(FSTAB_PATH, text.as_bytes()).await?;
        entries = fstab::parse(&text)?;
    }

    // Phase 4 — mount the rest.
    for entry in &entries {
        if entry.mount_point == "/etc" {
            continue;
        }
        let Some(factory) = registry.get(&entry.fs_type) else {
            tracing::warn!(fs_type = %entry.fs_type, mount_point = %entry.mount_point, "no adapter registered for fstab entry, skipping");
            continue;
        };
        match factory.build(entry).await {
            Ok(adapter) => {
                if let Err(e) = router.mount(&entry.mount_point, entry.fs_type.clone(), Arc::clone(&adapter)) {
                    tracing::warn!(mount_point = %entry.mount_point, error = %e, "failed to register mount, skipping");
                    continue;
                }
                if !adapter.exists("/").await {
                    if let Err(e) = adapter.mkdir("/", true).await {
                        tracing::warn!(mount_point = %entry.mount_point, error = %e, "failed to ensure mount root exists");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(mount_point = %entry.mount_point, fs_type = %entry.fs_type, error = %e, "mount failed, continuing boot");
            }
        }
    }

    Ok(())
}

/// Append a `git` fstab entry for a freshly mounted repository, unless an
/// entry for the same mount point already exists. Used by `mount -t git`
/// and `clone` (§4.5.9).
pub async fn append_git_fstab_entry(router: &Router, entry: &FstabEntry) -> Result<(), FsError> {
    let mut entries = match router.read_file_buffer(FSTAB_PATH).await {
        Ok(bytes) => fstab::parse(&String::from_utf8_lossy(&bytes))?,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e),
    };
    if entries.iter().any(|e| e.mount_point == entry.mount_point) {
        return Ok(());
    }
    entries.push(entry.clone());
    let text = fstab::serialize(&entries);
    router.rm(FSTAB_PATH, RmOptions { recursive: false, force: true }).await?;
    router.write_file(FSTAB_PATH, text.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfs::MemFs;

    struct MemAdapterFactory;

    #[async_trait]
    impl AdapterFactory for MemAdapterFactory {
        async fn build(&self, _entry: &FstabEntry) -> Result<Arc<dyn FileSystem>, FsError> {
            Ok(Arc::new(MemFs::new()))
        }
    }

    fn registry() -> TypeRegistry {
        let mut r = TypeRegistry::new();
        r.register("d1", Arc::new(MemAdapterFactory));
        r.register("r2", Arc::new(MemAdapterFactory));
        r
    }

    #[tokio::test]
    async fn default_fstab_boot() {
        let router = Router::new(Arc::new(MemFs::new()));
        let etc: Arc<dyn FileSystem> = Arc::new(MemFs::new());
        boot(&router, etc, &registry()).await.unwrap();
        let text = String::from_utf8(router.read_file_buffer("/etc/fstab").await.unwrap()).unwrap();
        assert_eq!(text, fstab::default_fstab());
    }

    #[tokio::test]
    async fn legacy_migration_preserves_git_mounts() {
        let router = Router::new(Arc::new(MemFs::new()));
        let etc: Arc<dyn FileSystem> = Arc::new(MemFs::new());
        etc.mkdir("/", true).await.unwrap();
        etc.write_file(
            "/fstab",
            b"none /etc agentfs defaults 0 0\nhttps://example/x /mnt/repo git ref=main 0 0\n",
        )
        .await
        .unwrap();

        boot(&router, etc, &registry()).await.unwrap();

        let text = String::from_utf8(router.read_file_buffer("/etc/fstab").await.unwrap()).unwrap();
        assert!(!text.contains("agentfs"));
        assert!(text.contains("d1"));
        assert!(text.contains("r2"));
        let git_lines: Vec<&str> = text.lines().filter(|l| l.contains("git")).collect();
        assert_eq!(git_lines.len(), 1);
        assert!(git_lines[0].contains("/mnt/repo"));
    }
}
