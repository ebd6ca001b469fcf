//! Library surface wiring the filesystem core, the Git overlay, and the
//! storage adapters into a bootable [`App`] — the `svfs` binary is a thin
//! CLI shell around this.

pub mod config;
pub mod telemetry;

use std::sync::Arc;

use svfs_cli::factories::{D1Factory, GitFactory, R2Factory};
use svfs_cli::shell::{GitMounts, Shell};
use svfs_core::boot::{self, TypeRegistry};
use svfs_core::memfs::MemFs;
use svfs_core::{FileSystem, Router};
use svfs_store::{D1Adapter, HttpBlobBucket};

pub use config::Config;

/// Everything a command dispatch needs: the live router/session (`shell`)
/// and the type registry new `mount` invocations consult.
pub struct App {
    pub shell: Shell,
    pub registry: TypeRegistry,
}

/// Wire the adapter factories, boot the router from persisted fstab state,
/// and return a ready-to-use [`App`] (§4.4).
///
/// # Errors
/// Only a failure to mount `/etc` itself is fatal; per-entry mount
/// failures during boot are logged and skipped by [`boot::boot`].
pub async fn bootstrap(config: &Config) -> Result<App, svfs_core::FsError> {
    let bucket: Arc<dyn svfs_store::BlobBucket> =
        Arc::new(HttpBlobBucket::new(config.r2_base_url.clone(), config.r2_token.clone()));
    let git_mounts = Arc::new(GitMounts::new());

    let mut registry = TypeRegistry::new();
    registry.register("d1", Arc::new(D1Factory { user_id: config.user_id.clone() }));
    registry.register("r2", Arc::new(R2Factory { bucket: Arc::clone(&bucket) }));
    registry.register(
        "git",
        Arc::new(GitFactory { user_id: config.user_id.clone(), bucket: Arc::clone(&bucket), git_mounts: Arc::clone(&git_mounts) }),
    );

    let router = Arc::new(Router::new(Arc::new(MemFs::new())));
    let etc_adapter: Arc<dyn FileSystem> = Arc::new(D1Adapter::new(config.user_id.clone()));
    boot::boot(&router, etc_adapter, &registry).await?;

    let shell = Shell::new(Arc::clone(&router), git_mounts, bucket, config.user_id.clone());
    Ok(App { shell, registry })
}
