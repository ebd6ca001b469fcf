use std::sync::Arc;

use clap::Args;
use svfs_core::boot;
use svfs_core::fstab::FstabEntry;
use svfs_core::{path, FileSystem};
use svfs_git::GitOverlayFs;

use crate::shell::{CliError, Shell};

#[derive(Args, Debug)]
pub struct CloneArgs {
    pub url: String,
    /// Defaults to the last path segment of `url` with a trailing `.git`
    /// stripped (same rule the real `git clone` uses for its target dir).
    pub directory: Option<String>,
    #[arg(long)]
    pub branch: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub depth: u32,
}

fn default_directory(url: &str) -> String {
    let last = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    last.strip_suffix(".git").unwrap_or(last).to_owned()
}

/// # Errors
/// The underlying mount/init failure, or `CliError::usage` if `at` already
/// has a `git` mount at the resolved mount point.
pub async fn run(shell: &Shell, at: &str, args: CloneArgs) -> Result<String, CliError> {
    let dir = args.directory.unwrap_or_else(|| default_directory(&args.url));
    let mount_point = path::join(at, &dir);
    if shell.git_mounts.resolve(&mount_point).is_some_and(|(mp, _)| mp == mount_point) {
        return Err(CliError::usage("clone", format!("'{mount_point}' already has a git mount")));
    }

    let fs = Arc::new(GitOverlayFs::new(
        shell.user_id.clone(),
        mount_point.clone(),
        Arc::clone(&shell.bucket),
        args.url.clone(),
        args.branch,
        args.depth,
        None,
    ));
    fs.init().await.map_err(|e| CliError::from_fs_error("clone", e))?;
    shell
        .router
        .mount(&mount_point, "git", Arc::clone(&fs) as Arc<dyn FileSystem>)
        .map_err(|e| CliError::from_fs_error("clone", e))?;
    shell.git_mounts.register(&mount_point, Arc::clone(&fs));

    let entry = FstabEntry::new(args.url, mount_point.clone(), "git")
        .with_option("ref", fs.ref_name().await)
        .with_option("depth", args.depth.to_string());
    if let Err(e) = boot::append_git_fstab_entry(&shell.router, &entry).await {
        // Don't leave the router holding a mount the fstab doesn't know
        // about (§7: clone's failure path unmounts the partial mount).
        let _ = shell.router.unmount(&mount_point);
        shell.git_mounts.remove(&mount_point);
        return Err(CliError::from_fs_error("clone", e));
    }

    Ok(format!("Cloned into '{mount_point}'"))
}
