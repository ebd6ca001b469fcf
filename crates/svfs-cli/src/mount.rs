//! `mount [-t type] [-o opts] device mountpoint` / `umount <mountpoint>`
//! (§6, §4.5.9).

use std::sync::Arc;

use clap::Args;
use svfs_core::boot::{self, TypeRegistry};
use svfs_core::{path, FileSystem};
use svfs_core::fstab::{self, FstabEntry};
use svfs_git::GitOverlayFs;

use crate::shell::{CliError, Shell};

#[derive(Args, Debug)]
pub struct MountArgs {
    /// Filesystem type: `d1`, `r2`, `git`, `gdrive`, or any type registered
    /// externally. Required — there is no sniffing of `device`.
    #[arg(short = 't', long = "type")]
    pub fs_type: Option<String>,

    /// Comma-separated `key[=value]` options (same grammar as the fstab
    /// options column — `ref=main,depth=1`).
    #[arg(short = 'o', long = "options")]
    pub options: Option<String>,

    pub device: String,
    pub mountpoint: String,
}

/// # Errors
/// `CliError::option_needs_value` if `-t` is missing; `CliError::usage` for
/// an unregistered type; otherwise any mount/adapter-build failure.
pub async fn mount(shell: &Shell, registry: &TypeRegistry, args: MountArgs) -> Result<(), CliError> {
    let Some(fs_type) = args.fs_type else {
        return Err(CliError::option_needs_value("mount", "-t <type> is required"));
    };
    let mount_point = path::join(&shell.cwd(), &args.mountpoint);
    let options = args.options.as_deref().map(fstab::parse_options).unwrap_or_default();

    if fs_type == "git" {
        let git_ref = options.get("ref").cloned().flatten();
        let depth: u32 = options.get("depth").cloned().flatten().and_then(|v| v.parse().ok()).unwrap_or(1);
        let fs = Arc::new(GitOverlayFs::new(
            shell.user_id.clone(),
            mount_point.clone(),
            Arc::clone(&shell.bucket),
            args.device.clone(),
            git_ref,
            depth,
            None,
        ));
        fs.init().await.map_err(|e| CliError::from_fs_error("mount", e))?;
        shell
            .router
            .mount(&mount_point, "git", Arc::clone(&fs) as Arc<dyn FileSystem>)
            .map_err(|e| CliError::from_fs_error("mount", e))?;
        shell.git_mounts.register(&mount_point, Arc::clone(&fs));

        let mut entry = FstabEntry::new(args.device, mount_point, "git");
        entry = entry.with_option("ref", fs.ref_name().await).with_option("depth", depth.to_string());
        boot::append_git_fstab_entry(&shell.router, &entry).await.map_err(|e| CliError::from_fs_error("mount", e))?;
        return Ok(());
    }

    let Some(factory) = registry.get(&fs_type) else {
        return Err(CliError::usage("mount", format!("unknown filesystem type '{fs_type}'")));
    };
    let mut entry = FstabEntry::new(args.device, mount_point.clone(), fs_type.clone());
    entry.options = options;
    let adapter = factory.build(&entry).await.map_err(|e| CliError::from_fs_error("mount", e))?;
    shell.router.mount(&mount_point, fs_type, Arc::clone(&adapter)).map_err(|e| CliError::from_fs_error("mount", e))?;
    if !adapter.exists("/").await {
        adapter.mkdir("/", true).await.map_err(|e| CliError::from_fs_error("mount", e))?;
    }
    Ok(())
}

/// # Errors
/// `CliError::usage` if no mount matches `mountpoint`.
pub fn umount(shell: &Shell, mountpoint: &str) -> Result<(), CliError> {
    let mount_point = path::join(&shell.cwd(), mountpoint);
    shell.router.unmount(&mount_point).map_err(|e| CliError::from_fs_error("umount", e))?;
    shell.git_mounts.remove(&mount_point);
    Ok(())
}
