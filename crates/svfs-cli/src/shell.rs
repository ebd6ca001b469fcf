//! Shell-session context: the router, the typed Git-mount registry, and
//! `-C`/cwd handling shared by every command in this crate.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use svfs_core::{path, FsError, Router};
use svfs_git::GitOverlayFs;
use svfs_store::BlobBucket;

/// A command-surface error: `command: message`, carrying the Git-convention
/// exit code it should map to (§6, §7).
#[derive(Debug)]
pub struct CliError {
    pub command: &'static str,
    pub exit_code: i32,
    pub message: String,
}

impl CliError {
    /// Exit 1 — usage error (unknown subcommand, bad argument combination).
    #[must_use]
    pub fn usage(command: &'static str, message: impl Into<String>) -> Self {
        Self { command, exit_code: 1, message: message.into() }
    }

    /// Exit 128 — fatal (not a git repository, corrupted mount state).
    #[must_use]
    pub fn fatal(command: &'static str, message: impl Into<String>) -> Self {
        Self { command, exit_code: 128, message: message.into() }
    }

    /// Exit 129 — an option that requires a value was given none.
    #[must_use]
    pub fn option_needs_value(command: &'static str, message: impl Into<String>) -> Self {
        Self { command, exit_code: 129, message: message.into() }
    }

    /// Wrap an [`FsError`] as a usage-level command failure.
    #[must_use]
    pub fn from_fs_error(command: &'static str, err: FsError) -> Self {
        Self::usage(command, err.to_string())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.command, self.message)
    }
}

impl std::error::Error for CliError {}

/// Typed lookup of mounted [`GitOverlayFs`] instances by mount point,
/// mirroring the router's own longest-prefix dispatch (§4.2, §4.6). The
/// router only stores type-erased `Arc<dyn FileSystem>`, so `git` commands
/// that need `status`/`commit`/`push`/... keep this parallel registry
/// in step with every `mount -t git` / `clone` / `umount`.
#[derive(Default)]
pub struct GitMounts {
    entries: Mutex<BTreeMap<String, Arc<GitOverlayFs>>>,
}

impl GitMounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, mount_point: &str, fs: Arc<GitOverlayFs>) {
        self.entries.lock().expect("git mounts lock poisoned").insert(path::normalize(mount_point), fs);
    }

    pub fn remove(&self, mount_point: &str) {
        self.entries.lock().expect("git mounts lock poisoned").remove(&path::normalize(mount_point));
    }

    /// The `git` mount whose mount point is `path` or a proper ancestor of
    /// it, with the longest prefix — same precedence rule as [`Router`].
    #[must_use]
    pub fn resolve(&self, at: &str) -> Option<(String, Arc<GitOverlayFs>)> {
        let p = path::normalize(at);
        let entries = self.entries.lock().expect("git mounts lock poisoned");
        entries
            .iter()
            .filter(|(mp, _)| path::is_ancestor_or_self(mp, &p))
            .max_by_key(|(mp, _)| mp.len())
            .map(|(mp, fs)| (mp.clone(), Arc::clone(fs)))
    }
}

/// Per-session state shared across `mount`/`umount`/`git` invocations: the
/// live router, the Git-mount registry, the blob bucket new Git mounts
/// persist into, and the shell's current directory.
pub struct Shell {
    pub router: Arc<Router>,
    pub git_mounts: Arc<GitMounts>,
    pub bucket: Arc<dyn BlobBucket>,
    pub user_id: String,
    cwd: Mutex<String>,
}

impl Shell {
    #[must_use]
    pub fn new(router: Arc<Router>, git_mounts: Arc<GitMounts>, bucket: Arc<dyn BlobBucket>, user_id: impl Into<String>) -> Self {
        Self { router, git_mounts, bucket, user_id: user_id.into(), cwd: Mutex::new("/".to_owned()) }
    }

    #[must_use]
    pub fn cwd(&self) -> String {
        self.cwd.lock().expect("shell cwd lock poisoned").clone()
    }

    pub fn set_cwd(&self, at: &str) {
        *self.cwd.lock().expect("shell cwd lock poisoned") = path::normalize(at);
    }

    /// Fold repeated `-C <path>` flags against the shell's current
    /// directory, the way `git -C a -C b <cmd>` stacks like repeated `cd`
    /// (§4.6).
    #[must_use]
    pub fn resolve_cwd(&self, dash_c: &[String]) -> String {
        dash_c.iter().fold(self.cwd(), |cur, next| path::join(&cur, next))
    }

    /// The `git` mount covering `at`, or the exit-128 "not a git
    /// repository" error every subcommand but `clone` requires (§4.6).
    pub fn require_git_mount(&self, at: &str) -> Result<(String, Arc<GitOverlayFs>), CliError> {
        self.git_mounts.resolve(at).ok_or_else(|| CliError::fatal("git", "not a git repository"))
    }
}
