//! The Git repository core: clone, log, commit, push, pull, tree read, and
//! the snapshot/restore persistence boundary (§4.5.1–4.5.2, §4.6 plumbing).
//!
//! Object reads/writes and commit creation go straight through `gix`.
//! Clone, fetch, and push shell out to the `git` binary instead: `gix`
//! does not yet offer a high-level push API, and shelling out for the
//! whole network leg (rather than just push) means every clone/fetch/push
//! call speaks real smart-HTTP and can be pointed at the in-process mock
//! server (`svfs-testkit`) for tests that must not touch the network.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::process::Command;

use crate::memfs::GitMemFs;
use crate::types::{GitTreeEntry, TreeEntryType};

/// Errors from the Git repository core. Mapped to [`svfs_core::FsErrorKind`]
/// at the overlay boundary (§7: "object not found in tree" → `NotFound`;
/// everything else → `IoError`).
#[derive(Debug, thiserror::Error)]
pub enum GitRepoError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("git subprocess failed: {0}")]
    Subprocess(String),
    #[error("gix error: {0}")]
    Gix(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An optional credential supplier for network operations. A `None`
/// callback means "anonymous"; a `Some` callback's token is injected as
/// basic-auth into the remote URL for the duration of the call.
pub type AuthCallback = dyn Fn() -> Option<String> + Send + Sync;

/// Outcome of [`GitRepoCore::pull`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForwarded { from: String, to: String },
}

/// The result of [`GitRepoCore::stat_path`]: enough to answer `exists`/`stat`
/// against the committed tree without reading blob content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitPathInfo {
    pub entry_type: TreeEntryType,
    pub mode: String,
    pub size: u64,
}

/// A clone of a remote ref, backed by a real `.git` directory inside a
/// [`TempDir`] that is rebuilt from (and snapshotted back to) a
/// [`GitMemFs`] at init and commit, the two points persistence must hold.
pub struct GitRepoCore {
    workdir: TempDir,
}

fn with_auth_url(url: &str, auth: Option<&AuthCallback>) -> String {
    let Some(auth) = auth else { return url.to_owned() };
    let Some(token) = auth() else { return url.to_owned() };
    match url.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}://x-access-token:{token}@{rest}"),
        None => url.to_owned(),
    }
}

async fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<String, GitRepoError> {
    let mut cmd = Command::new("git");
    cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd.output().await?;
    if !output.status.success() {
        return Err(GitRepoError::Subprocess(format!(
            "git {}: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

fn to_gix_oid(hex: &str) -> Result<gix::ObjectId, GitRepoError> {
    gix::ObjectId::from_hex(hex.as_bytes()).map_err(|e| GitRepoError::Gix(e.to_string()))
}

impl GitRepoCore {
    /// Rebuild the working `.git` directory from a persisted snapshot
    /// (§4.5.2 step 1).
    pub fn from_snapshot(memfs: &GitMemFs) -> Result<Self, GitRepoError> {
        let workdir = tempfile::tempdir()?;
        memfs.materialize_into(workdir.path())?;
        Ok(Self { workdir })
    }

    /// Ask the remote for its default branch via a smart-HTTP info query
    /// (§4.5.2 step 2, "no ref supplied").
    pub async fn query_default_branch(url: &str, auth: Option<&AuthCallback>) -> Result<String, GitRepoError> {
        let url = with_auth_url(url, auth);
        let out = run_git(&["ls-remote", "--symref", &url, "HEAD"], None).await?;
        out.lines()
            .find_map(|line| line.strip_prefix("ref: refs/heads/").and_then(|rest| rest.split_whitespace().next()))
            .map(str::to_owned)
            .ok_or_else(|| GitRepoError::Subprocess(format!("could not determine default branch for {url}")))
    }

    /// Shallow-clone `url` at `ref_name`, single branch, no checkout, no
    /// tags, honouring `depth` (§4.5.2 step 2).
    pub async fn clone_shallow(url: &str, ref_name: &str, depth: u32, auth: Option<&AuthCallback>) -> Result<Self, GitRepoError> {
        let workdir = tempfile::tempdir()?;
        let auth_url = with_auth_url(url, auth);
        run_git(
            &[
                "clone",
                "--depth",
                &depth.to_string(),
                "--single-branch",
                "--branch",
                ref_name,
                "--no-checkout",
                "--no-tags",
                &auth_url,
                workdir.path().to_str().expect("tempdir path is valid utf8"),
            ],
            None,
        )
        .await?;
        Ok(Self { workdir })
    }

    /// Snapshot the working `.git` directory back into a [`GitMemFs`]
    /// (§4.5.2 step 2 persist, §4.5.6 step 7).
    pub fn snapshot(&self) -> Result<GitMemFs, GitRepoError> {
        Ok(GitMemFs::capture_from(self.workdir.path())?)
    }

    fn open(&self) -> Result<gix::Repository, GitRepoError> {
        gix::open(self.workdir.path()).map_err(|e| GitRepoError::Gix(e.to_string()))
    }

    /// Resolve `HEAD` to its commit OID.
    pub fn resolve_head(&self) -> Result<String, GitRepoError> {
        let repo = self.open()?;
        let id = repo.rev_parse_single("HEAD").map_err(|e| GitRepoError::Gix(e.to_string()))?;
        Ok(id.detach().to_string())
    }

    /// The committer timestamp (Unix seconds) of a commit.
    pub fn commit_mtime(&self, commit_oid: &str) -> Result<i64, GitRepoError> {
        let repo = self.open()?;
        let oid = to_gix_oid(commit_oid)?;
        let commit = repo.find_commit(oid).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
        let decoded = commit.decode().map_err(|e| GitRepoError::Gix(e.to_string()))?;
        Ok(decoded.committer().time().seconds)
    }

    /// List log entries from `commit_oid` following first-parent history,
    /// newest first, up to `limit` entries (§4.6 `git log`).
    pub fn log(&self, commit_oid: &str, limit: usize) -> Result<Vec<(String, String)>, GitRepoError> {
        let repo = self.open()?;
        let mut oid = to_gix_oid(commit_oid)?;
        let mut out = Vec::new();
        while out.len() < limit {
            let commit = repo.find_commit(oid).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
            let decoded = commit.decode().map_err(|e| GitRepoError::Gix(e.to_string()))?;
            out.push((oid.to_string(), decoded.message.to_string()));
            match decoded.parents().next() {
                Some(parent) => oid = parent,
                None => break,
            }
        }
        Ok(out)
    }

    fn find_subtree(&self, repo: &gix::Repository, commit_oid: &str, dir_path: &str) -> Result<Option<gix::ObjectId>, GitRepoError> {
        let oid = to_gix_oid(commit_oid)?;
        let commit = repo.find_commit(oid).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
        let mut current = commit.tree_id().map_err(|e| GitRepoError::Gix(e.to_string()))?.detach();
        let trimmed = dir_path.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Some(current));
        }
        for segment in trimmed.split('/') {
            let tree = repo.find_tree(current).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
            let Some(entry) = tree.iter().filter_map(Result::ok).find(|e| e.inner.filename == segment.as_bytes()) else {
                return Ok(None);
            };
            if !entry.inner.mode.is_tree() {
                return Ok(None);
            }
            current = entry.inner.oid.to_owned();
        }
        Ok(Some(current))
    }

    /// Read the direct children of `dir_path` in `commit_oid`'s tree.
    ///
    /// # Errors
    /// `NotFound` if `dir_path` does not resolve to a tree.
    pub fn read_tree(&self, commit_oid: &str, dir_path: &str) -> Result<Vec<GitTreeEntry>, GitRepoError> {
        let repo = self.open()?;
        let Some(tree_id) = self.find_subtree(&repo, commit_oid, dir_path)? else {
            return Err(GitRepoError::NotFound(dir_path.to_owned()));
        };
        let tree = repo.find_tree(tree_id).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
        let mut entries = Vec::new();
        for item in tree.iter() {
            let item = item.map_err(|e| GitRepoError::Gix(e.to_string()))?;
            let entry_type = if item.inner.mode.is_tree() {
                TreeEntryType::Tree
            } else if item.inner.mode.kind() == gix::objs::tree::EntryKind::Commit {
                TreeEntryType::Commit
            } else {
                TreeEntryType::Blob
            };
            entries.push(GitTreeEntry {
                mode: format!("{:o}", u16::from(item.inner.mode)),
                path: item.inner.filename.to_string(),
                oid: item.inner.oid.to_string(),
                entry_type,
            });
        }
        Ok(entries)
    }

    /// Look up a path inside `commit_oid`'s tree without reading blob
    /// content, for `exists`/`stat` against the committed view (§4.5.3).
    ///
    /// # Errors
    /// Any `gix` object-database failure.
    pub fn stat_path(&self, commit_oid: &str, path: &str) -> Result<Option<GitPathInfo>, GitRepoError> {
        let repo = self.open()?;
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Some(GitPathInfo { entry_type: TreeEntryType::Tree, mode: "040000".to_owned(), size: 0 }));
        }
        let (parent, name) = match trimmed.rsplit_once('/') {
            Some((p, n)) => (p, n),
            None => ("", trimmed),
        };
        let Some(tree_id) = self.find_subtree(&repo, commit_oid, parent)? else {
            return Ok(None);
        };
        let tree = repo.find_tree(tree_id).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
        let Some(entry) = tree.iter().filter_map(Result::ok).find(|e| e.inner.filename == name.as_bytes()) else {
            return Ok(None);
        };
        let mode = format!("{:o}", u16::from(entry.inner.mode));
        if entry.inner.mode.is_tree() {
            return Ok(Some(GitPathInfo { entry_type: TreeEntryType::Tree, mode, size: 0 }));
        }
        if entry.inner.mode.kind() == gix::objs::tree::EntryKind::Commit {
            return Ok(Some(GitPathInfo { entry_type: TreeEntryType::Commit, mode, size: 0 }));
        }
        let blob = repo.find_blob(entry.inner.oid.to_owned()).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
        Ok(Some(GitPathInfo { entry_type: TreeEntryType::Blob, mode, size: blob.data.len() as u64 }))
    }

    /// Read a blob's bytes and mode by its full path inside `commit_oid`'s
    /// tree.
    ///
    /// # Errors
    /// `NotFound` if the path does not resolve to a blob.
    pub fn read_blob(&self, commit_oid: &str, file_path: &str) -> Result<(Vec<u8>, String), GitRepoError> {
        let repo = self.open()?;
        let (parent, name) = match file_path.trim_matches('/').rsplit_once('/') {
            Some((p, n)) => (p, n),
            None => ("", file_path.trim_matches('/')),
        };
        let Some(tree_id) = self.find_subtree(&repo, commit_oid, parent)? else {
            return Err(GitRepoError::NotFound(file_path.to_owned()));
        };
        let tree = repo.find_tree(tree_id).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
        let Some(entry) = tree.iter().filter_map(Result::ok).find(|e| e.inner.filename == name.as_bytes()) else {
            return Err(GitRepoError::NotFound(file_path.to_owned()));
        };
        if entry.inner.mode.is_tree() {
            return Err(GitRepoError::NotFound(file_path.to_owned()));
        }
        let mut blob = repo.find_blob(entry.inner.oid.to_owned()).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
        Ok((blob.take_data(), format!("{:o}", u16::from(entry.inner.mode))))
    }

    /// Create a commit on top of `parent_oid` by applying blob upserts and
    /// path removals directly to its tree (§4.5.6): this core never
    /// checks out a real working tree — overlay writes are staged as tree
    /// edits, which is observationally identical to "materialise then
    /// `git add`" for every operation this filesystem exposes.
    ///
    /// # Errors
    /// Any `gix` object-database failure.
    pub fn commit(
        &self,
        parent_oid: &str,
        ref_name: &str,
        upserts: &[(String, Vec<u8>)],
        removals: &[String],
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<String, GitRepoError> {
        let repo = self.open()?;
        let parent = to_gix_oid(parent_oid)?;
        let parent_commit = repo.find_commit(parent).map_err(|e| GitRepoError::NotFound(e.to_string()))?;
        let base_tree_id = parent_commit.tree_id().map_err(|e| GitRepoError::Gix(e.to_string()))?;
        let base_tree = repo.find_tree(base_tree_id.detach()).map_err(|e| GitRepoError::Gix(e.to_string()))?;
        let mut editor = base_tree.edit().map_err(|e| GitRepoError::Gix(e.to_string()))?;

        for (path, bytes) in upserts {
            let blob_id = repo.write_blob(bytes.as_slice()).map_err(|e| GitRepoError::Gix(e.to_string()))?;
            editor
                .upsert(path.trim_start_matches('/'), gix::objs::tree::EntryKind::Blob, blob_id)
                .map_err(|e| GitRepoError::Gix(e.to_string()))?;
        }
        for path in removals {
            // Swallow "not in tree" — §4.5.6 step 4.
            let _ = editor.remove(path.trim_start_matches('/'));
        }
        let new_tree = editor.write().map_err(|e| GitRepoError::Gix(e.to_string()))?;

        let signature = gix::actor::Signature {
            name: author_name.into(),
            email: author_email.into(),
            time: gix::date::Time::now_local_or_utc(),
        };

        let commit_id = repo
            .commit_as(signature.clone(), signature, ref_name, message, new_tree.detach(), [parent])
            .map_err(|e| GitRepoError::Gix(e.to_string()))?;
        Ok(commit_id.detach().to_string())
    }

    /// Push the current state of `ref_name` to its remote.
    pub async fn push(&self, ref_name: &str, auth: Option<&AuthCallback>) -> Result<(), GitRepoError> {
        let remote_url = self.remote_url(auth)?;
        run_git(&["push", &remote_url, &format!("HEAD:refs/heads/{ref_name}")], Some(self.workdir.path())).await?;
        Ok(())
    }

    /// Fast-forward pull `ref_name` from its remote.
    ///
    /// # Errors
    /// `Subprocess` if the fetch/merge is rejected (e.g. non-fast-forward).
    pub async fn pull(&self, ref_name: &str, auth: Option<&AuthCallback>) -> Result<PullOutcome, GitRepoError> {
        let from = self.resolve_head()?;
        let remote_url = self.remote_url(auth)?;
        run_git(&["fetch", "--depth", "1", &remote_url, ref_name], Some(self.workdir.path())).await?;
        run_git(&["update-ref", "HEAD", "FETCH_HEAD"], Some(self.workdir.path())).await?;
        let to = self.resolve_head()?;
        if to == from {
            Ok(PullOutcome::UpToDate)
        } else {
            Ok(PullOutcome::FastForwarded { from, to })
        }
    }

    fn remote_url(&self, auth: Option<&AuthCallback>) -> Result<String, GitRepoError> {
        let repo = self.open()?;
        let remote = repo
            .find_default_remote(gix::remote::Direction::Fetch)
            .ok_or_else(|| GitRepoError::Gix("no remote configured".to_owned()))?
            .map_err(|e| GitRepoError::Gix(e.to_string()))?;
        let url = remote
            .url(gix::remote::Direction::Fetch)
            .ok_or_else(|| GitRepoError::Gix("remote has no url".to_owned()))?
            .to_string();
        Ok(with_auth_url(&url, auth))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.workdir.path()
    }

    /// The path to persist as a scratch clone root for tests/tools that
    /// need a real filesystem path rather than a [`GitMemFs`].
    #[must_use]
    pub fn scratch_path(&self) -> PathBuf {
        self.workdir.path().to_path_buf()
    }
}
