//! The Git overlay filesystem (§4.5): a shallow clone's committed tree,
//! overlaid with pending writes and a deletion tombstone set, all of it
//! persisted to a blob store so a mount survives process recycling.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use svfs_core::{FileSystem, FsError, FsStat, RmOptions};
use svfs_store::BlobBucket;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::memfs::GitMemFs;
use crate::repo::{AuthCallback, GitRepoCore, PullOutcome};
use crate::types::{GitMetadata, GitStatus, GitTreeEntry, TreeEntryType};

const GIT_PREFIX: &str = "/.git";
const DIR_MARKER: &str = ".keep";

fn is_reserved(path: &str) -> bool {
    path == GIT_PREFIX || path.starts_with("/.git/")
}

fn perm_bits(mode_octal: &str) -> u32 {
    u32::from_str_radix(mode_octal, 8).unwrap_or(0o100_644) & 0o777
}

/// `path` is logically deleted iff it or any of its ancestors is in the
/// tombstone set (§3, "Deletion set"). The recursive form of `rm` only
/// keeps the top-level tombstone and relies on this ancestor subsumption
/// at read time (§4.5.4).
fn is_logically_deleted(deleted: &BTreeSet<String>, path: &str) -> bool {
    deleted.iter().any(|d| svfs_core::path::is_ancestor_or_self(d, path))
}

struct GitState {
    initialized: bool,
    repo: Option<GitRepoCore>,
    commit_oid: String,
    remote_oid: String,
    git_ref: String,
    commit_mtime: i64,
    deleted: BTreeSet<String>,
    tree_cache: HashMap<String, Vec<GitTreeEntry>>,
}

impl GitState {
    fn empty() -> Self {
        Self {
            initialized: false,
            repo: None,
            commit_oid: String::new(),
            remote_oid: String::new(),
            git_ref: String::new(),
            commit_mtime: 0,
            deleted: BTreeSet::new(),
            tree_cache: HashMap::new(),
        }
    }
}

/// A mounted Git ref, backed by a shallow clone plus a write-overlay blob
/// store. One instance per `(userId, mountPoint)` pair (§4.5.1).
pub struct GitOverlayFs {
    user_id: String,
    mount_point: String,
    bucket: Arc<dyn BlobBucket>,
    url: String,
    requested_ref: Option<String>,
    depth: u32,
    auth: Option<Arc<AuthCallback>>,
    state: Mutex<GitState>,
}

impl GitOverlayFs {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        mount_point: impl Into<String>,
        bucket: Arc<dyn BlobBucket>,
        url: impl Into<String>,
        requested_ref: Option<String>,
        depth: u32,
        auth: Option<Arc<AuthCallback>>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            mount_point: mount_point.into(),
            bucket,
            url: url.into(),
            requested_ref,
            depth,
            auth,
            state: Mutex::new(GitState::empty()),
        }
    }

    fn base_prefix(&self) -> String {
        format!("{}{}", self.user_id, self.mount_point)
    }

    fn overlay_key(&self, path: &str) -> String {
        format!("{}{}", self.base_prefix(), path)
    }

    fn git_key(&self, name: &str) -> String {
        format!("{}{GIT_PREFIX}/{name}", self.base_prefix())
    }

    fn dir_marker_key(&self, path: &str) -> String {
        format!("{}/{DIR_MARKER}", self.overlay_key(path).trim_end_matches('/'))
    }

    fn auth_ref(&self) -> Option<&AuthCallback> {
        self.auth.as_deref()
    }

    async fn read_meta(&self) -> Result<Option<GitMetadata>, FsError> {
        let Some(bytes) = self.bucket.get(&self.git_key("meta.json")).await? else { return Ok(None) };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| FsError::io("open", "/.git/meta.json", e))
    }

    async fn write_meta(&self, meta: &GitMetadata) -> Result<(), FsError> {
        let bytes = serde_json::to_vec(meta).map_err(|e| FsError::io("write", "/.git/meta.json", e))?;
        self.bucket.put(&self.git_key("meta.json"), &bytes).await
    }

    async fn write_pack(&self, repo: &GitRepoCore) -> Result<(), FsError> {
        let memfs = repo.snapshot().map_err(|e| FsError::io("write", "/.git/pack.json", e))?;
        let bytes = serde_json::to_vec(&memfs.snapshot()).map_err(|e| FsError::io("write", "/.git/pack.json", e))?;
        self.bucket.put(&self.git_key("pack.json"), &bytes).await
    }

    /// Idempotent: first successful call restores from the overlay or
    /// performs a fresh clone; later calls are no-ops. A failed attempt
    /// leaves no state behind, so a retry starts clean (§4.5.2).
    pub async fn init(&self) -> Result<(), FsError> {
        let mut state = self.state.lock().await;
        if state.initialized {
            return Ok(());
        }

        if let Some(meta) = self.read_meta().await? {
            if meta.depth == self.depth {
                let pack_bytes = self
                    .bucket
                    .get(&self.git_key("pack.json"))
                    .await?
                    .ok_or_else(|| FsError::io("open", "/.git/pack.json", std::io::Error::other("meta present without pack")))?;
                let snapshot = serde_json::from_slice(&pack_bytes).map_err(|e| FsError::io("open", "/.git/pack.json", e))?;
                let memfs = GitMemFs::restore(&snapshot).map_err(|e| FsError::io("open", "/.git/pack.json", e))?;
                let repo = GitRepoCore::from_snapshot(&memfs).map_err(|e| FsError::io("open", &self.mount_point, e))?;
                state.repo = Some(repo);
                state.commit_oid = meta.commit_oid;
                state.remote_oid = meta.remote_oid;
                state.git_ref = meta.git_ref;
                state.commit_mtime = meta.commit_mtime;
                state.deleted = meta.deleted.into_iter().collect();
                state.initialized = true;
                return Ok(());
            }
        }

        let ref_name = match &self.requested_ref {
            Some(r) => r.clone(),
            None => GitRepoCore::query_default_branch(&self.url, self.auth_ref())
                .await
                .map_err(|e| FsError::io("mount", &self.mount_point, e))?,
        };
        let repo = GitRepoCore::clone_shallow(&self.url, &ref_name, self.depth, self.auth_ref())
            .await
            .map_err(|e| FsError::io("mount", &self.mount_point, e))?;
        let commit_oid = repo.resolve_head().map_err(|e| FsError::io("mount", &self.mount_point, e))?;
        let commit_mtime = repo.commit_mtime(&commit_oid).map_err(|e| FsError::io("mount", &self.mount_point, e))?;

        self.write_pack(&repo).await?;
        self.write_meta(&GitMetadata {
            commit_oid: commit_oid.clone(),
            remote_oid: commit_oid.clone(),
            git_ref: ref_name.clone(),
            url: self.url.clone(),
            commit_mtime,
            deleted: Vec::new(),
            depth: self.depth,
        })
        .await?;

        state.repo = Some(repo);
        state.commit_oid = commit_oid.clone();
        state.remote_oid = commit_oid;
        state.git_ref = ref_name;
        state.commit_mtime = commit_mtime;
        state.deleted = BTreeSet::new();
        state.tree_cache = HashMap::new();
        state.initialized = true;
        Ok(())
    }

    async fn overlay_children(&self, dir_path: &str) -> Result<BTreeSet<String>, FsError> {
        let prefix = format!("{}/", self.overlay_key(dir_path).trim_end_matches('/'));
        let listing = self.bucket.list(&prefix, "/").await?;
        let mut names = BTreeSet::new();
        for obj in listing.objects {
            if let Some(rest) = obj.key.strip_prefix(&prefix) {
                if !rest.is_empty() && rest != DIR_MARKER && rest != ".git" {
                    names.insert(rest.to_owned());
                }
            }
        }
        for cp in listing.common_prefixes {
            if let Some(rest) = cp.strip_prefix(&prefix) {
                let name = rest.trim_end_matches('/');
                if !name.is_empty() && name != ".git" {
                    names.insert(name.to_owned());
                }
            }
        }
        Ok(names)
    }

    async fn tree_entries(&self, state: &mut GitState, dir_path: &str) -> Result<Vec<GitTreeEntry>, FsError> {
        if let Some(cached) = state.tree_cache.get(dir_path) {
            return Ok(cached.clone());
        }
        let repo = state.repo.as_ref().expect("initialized");
        match repo.read_tree(&state.commit_oid, dir_path) {
            Ok(entries) => {
                state.tree_cache.insert(dir_path.to_owned(), entries.clone());
                Ok(entries)
            }
            Err(_) => Ok(Vec::new()),
        }
    }

    fn join_child(dir: &str, name: &str) -> String {
        if dir == "/" {
            format!("/{name}")
        } else {
            format!("{dir}/{name}")
        }
    }
}

#[async_trait]
impl FileSystem for GitOverlayFs {
    async fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError> {
        if is_reserved(path) {
            return Err(FsError::not_found("open", path));
        }
        self.init().await?;
        if let Some(bytes) = self.bucket.get(&self.overlay_key(path)).await? {
            return Ok(bytes);
        }
        let state = self.state.lock().await;
        if is_logically_deleted(&state.deleted, path) {
            return Err(FsError::not_found("open", path));
        }
        let repo = state.repo.as_ref().expect("initialized");
        let (bytes, _mode) = repo
            .read_blob(&state.commit_oid, path)
            .map_err(|_| FsError::not_found("open", path))?;
        Ok(bytes)
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        if is_reserved(path) {
            return Err(FsError::invalid_arg("write", path, "path is reserved"));
        }
        self.init().await?;
        self.bucket.put(&self.overlay_key(path), contents).await?;
        let mut state = self.state.lock().await;
        if state.deleted.remove(path) {
            self.persist_deleted(&state).await?;
        }
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        if is_reserved(path) {
            return Err(FsError::not_found("stat", path));
        }
        self.init().await?;
        if let Some(bytes) = self.bucket.get(&self.overlay_key(path)).await? {
            return Ok(FsStat::file(0o644, bytes.len() as u64, OffsetDateTime::now_utc()));
        }
        let mut state = self.state.lock().await;
        let deleted = is_logically_deleted(&state.deleted, path);
        let has_children = !self.overlay_children(path).await?.is_empty();
        if has_children {
            return Ok(FsStat::directory(0o755, OffsetDateTime::now_utc()));
        }
        if deleted {
            return Err(FsError::not_found("stat", path));
        }
        let repo = state.repo.as_ref().expect("initialized");
        let commit_oid = state.commit_oid.clone();
        match repo.stat_path(&commit_oid, path) {
            Ok(Some(info)) => {
                let mtime = OffsetDateTime::from_unix_timestamp(state.commit_mtime).unwrap_or_else(|_| OffsetDateTime::now_utc());
                match info.entry_type {
                    TreeEntryType::Tree => Ok(FsStat::directory(0o755, mtime)),
                    TreeEntryType::Blob if info.mode == "120000" => Ok(FsStat::symlink(0o777, mtime)),
                    TreeEntryType::Blob => Ok(FsStat::file(perm_bits(&info.mode), info.size, mtime)),
                    TreeEntryType::Commit => Ok(FsStat::directory(0o755, mtime)),
                }
            }
            Ok(None) => Err(FsError::not_found("stat", path)),
            Err(e) => Err(FsError::io("stat", path, e)),
        }
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        if is_reserved(path) {
            return Err(FsError::not_found("scandir", path));
        }
        self.init().await?;
        let mut state = self.state.lock().await;
        let deleted_here = is_logically_deleted(&state.deleted, path);
        let mut names = BTreeSet::new();
        let mut tree_recognised_dir = false;
        let mut tree_recognised_non_dir = false;
        if !deleted_here {
            if path == "/" {
                tree_recognised_dir = true;
            } else {
                match state.repo.as_ref().expect("initialized").stat_path(&state.commit_oid, path) {
                    Ok(Some(info)) if matches!(info.entry_type, TreeEntryType::Tree | TreeEntryType::Commit) => {
                        tree_recognised_dir = true;
                    }
                    Ok(Some(_)) => tree_recognised_non_dir = true,
                    _ => {}
                }
            }
            if tree_recognised_dir {
                for entry in self.tree_entries(&mut state, path).await? {
                    let child_path = Self::join_child(path, &entry.path);
                    if !is_logically_deleted(&state.deleted, &child_path) {
                        names.insert(entry.path);
                    }
                }
            }
        }
        let overlay_names = self.overlay_children(path).await?;
        let overlay_nonempty = !overlay_names.is_empty();
        names.extend(overlay_names);

        if names.is_empty() && !tree_recognised_dir && !overlay_nonempty {
            if tree_recognised_non_dir {
                return Err(FsError::not_directory("scandir", path));
            }
            return Err(FsError::not_found("scandir", path));
        }
        Ok(names.into_iter().collect())
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), FsError> {
        if is_reserved(path) {
            return Err(FsError::invalid_arg("mkdir", path, "path is reserved"));
        }
        self.init().await?;
        if !recursive && self.exists(path).await {
            return Err(FsError::exists("mkdir", path));
        }
        self.bucket.put(&self.dir_marker_key(path), b"").await?;
        if recursive {
            let mut parent = svfs_core::path::parent(path);
            while parent != "/" && !parent.is_empty() {
                self.bucket.put(&self.dir_marker_key(&parent), b"").await?;
                parent = svfs_core::path::parent(&parent);
            }
        }
        Ok(())
    }

    async fn rm(&self, path: &str, options: RmOptions) -> Result<(), FsError> {
        if is_reserved(path) {
            return Err(FsError::invalid_arg("rm", path, "path is reserved"));
        }
        self.init().await?;
        if !self.exists(path).await {
            return if options.force { Ok(()) } else { Err(FsError::not_found("rm", path)) };
        }
        self.bucket.delete(&self.overlay_key(path)).await?;
        self.bucket.delete(&self.dir_marker_key(path)).await?;
        let mut state = self.state.lock().await;
        state.deleted.insert(path.to_owned());
        if options.recursive {
            let descendant_prefix = format!("{path}/");
            state.deleted.retain(|d| d == path || !d.starts_with(&descendant_prefix));
        }
        self.persist_deleted(&state).await?;
        Ok(())
    }

    async fn cp(&self, src: &str, dest: &str, recursive: bool) -> Result<(), FsError> {
        if is_reserved(src) || is_reserved(dest) {
            return Err(FsError::invalid_arg("cp", src, "path is reserved"));
        }
        self.init().await?;
        let src_stat = self.stat(src).await?;
        if src_stat.is_directory {
            if !recursive {
                return Err(FsError::not_supported("cp", src));
            }
            self.mkdir(dest, true).await?;
            for name in self.readdir(src).await? {
                let child_src = Self::join_child(src, &name);
                let child_dest = Self::join_child(dest, &name);
                Box::pin(self.cp(&child_src, &child_dest, true)).await?;
            }
            Ok(())
        } else {
            let bytes = self.read_file_buffer(src).await?;
            self.write_file(dest, &bytes).await
        }
    }

    async fn chmod(&self, path: &str, _mode: u32) -> Result<(), FsError> {
        if is_reserved(path) {
            return Err(FsError::invalid_arg("chmod", path, "path is reserved"));
        }
        self.init().await?;
        self.stat(path).await.map(|_| ())
    }

    async fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError> {
        self.write_file(link_path, target.as_bytes()).await
    }

    async fn readlink(&self, path: &str) -> Result<String, FsError> {
        if is_reserved(path) {
            return Err(FsError::not_found("readlink", path));
        }
        self.init().await?;
        if let Some(bytes) = self.bucket.get(&self.overlay_key(path)).await? {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        let state = self.state.lock().await;
        if is_logically_deleted(&state.deleted, path) {
            return Err(FsError::not_found("readlink", path));
        }
        let repo = state.repo.as_ref().expect("initialized");
        let (bytes, mode) = repo.read_blob(&state.commit_oid, path).map_err(|_| FsError::not_found("readlink", path))?;
        if mode != "120000" {
            return Err(FsError::invalid_arg("readlink", path, "not a symbolic link"));
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn utimes(&self, path: &str, _mtime: OffsetDateTime) -> Result<(), FsError> {
        if is_reserved(path) {
            return Err(FsError::invalid_arg("utimes", path, "path is reserved"));
        }
        self.init().await?;
        self.stat(path).await.map(|_| ())
    }
}

impl GitOverlayFs {
    async fn persist_deleted(&self, state: &GitState) -> Result<(), FsError> {
        let meta = GitMetadata {
            commit_oid: state.commit_oid.clone(),
            remote_oid: state.remote_oid.clone(),
            git_ref: state.git_ref.clone(),
            url: self.url.clone(),
            commit_mtime: state.commit_mtime,
            deleted: state.deleted.iter().cloned().collect(),
            depth: self.depth,
        };
        self.write_meta(&meta).await
    }

    /// `git status` (§4.5.5): overlay paths readable in the committed tree
    /// are `modified`, the rest are `added`; `deleted` mirrors the
    /// tombstone set.
    pub async fn status(&self) -> Result<GitStatus, FsError> {
        self.init().await?;
        let state = self.state.lock().await;
        let prefix = format!("{}/", self.base_prefix());
        let listing = self.bucket.list(&prefix, "").await?;
        let repo = state.repo.as_ref().expect("initialized");
        let mut added = Vec::new();
        let mut modified = Vec::new();
        for obj in listing.objects {
            let Some(rel) = obj.key.strip_prefix(&prefix) else { continue };
            if rel.is_empty() || rel.starts_with(".git/") || rel.ends_with(DIR_MARKER) {
                continue;
            }
            let logical = format!("/{rel}");
            if repo.stat_path(&state.commit_oid, &logical).ok().flatten().is_some() {
                modified.push(logical);
            } else {
                added.push(logical);
            }
        }
        Ok(GitStatus { added, modified, deleted: state.deleted.iter().cloned().collect() })
    }

    /// Stage every overlay write and deletion-set entry into a new commit
    /// on top of `commitOid` (§4.5.6).
    ///
    /// # Errors
    /// `FsErrorKind::InvalidArg` with detail `"nothing to commit"` when the
    /// overlay and deletion set are both empty.
    pub async fn commit(&self, message: &str, author_name: &str, author_email: &str) -> Result<String, FsError> {
        self.init().await?;
        let status = self.status().await?;
        let mut state = self.state.lock().await;
        if status.added.is_empty() && status.modified.is_empty() && state.deleted.is_empty() {
            return Err(FsError::invalid_arg("commit", &self.mount_point, "nothing to commit"));
        }

        let mut upserts = Vec::new();
        for path in status.added.iter().chain(status.modified.iter()) {
            if let Some(bytes) = self.bucket.get(&self.overlay_key(path)).await? {
                upserts.push((path.clone(), bytes));
            }
        }
        let removals: Vec<String> = state.deleted.iter().cloned().collect();

        let repo = state.repo.as_ref().expect("initialized");
        let new_oid = repo
            .commit(&state.commit_oid, &state.git_ref, &upserts, &removals, message, author_name, author_email)
            .map_err(|e| FsError::io("commit", &self.mount_point, e))?;

        for path in upserts.iter().map(|(p, _)| p.clone()).chain(removals) {
            self.bucket.delete(&self.overlay_key(&path)).await?;
            self.bucket.delete(&self.dir_marker_key(&path)).await?;
        }
        state.deleted.clear();
        state.tree_cache.clear();
        state.commit_oid = new_oid.clone();

        self.write_pack(repo).await?;
        self.persist_deleted(&state).await?;
        Ok(new_oid)
    }

    /// Push `commitOid` to the remote; on success `remoteOid` catches up
    /// (§4.5.7).
    pub async fn push(&self) -> Result<(), FsError> {
        self.init().await?;
        let mut state = self.state.lock().await;
        let ref_name = state.git_ref.clone();
        let repo = state.repo.as_ref().expect("initialized");
        repo.push(&ref_name, self.auth_ref()).await.map_err(|e| FsError::io("push", &self.mount_point, e))?;
        state.remote_oid = state.commit_oid.clone();
        self.persist_deleted(&state).await
    }

    /// `true` iff there is a pending overlay write or deletion not yet
    /// folded into a commit.
    pub async fn is_dirty(&self) -> Result<bool, FsError> {
        let status = self.status().await?;
        Ok(!status.added.is_empty() || !status.modified.is_empty() || !status.deleted.is_empty())
    }

    #[must_use]
    pub async fn has_unpushed_commits(&self) -> bool {
        let state = self.state.lock().await;
        state.commit_oid != state.remote_oid
    }

    /// Fast-forward pull the tracked ref (§4.5.8).
    ///
    /// # Errors
    /// `FsErrorKind::InvalidArg` if there are unpushed local commits.
    pub async fn pull(&self) -> Result<(bool, String, String), FsError> {
        self.init().await?;
        let mut state = self.state.lock().await;
        if state.commit_oid != state.remote_oid {
            return Err(FsError::invalid_arg("pull", &self.mount_point, "push first"));
        }
        let from = state.commit_oid.clone();
        let ref_name = state.git_ref.clone();
        let repo = state.repo.as_ref().expect("initialized");
        let outcome = repo.pull(&ref_name, self.auth_ref()).await.map_err(|e| FsError::io("pull", &self.mount_point, e))?;
        match outcome {
            PullOutcome::UpToDate => Ok((false, from.clone(), from)),
            PullOutcome::FastForwarded { from: f, to } => {
                state.commit_oid = to.clone();
                state.remote_oid = to.clone();
                state.commit_mtime = repo.commit_mtime(&to).map_err(|e| FsError::io("pull", &self.mount_point, e))?;
                state.tree_cache.clear();
                self.write_pack(repo).await?;
                self.persist_deleted(&state).await?;
                Ok((true, f, to))
            }
        }
    }

    #[must_use]
    pub async fn head_commit_oid(&self) -> String {
        self.state.lock().await.commit_oid.clone()
    }

    #[must_use]
    pub async fn log_entries(&self, limit: usize) -> Result<Vec<(String, String)>, FsError> {
        self.init().await?;
        let state = self.state.lock().await;
        let repo = state.repo.as_ref().expect("initialized");
        repo.log(&state.commit_oid, limit).map_err(|e| FsError::io("log", &self.mount_point, e))
    }

    /// The tracked ref name, e.g. `main` (`git branch`, fstab round-trip on
    /// `clone`/`mount -t git`).
    #[must_use]
    pub async fn ref_name(&self) -> String {
        self.state.lock().await.git_ref.clone()
    }

    /// The remote URL this mount was cloned from (`git remote`).
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read `path` from the committed tree only, bypassing the overlay
    /// (`git diff`/`git show`'s "old side").
    pub async fn read_tree_file(&self, path: &str) -> Result<Option<Vec<u8>>, FsError> {
        self.init().await?;
        let state = self.state.lock().await;
        let repo = state.repo.as_ref().expect("initialized");
        match repo.read_blob(&state.commit_oid, path) {
            Ok((bytes, _mode)) => Ok(Some(bytes)),
            Err(_) => Ok(None),
        }
    }

    /// Read `path` from the overlay only, bypassing the committed tree
    /// (`git diff`/`git show`'s "new side").
    pub async fn read_overlay_file(&self, path: &str) -> Result<Option<Vec<u8>>, FsError> {
        self.init().await?;
        self.bucket.get(&self.overlay_key(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex as StdMutex;

    struct InMemoryBucket {
        objects: StdMutex<StdHashMap<String, Vec<u8>>>,
    }

    impl InMemoryBucket {
        fn new() -> Self {
            Self { objects: StdMutex::new(StdHashMap::new()) }
        }
    }

    #[async_trait]
    impl BlobBucket for InMemoryBucket {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FsError> {
            Ok(self.objects.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), FsError> {
            self.objects.lock().unwrap().insert(key.to_owned(), bytes.to_vec());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), FsError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        async fn list(&self, prefix: &str, delimiter: &str) -> Result<svfs_store::ListResult, FsError> {
            let objects = self.objects.lock().unwrap();
            let mut entries = Vec::new();
            let mut common_prefixes = BTreeSet::new();
            for (key, bytes) in objects.iter() {
                let Some(rest) = key.strip_prefix(prefix) else { continue };
                if !delimiter.is_empty() {
                    if let Some(idx) = rest.find(delimiter) {
                        common_prefixes.insert(format!("{prefix}{}{delimiter}", &rest[..idx]));
                        continue;
                    }
                }
                entries.push(svfs_store::ListEntry { key: key.clone(), size: bytes.len() as u64 });
            }
            Ok(svfs_store::ListResult { objects: entries, common_prefixes: common_prefixes.into_iter().collect() })
        }
    }

    fn fs_with_clone() -> (GitOverlayFs, std::sync::Arc<InMemoryBucket>) {
        let bucket = std::sync::Arc::new(InMemoryBucket::new());
        let fs = GitOverlayFs::new("u1", "/data", bucket.clone(), "https://example.invalid/repo.git", Some("main".to_owned()), 1, None);
        (fs, bucket)
    }

    #[test]
    fn reserved_paths_are_detected() {
        assert!(is_reserved("/.git"));
        assert!(is_reserved("/.git/pack.json"));
        assert!(!is_reserved("/.gitignore"));
    }

    #[test]
    fn overlay_key_scoping() {
        let (fs, _bucket) = fs_with_clone();
        assert_eq!(fs.overlay_key("/a.txt"), "u1/data/a.txt");
        assert_eq!(fs.git_key("meta.json"), "u1/data/.git/meta.json");
    }

    #[test]
    fn deletion_is_ancestor_inclusive() {
        let mut deleted = BTreeSet::new();
        deleted.insert("/src".to_owned());
        assert!(is_logically_deleted(&deleted, "/src"));
        assert!(is_logically_deleted(&deleted, "/src/index.ts"));
        assert!(is_logically_deleted(&deleted, "/src/nested/deep.ts"));
        assert!(!is_logically_deleted(&deleted, "/srcfile.txt"));
        assert!(!is_logically_deleted(&deleted, "/README.md"));
    }
}
