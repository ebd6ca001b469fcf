//! End-to-end overlay scenarios against a real local Git remote (no network
//! required — git's local-path transport stands in for the smart-HTTP
//! server). Plain `std::process::Command` setup, no test-only abstraction
//! layer.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use svfs_core::{FsError, RmOptions};
use svfs_git::GitOverlayFs;
use svfs_store::{BlobBucket, ListEntry, ListResult};
use tempfile::TempDir;

struct LocalBucket {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl LocalBucket {
    fn new() -> Self {
        Self { objects: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl BlobBucket for LocalBucket {
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

    async fn list(&self, prefix: &str, delimiter: &str) -> Result<ListResult, FsError> {
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
            entries.push(ListEntry { key: key.clone(), size: bytes.len() as u64 });
        }
        Ok(ListResult { objects: entries, common_prefixes: common_prefixes.into_iter().collect() })
    }
}

fn git(args: &[&str], cwd: &Path) {
    let out = std::process::Command::new("git").args(args).current_dir(cwd).output().unwrap();
    assert!(out.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&out.stderr));
}

/// A plain (non-bare) local repo with one commit: `README.md` and
/// `src/index.ts`, on branch `main`. Git's local-path transport lets this
/// stand in for a remote without any network or mock server.
fn setup_remote() -> TempDir {
    let dir = TempDir::new().unwrap();
    git(&["init"], dir.path());
    git(&["config", "user.email", "test@test.com"], dir.path());
    git(&["config", "user.name", "Test User"], dir.path());
    std::fs::write(dir.path().join("README.md"), "Hello").unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/index.ts"), "export default 42;").unwrap();
    git(&["add", "-A"], dir.path());
    git(&["commit", "-m", "initial"], dir.path());
    git(&["branch", "-M", "main"], dir.path());
    dir
}

fn new_fs(remote: &TempDir, bucket: Arc<LocalBucket>) -> GitOverlayFs {
    GitOverlayFs::new(
        "user1",
        "/mnt/repo",
        bucket,
        remote.path().to_str().unwrap().to_owned(),
        Some("main".to_owned()),
        1,
        None,
    )
}

#[tokio::test]
async fn scenario_git_overlay_merge() {
    let remote = setup_remote();
    let bucket = Arc::new(LocalBucket::new());
    let fs = new_fs(&remote, bucket);
    fs.init().await.unwrap();

    svfs_core::FileSystem::write_file(&fs, "/newfile.txt", b"x").await.unwrap();
    svfs_core::FileSystem::rm(&fs, "/README.md", RmOptions::default()).await.unwrap();

    let mut listing = svfs_core::FileSystem::readdir(&fs, "/").await.unwrap();
    listing.sort();
    assert!(listing.contains(&"newfile.txt".to_owned()));
    assert!(listing.contains(&"src".to_owned()));
    assert!(!listing.contains(&"README.md".to_owned()));

    assert!(!svfs_core::FileSystem::exists(&fs, "/README.md").await);
    assert!(svfs_core::FileSystem::exists(&fs, "/newfile.txt").await);

    let status = fs.status().await.unwrap();
    assert_eq!(status.added, vec!["/newfile.txt".to_owned()]);
    assert!(status.modified.is_empty());
    assert_eq!(status.deleted, vec!["/README.md".to_owned()]);
}

#[tokio::test]
async fn scenario_commit_restart_equivalence() {
    let remote = setup_remote();
    let bucket = Arc::new(LocalBucket::new());
    let fs = new_fs(&remote, Arc::clone(&bucket));
    fs.init().await.unwrap();
    svfs_core::FileSystem::write_file(&fs, "/newfile.txt", b"x").await.unwrap();
    svfs_core::FileSystem::rm(&fs, "/README.md", RmOptions::default()).await.unwrap();
    fs.commit("c", "Test User", "test@test.com").await.unwrap();
    assert!(!fs.is_dirty().await.unwrap());

    let restarted = new_fs(&remote, Arc::clone(&bucket));
    restarted.init().await.unwrap();
    assert!(!restarted.is_dirty().await.unwrap());
    assert_eq!(svfs_core::FileSystem::read_file_buffer(&restarted, "/newfile.txt").await.unwrap(), b"x");
    assert!(!svfs_core::FileSystem::exists(&restarted, "/README.md").await);
    assert!(restarted.has_unpushed_commits().await);
}

#[tokio::test]
async fn scenario_pull_rejects_unpushed_commits() {
    let remote = setup_remote();
    let bucket = Arc::new(LocalBucket::new());
    let fs = new_fs(&remote, bucket);
    fs.init().await.unwrap();
    svfs_core::FileSystem::write_file(&fs, "/newfile.txt", b"x").await.unwrap();
    fs.commit("c", "Test User", "test@test.com").await.unwrap();

    let before = fs.head_commit_oid().await;
    let err = fs.pull().await.unwrap_err();
    assert!(err.to_string().contains("push first"), "{err}");
    assert_eq!(fs.head_commit_oid().await, before);
}

#[tokio::test]
async fn scenario_directory_tombstone_subsumes_children() {
    let remote = setup_remote();
    let bucket = Arc::new(LocalBucket::new());
    let fs = new_fs(&remote, bucket);
    fs.init().await.unwrap();

    svfs_core::FileSystem::rm(&fs, "/src", RmOptions { recursive: true, force: false }).await.unwrap();

    let err = svfs_core::FileSystem::read_file_buffer(&fs, "/src/index.ts").await.unwrap_err();
    assert!(err.is_not_found(), "{err}");
    assert!(svfs_core::FileSystem::stat(&fs, "/src/index.ts").await.is_err());
    assert!(!svfs_core::FileSystem::exists(&fs, "/src/index.ts").await);
    assert!(svfs_core::FileSystem::readdir(&fs, "/src").await.is_err());
}

#[tokio::test]
async fn scenario_readdir_of_a_file_is_not_directory() {
    let remote = setup_remote();
    let bucket = Arc::new(LocalBucket::new());
    let fs = new_fs(&remote, bucket);
    fs.init().await.unwrap();

    let err = svfs_core::FileSystem::readdir(&fs, "/README.md").await.unwrap_err();
    assert!(err.is_not_directory(), "{err}");
}
