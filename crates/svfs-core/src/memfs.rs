//! Hash-map–backed in-memory filesystem. Used as the router's base
//! filesystem and to scaffold mount-point directories (e.g. `/mnt`).

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::FsError;
use crate::fs::{FileSystem, FsStat, RmOptions};
use crate::path::{self, is_ancestor_or_self};

struct Node {
    contents: Vec<u8>,
    mode: u32,
    mtime: OffsetDateTime,
    is_symlink: bool,
}

struct State {
    files: std::collections::HashMap<String, Node>,
    dirs: BTreeSet<String>,
}

/// An in-memory [`FileSystem`]. Every write is held only for the lifetime of
/// this value — there is no persistence, matching §2's "In-memory adapter".
pub struct MemFs {
    state: Mutex<State>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    #[must_use]
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert("/".to_owned());
        Self {
            state: Mutex::new(State { files: std::collections::HashMap::new(), dirs }),
        }
    }

    fn ensure_parent_exists(state: &State, syscall: &'static str, p: &str) -> Result<(), FsError> {
        let parent = path::parent(p);
        if state.dirs.contains(&parent) {
            Ok(())
        } else {
            Err(FsError::not_found(syscall, parent))
        }
    }
}

#[async_trait]
impl FileSystem for MemFs {
    async fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let p = path::normalize(path);
        let state = self.state.lock().expect("memfs lock poisoned");
        if state.dirs.contains(&p) {
            return Err(FsError::is_directory("open", p));
        }
        state
            .files
            .get(&p)
            .map(|n| n.contents.clone())
            .ok_or_else(|| FsError::not_found("open", p))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let p = path::normalize(path);
        let mut state = self.state.lock().expect("memfs lock poisoned");
        if state.dirs.contains(&p) {
            return Err(FsError::is_directory("open", p));
        }
        Self::ensure_parent_exists(&state, "open", &p)?;
        state.files.insert(
            p,
            Node { contents: contents.to_vec(), mode: 0o644, mtime: OffsetDateTime::now_utc(), is_symlink: false },
        );
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        let p = path::normalize(path);
        let state = self.state.lock().expect("memfs lock poisoned");
        if state.dirs.contains(&p) {
            return Ok(FsStat::directory(0o755, OffsetDateTime::now_utc()));
        }
        if let Some(node) = state.files.get(&p) {
            return Ok(if node.is_symlink {
                FsStat::symlink(node.mode, node.mtime)
            } else {
                FsStat::file(node.mode, node.contents.len() as u64, node.mtime)
            });
        }
        Err(FsError::not_found("stat", p))
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let p = path::normalize(path);
        let state = self.state.lock().expect("memfs lock poisoned");
        if !state.dirs.contains(&p) {
            return if state.files.contains_key(&p) {
                Err(FsError::not_directory("scandir", p))
            } else {
                Err(FsError::not_found("scandir", p))
            };
        }
        let mut names: BTreeSet<String> = BTreeSet::new();
        for dir in &state.dirs {
            if dir != &p && is_ancestor_or_self(&p, dir) {
                let rel = path::strip_prefix(dir, &p);
                if let Some(first) = rel.trim_start_matches('/').split('/').next() {
                    if !first.is_empty() {
                        names.insert(first.to_owned());
                    }
                }
            }
        }
        for file in state.files.keys() {
            if is_ancestor_or_self(&p, file) && file != &p {
                let rel = path::strip_prefix(file, &p);
                if let Some(first) = rel.trim_start_matches('/').split('/').next() {
                    if !first.is_empty() {
                        names.insert(first.to_owned());
                    }
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), FsError> {
        let p = path::normalize(path);
        let mut state = self.state.lock().expect("memfs lock poisoned");
        if state.dirs.contains(&p) || state.files.contains_key(&p) {
            return if recursive { Ok(()) } else { Err(FsError::exists("mkdir", p)) };
        }
        if recursive {
            let mut prefix = String::new();
            for segment in p.trim_start_matches('/').split('/') {
                prefix = format!("{prefix}/{segment}");
                state.dirs.insert(prefix.clone());
            }
        } else {
            Self::ensure_parent_exists(&state, "mkdir", &p)?;
            state.dirs.insert(p);
        }
        Ok(())
    }

    async fn rm(&self, path: &str, options: RmOptions) -> Result<(), FsError> {
        let p = path::normalize(path);
        let mut state = self.state.lock().expect("memfs lock poisoned");
        let is_dir = state.dirs.contains(&p);
        let is_file = state.files.contains_key(&p);
        if !is_dir && !is_file {
            return if options.force { Ok(()) } else { Err(FsError::not_found("rm", p)) };
        }
        if is_dir {
            let has_children = state.dirs.iter().any(|d| d != &p && is_ancestor_or_self(&p, d))
                || state.files.keys().any(|f| is_ancestor_or_self(&p, f));
            if has_children && !options.recursive {
                return Err(FsError::not_empty("rmdir", p));
            }
            state.dirs.retain(|d| !is_ancestor_or_self(&p, d));
            state.files.retain(|f, _| !is_ancestor_or_self(&p, f));
        } else {
            state.files.remove(&p);
        }
        Ok(())
    }

    async fn cp(&self, src: &str, dest: &str, recursive: bool) -> Result<(), FsError> {
        let s = path::normalize(src);
        let d = path::normalize(dest);
        let mut state = self.state.lock().expect("memfs lock poisoned");
        if state.dirs.contains(&s) {
            if !recursive {
                return Err(FsError::is_directory("cp", s));
            }
            let prefix = s.clone();
            let mut to_add_dirs = Vec::new();
            let mut to_add_files = Vec::new();
            for dir in &state.dirs {
                if is_ancestor_or_self(&prefix, dir) {
                    let rel = path::strip_prefix(dir, &prefix);
                    to_add_dirs.push(path::join(&d, rel.trim_start_matches('/')));
                }
            }
            for (file, node) in &state.files {
                if is_ancestor_or_self(&prefix, file) {
                    let rel = path::strip_prefix(file, &prefix);
                    to_add_files.push((
                        path::join(&d, rel.trim_start_matches('/')),
                        Node { contents: node.contents.clone(), mode: node.mode, mtime: node.mtime, is_symlink: node.is_symlink },
                    ));
                }
            }
            to_add_dirs.push(d.clone());
            for dir in to_add_dirs {
                state.dirs.insert(dir);
            }
            for (path, node) in to_add_files {
                state.files.insert(path, node);
            }
            Ok(())
        } else {
            let node = state.files.get(&s).ok_or_else(|| FsError::not_found("cp", s.clone()))?;
            let cloned = Node { contents: node.contents.clone(), mode: node.mode, mtime: node.mtime, is_symlink: node.is_symlink };
            Self::ensure_parent_exists(&state, "cp", &d)?;
            state.files.insert(d, cloned);
            Ok(())
        }
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<(), FsError> {
        let p = path::normalize(path);
        let mut state = self.state.lock().expect("memfs lock poisoned");
        if let Some(node) = state.files.get_mut(&p) {
            node.mode = mode;
            Ok(())
        } else if state.dirs.contains(&p) {
            Ok(())
        } else {
            Err(FsError::not_found("chmod", p))
        }
    }

    async fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError> {
        let p = path::normalize(link_path);
        let mut state = self.state.lock().expect("memfs lock poisoned");
        Self::ensure_parent_exists(&state, "symlink", &p)?;
        state.files.insert(
            p,
            Node { contents: target.as_bytes().to_vec(), mode: 0o120_000, mtime: OffsetDateTime::now_utc(), is_symlink: true },
        );
        Ok(())
    }

    async fn readlink(&self, path: &str) -> Result<String, FsError> {
        let p = path::normalize(path);
        let state = self.state.lock().expect("memfs lock poisoned");
        let node = state.files.get(&p).ok_or_else(|| FsError::not_found("readlink", p.clone()))?;
        if !node.is_symlink {
            return Err(FsError::invalid_arg("readlink", p, "not a symbolic link"));
        }
        Ok(String::from_utf8_lossy(&node.contents).into_owned())
    }

    async fn utimes(&self, path: &str, mtime: OffsetDateTime) -> Result<(), FsError> {
        let p = path::normalize(path);
        let mut state = self.state.lock().expect("memfs lock poisoned");
        if let Some(node) = state.files.get_mut(&p) {
            node.mtime = mtime;
            Ok(())
        } else if state.dirs.contains(&p) {
            Ok(())
        } else {
            Err(FsError::not_found("utimes", p))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let fs = MemFs::new();
        fs.write_file("/hello.txt", b"hi").await.unwrap();
        assert_eq!(fs.read_file_buffer("/hello.txt").await.unwrap(), b"hi");
    }

    #[tokio::test]
    async fn mkdir_recursive_then_readdir() {
        let fs = MemFs::new();
        fs.mkdir("/a/b/c", true).await.unwrap();
        let entries = fs.readdir("/a").await.unwrap();
        assert_eq!(entries, vec!["b".to_owned()]);
    }

    #[tokio::test]
    async fn mkdir_nonrecursive_exists_fails() {
        let fs = MemFs::new();
        fs.mkdir("/a", false).await.unwrap();
        let err = fs.mkdir("/a", false).await.unwrap_err();
        assert!(err.is_exists());
    }

    #[tokio::test]
    async fn rm_force_swallows_not_found() {
        let fs = MemFs::new();
        fs.rm("/nope", RmOptions { recursive: false, force: true }).await.unwrap();
    }

    #[tokio::test]
    async fn exists_matches_stat() {
        let fs = MemFs::new();
        assert!(!fs.exists("/a").await);
        fs.write_file("/a", b"x").await.unwrap();
        assert!(fs.exists("/a").await);
    }
}
