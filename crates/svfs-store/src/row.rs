//! Row-store (D1) adapter: files represented as rows in a relational table,
//! indexed by `(user_id, path)` (§6, "Row-store schema (collaborator)").
//!
//! The core only assumes the row store honours the [`FileSystem`] contract;
//! this crate ships the embedded in-memory table used when no networked D1
//! service is reachable (see `SPEC_FULL.md` §6). A real networked row store
//! is a drop-in replacement behind the same trait.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use svfs_core::{FileSystem, FsError, FsStat, RmOptions};
use time::OffsetDateTime;

#[derive(Clone)]
struct Row {
    parent_path: String,
    name: String,
    content: Vec<u8>,
    is_directory: bool,
    mode: u32,
    mtime: OffsetDateTime,
}

/// A `files` table scoped to a single user, keyed by normalised path.
pub struct D1Adapter {
    user_id: String,
    rows: Mutex<BTreeMap<String, Row>>,
}

impl D1Adapter {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        let mut rows = BTreeMap::new();
        rows.insert(
            "/".to_owned(),
            Row { parent_path: String::new(), name: String::new(), content: Vec::new(), is_directory: true, mode: 0o755, mtime: OffsetDateTime::now_utc() },
        );
        Self { user_id: user_id.into(), rows: Mutex::new(rows) }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn parent_exists(rows: &BTreeMap<String, Row>, parent: &str) -> bool {
        rows.get(parent).is_some_and(|r| r.is_directory)
    }
}

#[async_trait]
impl FileSystem for D1Adapter {
    async fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let p = svfs_core::path::normalize(path);
        let rows = self.rows.lock().expect("row store lock poisoned");
        match rows.get(&p) {
            Some(row) if row.is_directory => Err(FsError::is_directory("open", p)),
            Some(row) => Ok(row.content.clone()),
            None => Err(FsError::not_found("open", p)),
        }
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let p = svfs_core::path::normalize(path);
        let parent = svfs_core::path::parent(&p);
        let name = svfs_core::path::base(&p).to_owned();
        let mut rows = self.rows.lock().expect("row store lock poisoned");
        if rows.get(&p).is_some_and(|r| r.is_directory) {
            return Err(FsError::is_directory("open", p));
        }
        if !Self::parent_exists(&rows, &parent) {
            return Err(FsError::not_found("open", parent));
        }
        rows.insert(
            p,
            Row { parent_path: parent, name, content: contents.to_vec(), is_directory: false, mode: 0o644, mtime: OffsetDateTime::now_utc() },
        );
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        let p = svfs_core::path::normalize(path);
        let rows = self.rows.lock().expect("row store lock poisoned");
        let row = rows.get(&p).ok_or_else(|| FsError::not_found("stat", p.clone()))?;
        Ok(if row.is_directory {
            FsStat::directory(row.mode, row.mtime)
        } else {
            FsStat::file(row.mode, row.content.len() as u64, row.mtime)
        })
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let p = svfs_core::path::normalize(path);
        let rows = self.rows.lock().expect("row store lock poisoned");
        match rows.get(&p) {
            Some(row) if row.is_directory => {
                let mut names: Vec<String> = rows.values().filter(|r| r.parent_path == p).map(|r| r.name.clone()).collect();
                names.sort();
                Ok(names)
            }
            Some(_) => Err(FsError::not_directory("scandir", p)),
            None => Err(FsError::not_found("scandir", p)),
        }
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), FsError> {
        let p = svfs_core::path::normalize(path);
        let mut rows = self.rows.lock().expect("row store lock poisoned");
        if rows.contains_key(&p) {
            return if recursive { Ok(()) } else { Err(FsError::exists("mkdir", p)) };
        }
        if recursive {
            let mut prefix = String::new();
            for segment in p.trim_start_matches('/').split('/') {
                let parent = prefix.clone();
                prefix = format!("{prefix}/{segment}");
                rows.entry(prefix.clone()).or_insert_with(|| Row {
                    parent_path: if parent.is_empty() { "/".to_owned() } else { parent },
                    name: segment.to_owned(),
                    content: Vec::new(),
                    is_directory: true,
                    mode: 0o755,
                    mtime: OffsetDateTime::now_utc(),
                });
            }
        } else {
            let parent = svfs_core::path::parent(&p);
            if !Self::parent_exists(&rows, &parent) {
                return Err(FsError::not_found("mkdir", parent));
            }
            rows.insert(
                p.clone(),
                Row { parent_path: parent, name: svfs_core::path::base(&p).to_owned(), content: Vec::new(), is_directory: true, mode: 0o755, mtime: OffsetDateTime::now_utc() },
            );
        }
        Ok(())
    }

    async fn rm(&self, path: &str, options: RmOptions) -> Result<(), FsError> {
        let p = svfs_core::path::normalize(path);
        let mut rows = self.rows.lock().expect("row store lock poisoned");
        let Some(row) = rows.get(&p).cloned() else {
            return if options.force { Ok(()) } else { Err(FsError::not_found("rm", p)) };
        };
        if row.is_directory {
            let has_children = rows.values().any(|r| r.parent_path == p);
            if has_children && !options.recursive {
                return Err(FsError::not_empty("rmdir", p));
            }
            rows.retain(|path, _| !svfs_core::path::is_ancestor_or_self(&p, path));
        } else {
            rows.remove(&p);
        }
        Ok(())
    }

    async fn cp(&self, src: &str, dest: &str, recursive: bool) -> Result<(), FsError> {
        let s = svfs_core::path::normalize(src);
        let d = svfs_core::path::normalize(dest);
        let mut rows = self.rows.lock().expect("row store lock poisoned");
        let Some(src_row) = rows.get(&s).cloned() else { return Err(FsError::not_found("cp", s)) };
        if src_row.is_directory {
            if !recursive {
                return Err(FsError::is_directory("cp", s));
            }
            let to_copy: Vec<(String, Row)> = rows
                .iter()
                .filter(|(path, _)| svfs_core::path::is_ancestor_or_self(&s, path))
                .map(|(path, row)| (path.clone(), row.clone()))
                .collect();
            for (path, row) in to_copy {
                let rel = svfs_core::path::strip_prefix(&path, &s);
                let new_path = svfs_core::path::join(&d, rel.trim_start_matches('/'));
                let parent = svfs_core::path::parent(&new_path);
                let name = svfs_core::path::base(&new_path).to_owned();
                rows.insert(new_path, Row { parent_path: parent, name, ..row });
            }
            Ok(())
        } else {
            let parent = svfs_core::path::parent(&d);
            let name = svfs_core::path::base(&d).to_owned();
            rows.insert(d, Row { parent_path: parent, name, ..src_row });
            Ok(())
        }
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<(), FsError> {
        let p = svfs_core::path::normalize(path);
        let mut rows = self.rows.lock().expect("row store lock poisoned");
        let row = rows.get_mut(&p).ok_or_else(|| FsError::not_found("chmod", p.clone()))?;
        row.mode = mode;
        Ok(())
    }

    async fn symlink(&self, _target: &str, link_path: &str) -> Result<(), FsError> {
        Err(FsError::not_supported("symlink", link_path))
    }

    async fn readlink(&self, path: &str) -> Result<String, FsError> {
        Err(FsError::not_supported("readlink", path))
    }

    async fn utimes(&self, path: &str, mtime: OffsetDateTime) -> Result<(), FsError> {
        let p = svfs_core::path::normalize(path);
        let mut rows = self.rows.lock().expect("row store lock poisoned");
        let row = rows.get_mut(&p).ok_or_else(|| FsError::not_found("utimes", p.clone()))?;
        row.mtime = mtime;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_readdir() {
        let adapter = D1Adapter::new("alice");
        adapter.mkdir("/etc", true).await.unwrap();
        adapter.write_file("/etc/fstab", b"contents").await.unwrap();
        assert_eq!(adapter.readdir("/etc").await.unwrap(), vec!["fstab".to_owned()]);
        assert_eq!(adapter.read_file_buffer("/etc/fstab").await.unwrap(), b"contents");
    }

    #[tokio::test]
    async fn rm_nonempty_dir_requires_recursive() {
        let adapter = D1Adapter::new("alice");
        adapter.mkdir("/a", true).await.unwrap();
        adapter.write_file("/a/f.txt", b"x").await.unwrap();
        let err = adapter.rm("/a", RmOptions { recursive: false, force: false }).await.unwrap_err();
        assert_eq!(err.kind, svfs_core::FsErrorKind::NotEmpty);
        adapter.rm("/a", RmOptions { recursive: true, force: false }).await.unwrap();
        assert!(!adapter.exists("/a").await);
    }
}
