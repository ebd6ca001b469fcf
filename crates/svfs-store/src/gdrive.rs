//! Cloud-drive adapter: CRUD against a hierarchical cloud-drive API (file
//! IDs, not paths), with a time-bounded path→id cache to amortise tree
//! walks (§9, "Path-ID cache in cloud-drive adapter").

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use svfs_core::{FileSystem, FsError, FsStat, RmOptions};
use time::OffsetDateTime;

const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// The subset of a hierarchical cloud-drive API (Google-Drive-shaped: file
/// IDs, parent references, no path addressing) this adapter needs.
#[async_trait]
pub trait CloudDriveApi: Send + Sync {
    /// List `(name, id, is_directory)` children of `parent_id`.
    async fn list_children(&self, parent_id: &str) -> Result<Vec<(String, String, bool)>, FsError>;
    async fn read(&self, id: &str) -> Result<Vec<u8>, FsError>;
    async fn write(&self, parent_id: &str, name: &str, existing_id: Option<&str>, bytes: &[u8]) -> Result<String, FsError>;
    async fn mkdir(&self, parent_id: &str, name: &str) -> Result<String, FsError>;
    async fn delete(&self, id: &str) -> Result<(), FsError>;
}

struct CacheEntry {
    id: String,
    is_directory: bool,
    inserted_at: Instant,
}

/// A [`FileSystem`] backed by [`CloudDriveApi`], translating POSIX paths
/// into drive file IDs through a TTL'd cache that tolerates staleness by
/// retrying a lookup that comes back not-found from the underlying API.
pub struct GDriveAdapter<A: CloudDriveApi> {
    api: A,
    root_folder_id: String,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl<A: CloudDriveApi> GDriveAdapter<A> {
    #[must_use]
    pub fn new(api: A, root_folder_id: impl Into<String>) -> Self {
        Self { api, root_folder_id: root_folder_id.into(), cache: Mutex::new(HashMap::new()) }
    }

    fn cache_get(&self, path: &str) -> Option<(String, bool)> {
        let cache = self.cache.lock().expect("gdrive cache lock poisoned");
        cache.get(path).filter(|e| e.inserted_at.elapsed() < CACHE_TTL).map(|e| (e.id.clone(), e.is_directory))
    }

    fn cache_put(&self, path: &str, id: &str, is_directory: bool) {
        let mut cache = self.cache.lock().expect("gdrive cache lock poisoned");
        cache.insert(path.to_owned(), CacheEntry { id: id.to_owned(), is_directory, inserted_at: Instant::now() });
    }

    fn cache_evict(&self, path: &str) {
        self.cache.lock().expect("gdrive cache lock poisoned").remove(path);
    }

    /// Resolve `path` to `(id, is_directory)`, walking from the root and
    /// filling the cache as it goes. A cache hit is still retried from the
    /// API layer by the caller if it subsequently turns out stale.
    async fn resolve(&self, path: &str) -> Result<(String, bool), FsError> {
        let p = svfs_core::path::normalize(path);
        if p == "/" {
            return Ok((self.root_folder_id.clone(), true));
        }
        if let Some(hit) = self.cache_get(&p) {
            return Ok(hit);
        }
        let mut current_id = self.root_folder_id.clone();
        let mut current_path = String::new();
        for segment in p.trim_start_matches('/').split('/') {
            current_path.push('/');
            current_path.push_str(segment);
            if let Some(hit) = self.cache_get(&current_path) {
                current_id = hit.0;
                continue;
            }
            let children = self.api.list_children(&current_id).await?;
            let Some((_, id, is_dir)) = children.into_iter().find(|(name, _, _)| name == segment) else {
                return Err(FsError::not_found("resolve", p));
            };
            self.cache_put(&current_path, &id, is_dir);
            current_id = id;
        }
        self.cache_get(&p).ok_or_else(|| FsError::not_found("resolve", p))
    }

    async fn resolve_retrying(&self, path: &str) -> Result<(String, bool), FsError> {
        match self.resolve(path).await {
            Err(e) if e.is_not_found() => {
                self.cache_evict(&svfs_core::path::normalize(path));
                self.resolve(path).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl<A: CloudDriveApi + Send + Sync> FileSystem for GDriveAdapter<A> {
    async fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let (id, is_dir) = self.resolve_retrying(path).await?;
        if is_dir {
            return Err(FsError::is_directory("open", path));
        }
        self.api.read(&id).await
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let p = svfs_core::path::normalize(path);
        let parent = svfs_core::path::parent(&p);
        let name = svfs_core::path::base(&p);
        let (parent_id, _) = self.resolve_retrying(&parent).await?;
        let existing = self.resolve(&p).await.ok();
        let id = self.api.write(&parent_id, name, existing.as_ref().map(|(id, _)| id.as_str()), contents).await?;
        self.cache_put(&p, &id, false);
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        let (_, is_dir) = self.resolve_retrying(path).await?;
        Ok(if is_dir {
            FsStat::directory(0o755, OffsetDateTime::now_utc())
        } else {
            let bytes = self.read_file_buffer(path).await?;
            FsStat::file(0o644, bytes.len() as u64, OffsetDateTime::now_utc())
        })
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let (id, is_dir) = self.resolve_retrying(path).await?;
        if !is_dir {
            return Err(FsError::not_directory("scandir", path));
        }
        let mut names: Vec<String> = self.api.list_children(&id).await?.into_iter().map(|(name, _, _)| name).collect();
        names.sort();
        Ok(names)
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), FsError> {
        let p = svfs_core::path::normalize(path);
        if self.resolve_retrying(&p).await.is_ok() {
            return if recursive { Ok(()) } else { Err(FsError::exists("mkdir", p)) };
        }
        let parent = svfs_core::path::parent(&p);
        let name = svfs_core::path::base(&p).to_owned();
        let (parent_id, _) = if recursive {
            match self.resolve_retrying(&parent).await {
                Ok(hit) => hit,
                Err(_) => {
                    self.mkdir(&parent, true).await?;
                    self.resolve_retrying(&parent).await?
                }
            }
        } else {
            self.resolve_retrying(&parent).await?
        };
        let id = self.api.mkdir(&parent_id, &name).await?;
        self.cache_put(&p, &id, true);
        Ok(())
    }

    async fn rm(&self, path: &str, options: RmOptions) -> Result<(), FsError> {
        let p = svfs_core::path::normalize(path);
        let resolved = self.resolve_retrying(&p).await;
        let Ok((id, is_dir)) = resolved else {
            return if options.force { Ok(()) } else { Err(FsError::not_found("rm", p)) };
        };
        if is_dir {
            let children = self.api.list_children(&id).await?;
            if !children.is_empty() && !options.recursive {
                return Err(FsError::not_empty("rm", p));
            }
        }
        self.api.delete(&id).await?;
        self.cache_evict(&p);
        Ok(())
    }

    async fn cp(&self, src: &str, dest: &str, recursive: bool) -> Result<(), FsError> {
        let (_, is_dir) = self.resolve_retrying(src).await?;
        if is_dir && !recursive {
            return Err(FsError::is_directory("cp", src));
        }
        if is_dir {
            return Err(FsError::not_supported("cp", src));
        }
        let bytes = self.read_file_buffer(src).await?;
        self.write_file(dest, &bytes).await
    }

    async fn chmod(&self, _path: &str, _mode: u32) -> Result<(), FsError> {
        Ok(())
    }

    async fn symlink(&self, _target: &str, link_path: &str) -> Result<(), FsError> {
        Err(FsError::not_supported("symlink", link_path))
    }

    async fn readlink(&self, path: &str) -> Result<String, FsError> {
        Err(FsError::not_supported("readlink", path))
    }

    async fn utimes(&self, _path: &str, _mtime: OffsetDateTime) -> Result<(), FsError> {
        Ok(())
    }
}
