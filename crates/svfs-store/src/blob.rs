//! Blob-store (R2) adapter: CRUD of opaque byte blobs keyed by path, with
//! listing by prefix/delimiter, composed into a [`FileSystem`] by treating
//! `/`-delimited common prefixes as directories.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use svfs_core::{FileSystem, FsError, FsStat, RmOptions};
use time::OffsetDateTime;

/// One entry returned by [`BlobBucket::list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListEntry {
    pub key: String,
    pub size: u64,
}

/// The result of a prefix/delimiter listing: direct objects under the
/// prefix, and the common prefixes (pseudo-directories) one level deeper.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListResult {
    pub objects: Vec<ListEntry>,
    pub common_prefixes: Vec<String>,
}

/// The storage interface a blob bucket implementation provides. Both the
/// real HTTP-backed bucket and the in-memory mock bucket used in tests
/// implement this.
#[async_trait]
pub trait BlobBucket: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FsError>;
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), FsError>;
    async fn delete(&self, key: &str) -> Result<(), FsError>;
    async fn list(&self, prefix: &str, delimiter: &str) -> Result<ListResult, FsError>;
}

/// A real blob bucket reached over HTTP: `GET`/`PUT`/`DELETE` by key, and a
/// `GET ?prefix=&delimiter=` listing endpoint, the shape most S3-compatible
/// object stores (including R2) expose.
pub struct HttpBlobBucket {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpBlobBucket {
    #[must_use]
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), bearer_token }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/objects/{}", self.base_url.trim_end_matches('/'), key.trim_start_matches('/'))
    }
}

#[async_trait]
impl BlobBucket for HttpBlobBucket {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FsError> {
        let resp = self
            .request(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|e| FsError::io("open", key, e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status().map_err(|e| FsError::io("open", key, e))?;
        let bytes = resp.bytes().await.map_err(|e| FsError::io("open", key, e))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), FsError> {
        self.request(self.client.put(self.object_url(key)))
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| FsError::io("open", key, e))?
            .error_for_status()
            .map_err(|e| FsError::io("open", key, e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), FsError> {
        let resp = self
            .request(self.client.delete(self.object_url(key)))
            .send()
            .await
            .map_err(|e| FsError::io("rm", key, e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        resp.error_for_status().map_err(|e| FsError::io("rm", key, e))?;
        Ok(())
    }

    async fn list(&self, prefix: &str, delimiter: &str) -> Result<ListResult, FsError> {
        let resp = self
            .request(self.client.get(format!("{}/list", self.base_url.trim_end_matches('/'))))
            .query(&[("prefix", prefix), ("delimiter", delimiter)])
            .send()
            .await
            .map_err(|e| FsError::io("scandir", prefix, e))?
            .error_for_status()
            .map_err(|e| FsError::io("scandir", prefix, e))?;
        #[derive(serde::Deserialize)]
        struct Wire {
            objects: Vec<WireObject>,
            #[serde(default)]
            common_prefixes: Vec<String>,
        }
        #[derive(serde::Deserialize)]
        struct WireObject {
            key: String,
            size: u64,
        }
        let wire: Wire = resp.json().await.map_err(|e| FsError::io("scandir", prefix, e))?;
        Ok(ListResult {
            objects: wire.objects.into_iter().map(|o| ListEntry { key: o.key, size: o.size }).collect(),
            common_prefixes: wire.common_prefixes,
        })
    }
}

/// A [`FileSystem`] backed by a [`BlobBucket`]. Paths map directly onto
/// blob keys; "directories" are pseudo-directories inferred from common
/// prefixes under a `/` delimiter, since the underlying store has no
/// directory concept of its own.
pub struct R2Adapter {
    bucket: Arc<dyn BlobBucket>,
}

impl R2Adapter {
    #[must_use]
    pub fn new(bucket: Arc<dyn BlobBucket>) -> Self {
        Self { bucket }
    }

    fn prefix_for(path: &str) -> String {
        if path == "/" {
            String::new()
        } else {
            format!("{}/", path.trim_start_matches('/'))
        }
    }

    fn key_for(path: &str) -> String {
        path.trim_start_matches('/').to_owned()
    }
}

#[async_trait]
impl FileSystem for R2Adapter {
    async fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.bucket
            .get(&Self::key_for(path))
            .await?
            .ok_or_else(|| FsError::not_found("open", path))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        self.bucket.put(&Self::key_for(path), contents).await
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        if let Some(bytes) = self.bucket.get(&Self::key_for(path)).await? {
            return Ok(FsStat::file(0o644, bytes.len() as u64, OffsetDateTime::now_utc()));
        }
        let listing = self.bucket.list(&Self::prefix_for(path), "/").await?;
        if listing.objects.is_empty() && listing.common_prefixes.is_empty() {
            return Err(FsError::not_found("stat", path));
        }
        Ok(FsStat::directory(0o755, OffsetDateTime::now_utc()))
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let listing = self.bucket.list(&Self::prefix_for(path), "/").await?;
        if listing.objects.is_empty() && listing.common_prefixes.is_empty() {
            return Err(FsError::not_found("scandir", path));
        }
        let prefix = Self::prefix_for(path);
        let mut names: BTreeSet<String> = BTreeSet::new();
        for obj in &listing.objects {
            if let Some(rest) = obj.key.strip_prefix(&prefix) {
                if !rest.is_empty() {
                    names.insert(rest.to_owned());
                }
            }
        }
        for cp in &listing.common_prefixes {
            if let Some(rest) = cp.strip_prefix(&prefix) {
                names.insert(rest.trim_end_matches('/').to_owned());
            }
        }
        Ok(names.into_iter().collect())
    }

    async fn mkdir(&self, _path: &str, recursive: bool) -> Result<(), FsError> {
        // Blob stores have no directory objects; creating one is a no-op
        // once it would be idempotent, and an error otherwise would be
        // unobservable (there is nothing to collide with).
        if recursive {
            Ok(())
        } else {
            Ok(())
        }
    }

    async fn rm(&self, path: &str, options: RmOptions) -> Result<(), FsError> {
        let key = Self::key_for(path);
        if self.bucket.get(&key).await?.is_some() {
            return self.bucket.delete(&key).await;
        }
        let listing = self.bucket.list(&Self::prefix_for(path), "").await?;
        if listing.objects.is_empty() {
            return if options.force { Ok(()) } else { Err(FsError::not_found("rm", path)) };
        }
        if !options.recursive {
            return Err(FsError::not_empty("rm", path));
        }
        for obj in listing.objects {
            self.bucket.delete(&obj.key).await?;
        }
        Ok(())
    }

    async fn cp(&self, src: &str, dest: &str, recursive: bool) -> Result<(), FsError> {
        if let Some(bytes) = self.bucket.get(&Self::key_for(src)).await? {
            return self.bucket.put(&Self::key_for(dest), &bytes).await;
        }
        if !recursive {
            return Err(FsError::not_found("cp", src));
        }
        let listing = self.bucket.list(&Self::prefix_for(src), "").await?;
        let src_prefix = Self::prefix_for(src);
        let dest_prefix = Self::prefix_for(dest);
        for obj in listing.objects {
            let Some(rel) = obj.key.strip_prefix(&src_prefix) else { continue };
            let bytes = self.bucket.get(&obj.key).await?.unwrap_or_default();
            self.bucket.put(&format!("{dest_prefix}{rel}"), &bytes).await?;
        }
        Ok(())
    }

    async fn chmod(&self, _path: &str, _mode: u32) -> Result<(), FsError> {
        Ok(())
    }

    async fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError> {
        self.bucket.put(&Self::key_for(link_path), target.as_bytes()).await
    }

    async fn readlink(&self, path: &str) -> Result<String, FsError> {
        let bytes = self.read_file_buffer(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn utimes(&self, _path: &str, _mtime: OffsetDateTime) -> Result<(), FsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct InMemoryBucket {
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl InMemoryBucket {
        fn new() -> Self {
            Self { objects: Mutex::new(HashMap::new()) }
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

        async fn list(&self, prefix: &str, _delimiter: &str) -> Result<ListResult, FsError> {
            let objects = self
                .objects
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| ListEntry { key: k.clone(), size: v.len() as u64 })
                .collect();
            Ok(ListResult { objects, common_prefixes: vec![] })
        }
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let adapter = R2Adapter::new(Arc::new(InMemoryBucket::new()));
        adapter.write_file("/a/b.txt", b"hi").await.unwrap();
        assert_eq!(adapter.read_file_buffer("/a/b.txt").await.unwrap(), b"hi");
    }

    #[tokio::test]
    async fn readdir_lists_pseudo_directory_contents() {
        let adapter = R2Adapter::new(Arc::new(InMemoryBucket::new()));
        adapter.write_file("/dir/a.txt", b"1").await.unwrap();
        adapter.write_file("/dir/b.txt", b"2").await.unwrap();
        let mut entries = adapter.readdir("/dir").await.unwrap();
        entries.sort();
        assert_eq!(entries, vec!["a.txt".to_owned(), "b.txt".to_owned()]);
    }
}
