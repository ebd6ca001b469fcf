//! In-memory implementation of the blob-store adapter (§2, "Mock blob
//! bucket"): the same shape the overlay and blob-store tests reach for, but
//! shared here so integration tests and the CLI's test harness don't each
//! redefine it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use svfs_core::FsError;
use svfs_store::{BlobBucket, ListEntry, ListResult};

/// An in-process, in-memory [`BlobBucket`]. State lives only for the
/// lifetime of the value — there is no real persistence, which is exactly
/// what makes it suitable for tests that want to assert on overlay
/// round-trips without a network round trip.
#[derive(Default)]
pub struct MockBucket {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockBucket {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobBucket for MockBucket {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FsError> {
        Ok(self.objects.lock().expect("mock bucket lock poisoned").get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), FsError> {
        self.objects.lock().expect("mock bucket lock poisoned").insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), FsError> {
        self.objects.lock().expect("mock bucket lock poisoned").remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str, delimiter: &str) -> Result<ListResult, FsError> {
        let objects = self.objects.lock().expect("mock bucket lock poisoned");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let bucket = MockBucket::new();
        bucket.put("u1:/data:/a.txt", b"hi").await.unwrap();
        assert_eq!(bucket.get("u1:/data:/a.txt").await.unwrap(), Some(b"hi".to_vec()));
    }

    #[tokio::test]
    async fn list_splits_on_delimiter() {
        let bucket = MockBucket::new();
        bucket.put("root/a/one.txt", b"1").await.unwrap();
        bucket.put("root/b.txt", b"2").await.unwrap();
        let listing = bucket.list("root/", "/").await.unwrap();
        assert_eq!(listing.objects.len(), 1);
        assert_eq!(listing.common_prefixes, vec!["root/a/".to_owned()]);
    }
}
