//! Shared Git data-model types (§3): tree entries, status, and the
//! persisted metadata document.

use serde::{Deserialize, Serialize};

/// A single entry of a Git tree object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GitTreeEntry {
    /// Octal mode string, e.g. `"100644"`, `"040000"`, `"120000"`.
    pub mode: String,
    /// The path component name (not a full path).
    pub path: String,
    /// 40-hex object id.
    pub oid: String,
    pub entry_type: TreeEntryType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEntryType {
    Blob,
    Tree,
    Commit,
}

/// Overlay vs. committed-tree status (§4.5.5).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GitStatus {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

/// Persisted at `/.git/meta.json` in the overlay blob store (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitMetadata {
    pub commit_oid: String,
    pub remote_oid: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub url: String,
    /// Unix seconds of the committer timestamp of `commit_oid`.
    pub commit_mtime: i64,
    pub deleted: Vec<String>,
    pub depth: u32,
}

impl GitMetadata {
    #[must_use]
    pub fn has_unpushed_commits(&self) -> bool {
        self.commit_oid != self.remote_oid
    }
}

/// The JSON document serialising the entire in-memory object-database
/// filesystem, persisted at `/.git/pack.json` (§3).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PackSnapshot {
    pub files: std::collections::BTreeMap<String, String>,
    pub dirs: Vec<String>,
}
