//! The single polymorphic filesystem capability (§4.1) every adapter, the
//! router, and the git overlay implement.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::FsError;

/// Stat information about a path. Exactly one of `is_file`, `is_directory`,
/// `is_symbolic_link` is true.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsStat {
    pub is_file: bool,
    pub is_directory: bool,
    pub is_symbolic_link: bool,
    pub mode: u32,
    pub size: u64,
    pub mtime: OffsetDateTime,
}

impl FsStat {
    #[must_use]
    pub fn file(mode: u32, size: u64, mtime: OffsetDateTime) -> Self {
        Self { is_file: true, is_directory: false, is_symbolic_link: false, mode, size, mtime }
    }

    #[must_use]
    pub fn directory(mode: u32, mtime: OffsetDateTime) -> Self {
        Self { is_file: false, is_directory: true, is_symbolic_link: false, mode, size: 0, mtime }
    }

    #[must_use]
    pub fn symlink(mode: u32, mtime: OffsetDateTime) -> Self {
        Self { is_file: false, is_directory: false, is_symbolic_link: true, mode, size: 0, mtime }
    }
}

/// Text encodings `readFile` may decode raw bytes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadEncoding {
    Utf8,
    Ascii,
    Binary,
    Base64,
    Hex,
    Latin1,
}

impl ReadEncoding {
    /// Parse the encoding name accepted by `readFile`'s optional argument.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "utf8" | "utf-8" => Some(Self::Utf8),
            "ascii" => Some(Self::Ascii),
            "binary" => Some(Self::Binary),
            "base64" => Some(Self::Base64),
            "hex" => Some(Self::Hex),
            "latin1" => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Decode raw bytes into the string form requested by this encoding.
    ///
    /// # Errors
    /// Returns an error if `bytes` is not valid for the requested encoding
    /// (e.g. invalid UTF-8, or a non-ASCII byte under `Ascii`).
    pub fn decode(self, bytes: &[u8]) -> Result<String, std::string::FromUtf8Error> {
        match self {
            Self::Utf8 | Self::Binary | Self::Latin1 => {
                // `Latin1`/`Binary` are rendered lossily like the source runtime does;
                // callers that need exact latin1 semantics should read raw bytes instead.
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
            Self::Ascii => String::from_utf8(bytes.to_vec()),
            Self::Base64 => {
                use base64::Engine as _;
                Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Self::Hex => Ok(bytes.iter().map(|b| format!("{b:02x}")).collect()),
        }
    }
}

/// Flags controlling [`FileSystem::rm`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RmOptions {
    pub recursive: bool,
    pub force: bool,
}

/// The capability every backing store (in-memory, row-store, blob-store,
/// cloud-drive, git overlay) and the mount router itself implement.
///
/// Every path argument is normalised and absolute **relative to the
/// implementor's own root** — the router strips the mount prefix before
/// dispatching.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError>;

    async fn read_file(&self, path: &str, encoding: Option<ReadEncoding>) -> Result<Vec<u8>, FsError> {
        let bytes = self.read_file_buffer(path).await?;
        match encoding {
            None => Ok(bytes),
            Some(enc) => enc
                .decode(&bytes)
                .map(String::into_bytes)
                .map_err(|e| FsError::invalid_arg("read", path, e.to_string())),
        }
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError>;

    async fn append_file(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let mut existing = match self.read_file_buffer(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        existing.extend_from_slice(contents);
        self.write_file(path, &existing).await
    }

    async fn exists(&self, path: &str) -> bool {
        self.stat(path).await.is_ok()
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError>;

    /// Like `stat`, but does not follow a terminal symbolic link.
    async fn lstat(&self, path: &str) -> Result<FsStat, FsError> {
        self.stat(path).await
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError>;

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), FsError>;

    async fn rm(&self, path: &str, options: RmOptions) -> Result<(), FsError>;

    async fn cp(&self, src: &str, dest: &str, recursive: bool) -> Result<(), FsError>;

    async fn mv(&self, src: &str, dest: &str) -> Result<(), FsError> {
        self.cp(src, dest, true).await?;
        self.rm(src, RmOptions { recursive: true, force: false }).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<(), FsError>;

    /// Hard link. Not modelled at the inode level (§1 Non-goals); emulated
    /// as a file copy, same as the source runtime's polyfill on filesystems
    /// without real hard-link support.
    async fn link(&self, existing_path: &str, new_path: &str) -> Result<(), FsError> {
        self.cp(existing_path, new_path, false).await
    }

    async fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError>;

    async fn readlink(&self, path: &str) -> Result<String, FsError>;

    async fn realpath(&self, path: &str) -> Result<String, FsError> {
        Ok(crate::path::normalize(path))
    }

    async fn utimes(&self, path: &str, mtime: OffsetDateTime) -> Result<(), FsError>;

    /// Resolve `path` as this adapter would before dispatching an operation
    /// on it (normalisation only; adapters with indirection like the
    /// cloud-drive path→id cache may override).
    async fn resolve_path(&self, path: &str) -> Result<String, FsError> {
        Ok(crate::path::normalize(path))
    }
}
