//! The error kinds shared by every filesystem adapter (§7).

use std::fmt;

/// The closed set of error kinds an adapter may surface across the
/// [`crate::fs::FileSystem`] boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FsErrorKind {
    NotFound,
    NotDirectory,
    IsDirectory,
    Exists,
    NotEmpty,
    InvalidArg,
    PermissionDenied,
    NotSupported,
    IoError,
}

impl fmt::Display for FsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "NotFound",
            Self::NotDirectory => "NotDirectory",
            Self::IsDirectory => "IsDirectory",
            Self::Exists => "Exists",
            Self::NotEmpty => "NotEmpty",
            Self::InvalidArg => "InvalidArg",
            Self::PermissionDenied => "PermissionDenied",
            Self::NotSupported => "NotSupported",
            Self::IoError => "IoError",
        };
        f.write_str(s)
    }
}

/// An error raised by a filesystem adapter, rendered as
/// `"<KIND>: <detail>, <syscall> '<path>'"` per §7.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {detail}, {syscall} '{path}'")]
pub struct FsError {
    pub kind: FsErrorKind,
    pub syscall: &'static str,
    pub path: String,
    pub detail: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl FsError {
    #[must_use]
    pub fn new(kind: FsErrorKind, syscall: &'static str, path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            syscall,
            path: path.into(),
            detail: detail.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn not_found(syscall: &'static str, path: impl Into<String>) -> Self {
        Self::new(FsErrorKind::NotFound, syscall, path, "no such file or directory")
    }

    #[must_use]
    pub fn not_directory(syscall: &'static str, path: impl Into<String>) -> Self {
        Self::new(FsErrorKind::NotDirectory, syscall, path, "not a directory")
    }

    #[must_use]
    pub fn is_directory(syscall: &'static str, path: impl Into<String>) -> Self {
        Self::new(FsErrorKind::IsDirectory, syscall, path, "is a directory")
    }

    #[must_use]
    pub fn exists(syscall: &'static str, path: impl Into<String>) -> Self {
        Self::new(FsErrorKind::Exists, syscall, path, "file already exists")
    }

    #[must_use]
    pub fn not_empty(syscall: &'static str, path: impl Into<String>) -> Self {
        Self::new(FsErrorKind::NotEmpty, syscall, path, "directory not empty")
    }

    #[must_use]
    pub fn invalid_arg(syscall: &'static str, path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(FsErrorKind::InvalidArg, syscall, path, detail)
    }

    #[must_use]
    pub fn not_supported(syscall: &'static str, path: impl Into<String>) -> Self {
        Self::new(FsErrorKind::NotSupported, syscall, path, "operation not supported")
    }

    #[must_use]
    pub fn io(syscall: &'static str, path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            kind: FsErrorKind::IoError,
            syscall,
            path: path.into(),
            detail: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind, FsErrorKind::NotFound)
    }

    #[must_use]
    pub const fn is_exists(&self) -> bool {
        matches!(self.kind, FsErrorKind::Exists)
    }

    #[must_use]
    pub const fn is_not_directory(&self) -> bool {
        matches!(self.kind, FsErrorKind::NotDirectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_spec_form() {
        let err = FsError::not_found("open", "/etc/fstab");
        assert_eq!(
            err.to_string(),
            "NotFound: no such file or directory, open '/etc/fstab'"
        );
    }
}
