//! Blob-store (R2), row-store (D1), and cloud-drive filesystem adapters.
//!
//! Each adapter implements [`svfs_core::FileSystem`] so the mount router can
//! dispatch onto it without knowing which backing store it actually talks
//! to.

pub mod blob;
pub mod gdrive;
pub mod row;

pub use blob::{BlobBucket, ListEntry, ListResult, R2Adapter};
pub use gdrive::GDriveAdapter;
pub use row::D1Adapter;
