//! svfs-core — the filesystem capability contract, the mount router that
//! dispatches onto it, and the fstab/boot machinery that assembles a router
//! from persisted configuration.
//!
//! Every backing store (in-memory, row-store, blob-store, cloud-drive,
//! git-backed overlay) implements [`fs::FileSystem`]; the [`router::Router`]
//! composes them by longest mount-point prefix.

pub mod boot;
pub mod error;
pub mod fs;
pub mod fstab;
pub mod memfs;
pub mod path;
pub mod router;

pub use error::{FsError, FsErrorKind};
pub use fs::{FileSystem, FsStat, ReadEncoding, RmOptions};
pub use router::{MountEntry, Router};
