//! Test collaborators for svfs (§2, "Mock Git server", "Mock blob bucket"):
//! an in-memory [`BlobBucket`] and an in-process Git smart-HTTP server, so
//! integration tests exercise the real wire protocols without touching the
//! network.

pub mod bucket;
pub mod git_server;

pub use bucket::MockBucket;
pub use git_server::MockGitServer;
