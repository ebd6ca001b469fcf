//! Environment-derived configuration for the CLI's boot wiring. No config
//! file format of its own — fstab (§4.3) already owns persisted mount
//! state; this is just the handful of values needed to *reach* the
//! collaborator services fstab entries point at.

/// `SVFS_USER_ID` — scopes the embedded row-store table and every blob key
/// this process writes (§3, "(userId, mountPoint)"). Defaults to `"user"`
/// for single-tenant local use.
///
/// `SVFS_R2_BASE_URL` / `SVFS_R2_TOKEN` — the blob-store endpoint backing
/// both the `/data` `r2` mount and every `git` mount's overlay persistence
/// (§6). Defaults to a local dev endpoint; set both in any environment
/// where object storage is reachable over the network.
pub struct Config {
    pub user_id: String,
    pub r2_base_url: String,
    pub r2_token: Option<String>,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            user_id: std::env::var("SVFS_USER_ID").unwrap_or_else(|_| "user".to_owned()),
            r2_base_url: std::env::var("SVFS_R2_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8787".to_owned()),
            r2_token: std::env::var("SVFS_R2_TOKEN").ok(),
        }
    }
}
