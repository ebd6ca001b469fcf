use clap::Args;

use crate::shell::{CliError, Shell};

#[derive(Args, Debug, Default)]
pub struct ShowArgs {
    #[arg(long)]
    pub stat: bool,
}

/// Displays the HEAD commit plus a diff of the current overlay against it.
/// Real Git would diff HEAD against its parent; this mount has no local
/// history beyond the shallow clone tip, so the overlay is the closest
/// approximation available (documented as such in the design notes).
///
/// # Errors
/// `CliError::fatal` outside a git mount.
pub async fn run(shell: &Shell, at: &str, args: ShowArgs) -> Result<String, CliError> {
    let (_, fs) = shell.require_git_mount(at)?;
    let oid = fs.head_commit_oid().await;
    let entries = fs.log_entries(1).await.map_err(|e| CliError::from_fs_error("show", e))?;
    let message = entries.first().map(|(_, m)| m.lines().next().unwrap_or("")).unwrap_or("");

    let mut out = format!("commit {oid}\n\n    {message}\n");
    let diff_args = super::diff::DiffArgs { name_only: false, stat: args.stat };
    let body = super::diff::run(shell, at, diff_args).await?;
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }
    Ok(out)
}
