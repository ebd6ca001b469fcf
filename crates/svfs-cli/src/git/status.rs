use clap::Args;

use crate::shell::{CliError, Shell};

#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    #[arg(short = 's', long = "short")]
    pub short: bool,
}

/// # Errors
/// `CliError::fatal` outside a git mount.
pub async fn run(shell: &Shell, at: &str, args: StatusArgs) -> Result<String, CliError> {
    let (_, fs) = shell.require_git_mount(at)?;
    let status = fs.status().await.map_err(|e| CliError::from_fs_error("status", e))?;

    if args.short {
        let mut lines: Vec<String> = Vec::new();
        lines.extend(status.added.iter().map(|p| format!("A  {p}")));
        lines.extend(status.modified.iter().map(|p| format!("M  {p}")));
        lines.extend(status.deleted.iter().map(|p| format!("D  {p}")));
        lines.sort();
        return Ok(lines.join("\n"));
    }

    let mut out = format!("On branch {}", fs.ref_name().await);
    if fs.has_unpushed_commits().await {
        out.push_str("\nYour branch is ahead of origin.");
    }
    if status.added.is_empty() && status.modified.is_empty() && status.deleted.is_empty() {
        out.push_str("\nnothing to commit, working tree clean");
        return Ok(out);
    }
    if !status.modified.is_empty() || !status.deleted.is_empty() {
        out.push_str("\nChanges not staged for commit:");
        for p in &status.modified {
            out.push_str(&format!("\n\tmodified:   {p}"));
        }
        for p in &status.deleted {
            out.push_str(&format!("\n\tdeleted:    {p}"));
        }
    }
    if !status.added.is_empty() {
        out.push_str("\nUntracked files:");
        for p in &status.added {
            out.push_str(&format!("\n\t{p}"));
        }
    }
    Ok(out)
}
