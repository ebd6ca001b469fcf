use clap::Args;

use super::difftext::unified_diff;
use crate::shell::{CliError, Shell};

#[derive(Args, Debug, Default)]
pub struct DiffArgs {
    #[arg(long)]
    pub name_only: bool,
    #[arg(long)]
    pub stat: bool,
}

async fn render(shell: &Shell, at: &str, args: &DiffArgs) -> Result<String, CliError> {
    let (_, fs) = shell.require_git_mount(at)?;
    let status = fs.status().await.map_err(|e| CliError::from_fs_error("diff", e))?;

    let mut paths: Vec<&String> = status.added.iter().chain(status.modified.iter()).chain(status.deleted.iter()).collect();
    paths.sort();

    if args.name_only {
        return Ok(paths.into_iter().cloned().collect::<Vec<_>>().join("\n"));
    }

    let mut stat_lines = Vec::new();
    let mut diff_text = String::new();
    for path in paths {
        let old = fs.read_tree_file(path).await.map_err(|e| CliError::from_fs_error("diff", e))?.unwrap_or_default();
        let new = fs.read_overlay_file(path).await.map_err(|e| CliError::from_fs_error("diff", e))?.unwrap_or_default();
        let old_text = String::from_utf8_lossy(&old);
        let new_text = String::from_utf8_lossy(&new);
        if args.stat {
            let changed = old_text.lines().count().max(new_text.lines().count());
            stat_lines.push(format!(" {path} | {changed} {}", "+".repeat(changed.min(20))));
            continue;
        }
        if let Some(hunk) = unified_diff(path, &old_text, &new_text) {
            diff_text.push_str(&hunk);
        }
    }
    if args.stat {
        return Ok(stat_lines.join("\n"));
    }
    Ok(diff_text.trim_end_matches('\n').to_owned())
}

/// # Errors
/// `CliError::fatal` outside a git mount.
pub async fn run(shell: &Shell, at: &str, args: DiffArgs) -> Result<String, CliError> {
    render(shell, at, &args).await
}
