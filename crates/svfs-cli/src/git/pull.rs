use crate::shell::{CliError, Shell};

/// # Errors
/// `CliError::fatal` outside a git mount; `CliError::usage` if there are
/// unpushed local commits or the fetch/merge fails.
pub async fn run(shell: &Shell, at: &str) -> Result<String, CliError> {
    let (_, fs) = shell.require_git_mount(at)?;
    let (updated, from, to) = fs.pull().await.map_err(|e| CliError::from_fs_error("pull", e))?;
    if !updated {
        return Ok("Already up to date.".to_owned());
    }
    Ok(format!("Updating {}..{}\nFast-forward", &from[..from.len().min(7)], &to[..to.len().min(7)]))
}
