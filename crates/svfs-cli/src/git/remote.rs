use crate::shell::{CliError, Shell};

/// # Errors
/// `CliError::fatal` outside a git mount.
pub async fn run(shell: &Shell, at: &str) -> Result<String, CliError> {
    let (_, fs) = shell.require_git_mount(at)?;
    Ok(format!("origin\t{} (fetch)\norigin\t{} (push)", fs.url(), fs.url()))
}
