use clap::Args;

use crate::shell::{CliError, Shell};

#[derive(Args, Debug, Default)]
pub struct PushArgs {
    /// Accepted and ignored, e.g. `git push origin main` — there is only
    /// ever one remote and one tracked ref per mount (§4.6).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub remote_and_ref: Vec<String>,
}

/// # Errors
/// `CliError::fatal` outside a git mount; `CliError::usage` if the push
/// subprocess fails.
pub async fn run(shell: &Shell, at: &str, _args: PushArgs) -> Result<String, CliError> {
    let (_, fs) = shell.require_git_mount(at)?;
    if !fs.has_unpushed_commits().await {
        return Ok("Everything up-to-date".to_owned());
    }
    fs.push().await.map_err(|e| CliError::from_fs_error("push", e))?;
    Ok(format!("pushed to origin/{}", fs.ref_name().await))
}
