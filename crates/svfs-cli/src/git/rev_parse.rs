use clap::Args;

use crate::shell::{CliError, Shell};

#[derive(Args, Debug, Default)]
pub struct RevParseArgs {
    #[arg(long)]
    pub short: bool,

    /// Accepted and ignored — the only ref this command surface resolves is
    /// the tracked branch tip, so `HEAD` is the only meaningful argument.
    #[arg(default_value = "HEAD")]
    pub rev: String,
}

/// # Errors
/// `CliError::fatal` outside a git mount.
pub async fn run(shell: &Shell, at: &str, args: RevParseArgs) -> Result<String, CliError> {
    let (_, fs) = shell.require_git_mount(at)?;
    let oid = fs.head_commit_oid().await;
    Ok(if args.short { oid[..oid.len().min(7)].to_owned() } else { oid })
}
