//! The `git` command surface (§4.6): `clone, status, commit, push, pull,
//! log, diff, branch, remote, show, rev-parse`, each mapped onto the
//! corresponding [`svfs_git::GitOverlayFs`] operation.

mod branch;
mod clone;
mod commit;
mod difftext;
mod diff;
mod log;
mod pull;
mod push;
mod remote;
mod rev_parse;
mod show;
mod status;

use clap::{Args, Subcommand};

use crate::shell::{CliError, Shell};

#[derive(Args, Debug)]
pub struct GitArgs {
    /// Run as if started in `<path>` instead of the current directory.
    /// Repeatable, folded left to right like repeated `cd` (§4.6).
    #[arg(short = 'C', value_name = "path")]
    pub dash_c: Vec<String>,

    #[command(subcommand)]
    pub command: GitCommand,
}

#[derive(Subcommand, Debug)]
pub enum GitCommand {
    /// Clone a remote repository into a new `git` mount.
    Clone(clone::CloneArgs),
    /// Show overlay vs. committed-tree status.
    Status(status::StatusArgs),
    /// Fold pending overlay writes/deletes into a new commit.
    Commit(commit::CommitArgs),
    /// Push the tracked ref to its remote.
    Push(push::PushArgs),
    /// Fast-forward pull the tracked ref from its remote.
    Pull,
    /// Show commit history.
    Log(log::LogArgs),
    /// Show the diff between the committed tree and the overlay.
    Diff(diff::DiffArgs),
    /// Print the tracked branch name.
    Branch,
    /// Print the remote URL.
    Remote,
    /// Show a single committed file's contents.
    Show(show::ShowArgs),
    /// Print the current commit OID.
    #[command(name = "rev-parse")]
    RevParse(rev_parse::RevParseArgs),
}

/// Dispatch a parsed `git` invocation. `registry`/`user_id`/`bucket` are only
/// needed by `clone`, which has no existing mount to resolve against.
///
/// # Errors
/// Whatever the dispatched subcommand returns.
pub async fn run(shell: &Shell, args: GitArgs) -> Result<String, CliError> {
    let at = shell.resolve_cwd(&args.dash_c);
    match args.command {
        GitCommand::Clone(a) => clone::run(shell, &at, a).await,
        GitCommand::Status(a) => status::run(shell, &at, a).await,
        GitCommand::Commit(a) => commit::run(shell, &at, a).await,
        GitCommand::Push(a) => push::run(shell, &at, a).await,
        GitCommand::Pull => pull::run(shell, &at).await,
        GitCommand::Log(a) => log::run(shell, &at, a).await,
        GitCommand::Diff(a) => diff::run(shell, &at, a).await,
        GitCommand::Branch => branch::run(shell, &at).await,
        GitCommand::Remote => remote::run(shell, &at).await,
        GitCommand::Show(a) => show::run(shell, &at, a).await,
        GitCommand::RevParse(a) => rev_parse::run(shell, &at, a).await,
    }
}
