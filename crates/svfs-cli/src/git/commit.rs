use clap::Args;

use crate::shell::{CliError, Shell};

const BUILTIN_NAME: &str = "svfs";
const BUILTIN_EMAIL: &str = "svfs@localhost";

#[derive(Args, Debug)]
pub struct CommitArgs {
    #[arg(short = 'm', long = "message")]
    pub message: String,

    /// `"Name <email>"`. Defaults to `GIT_AUTHOR_NAME`/`GIT_AUTHOR_EMAIL`,
    /// then to a built-in identity (§4.6).
    #[arg(long)]
    pub author: Option<String>,
}

fn parse_author(raw: &str) -> (String, String) {
    match raw.rsplit_once(" <") {
        Some((name, rest)) => (name.trim().to_owned(), rest.trim_end_matches('>').to_owned()),
        None => (raw.trim().to_owned(), BUILTIN_EMAIL.to_owned()),
    }
}

fn default_author() -> (String, String) {
    let name = std::env::var("GIT_AUTHOR_NAME").unwrap_or_else(|_| BUILTIN_NAME.to_owned());
    let email = std::env::var("GIT_AUTHOR_EMAIL").unwrap_or_else(|_| BUILTIN_EMAIL.to_owned());
    (name, email)
}

/// # Errors
/// `CliError::fatal` outside a git mount; `CliError::usage` if there is
/// nothing to commit.
pub async fn run(shell: &Shell, at: &str, args: CommitArgs) -> Result<String, CliError> {
    let (_, fs) = shell.require_git_mount(at)?;
    let (name, email) = args.author.as_deref().map_or_else(default_author, parse_author);
    let oid = fs.commit(&args.message, &name, &email).await.map_err(|e| CliError::from_fs_error("commit", e))?;
    Ok(format!("[{} {}] {}", fs.ref_name().await, &oid[..oid.len().min(7)], args.message))
}
