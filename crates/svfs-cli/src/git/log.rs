use clap::Args;

use crate::shell::{CliError, Shell};

#[derive(Args, Debug, Default)]
pub struct LogArgs {
    #[arg(long)]
    pub oneline: bool,

    /// `-n N`.
    #[arg(short = 'n', value_name = "N")]
    pub count: Option<usize>,

    /// The `git log -N` shorthand (a bare number with no `-n`), e.g. `-5`.
    /// Clap sees this as an unparsed leading flag, so it is collected here
    /// and resolved against `count` in [`run`].
    #[arg(allow_hyphen_values = true, hide = true)]
    pub dash_number: Option<String>,
}

fn resolve_limit(args: &LogArgs) -> usize {
    if let Some(n) = args.count {
        return n;
    }
    if let Some(raw) = &args.dash_number {
        if let Some(n) = raw.strip_prefix('-').and_then(|s| s.parse().ok()) {
            return n;
        }
    }
    usize::MAX
}

/// # Errors
/// `CliError::fatal` outside a git mount.
pub async fn run(shell: &Shell, at: &str, args: LogArgs) -> Result<String, CliError> {
    let (_, fs) = shell.require_git_mount(at)?;
    let limit = resolve_limit(&args);
    let entries = fs.log_entries(limit).await.map_err(|e| CliError::from_fs_error("log", e))?;
    if entries.is_empty() {
        return Ok(String::new());
    }
    let lines: Vec<String> = entries
        .iter()
        .map(|(oid, message)| {
            let summary = message.lines().next().unwrap_or("");
            if args.oneline {
                format!("{} {}", &oid[..oid.len().min(7)], summary)
            } else {
                format!("commit {oid}\n\n    {summary}\n")
            }
        })
        .collect();
    Ok(lines.join(if args.oneline { "\n" } else { "\n" }))
}
