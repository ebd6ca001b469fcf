use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use svfs::{config::Config, telemetry};
use svfs_cli::git::GitArgs;
use svfs_cli::mount::MountArgs;

/// sandboxed-shell virtual filesystem: mount router, fstab boot, and the
/// `git` command surface over Git-backed overlay mounts.
#[derive(Parser)]
#[command(name = "svfs")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount a filesystem: `mount [-t type] [-o opts] device mountpoint`.
    Mount(MountArgs),
    /// Unmount a previously mounted filesystem.
    Umount { mountpoint: String },
    /// Git command surface: clone, status, commit, push, pull, log, diff,
    /// branch, remote, show, rev-parse.
    Git(GitArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _telemetry = telemetry::init();
    let config = Config::from_env();
    let app = svfs::bootstrap(&config).await.context("boot failed")?;

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Mount(args) => svfs_cli::mount::mount(&app.shell, &app.registry, args).await.map(|()| String::new()),
        Commands::Umount { mountpoint } => svfs_cli::mount::umount(&app.shell, &mountpoint).map(|()| String::new()),
        Commands::Git(args) => svfs_cli::git::run(&app.shell, args).await,
    };

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code);
        }
    }
}
