//! Command-line client for Blink cloud cameras
//!
//! # Usage
//!
//! ## Log in and store the refresh token
//! ```bash
//! BLINK_EMAIL=me@example.com BLINK_PASSWORD=secret blink login
//! ```
//!
//! ## List and download clips
//! ```bash
//! blink --refresh-token "$TOKEN" videos --all
//! blink --refresh-token "$TOKEN" download --out ./clips --clip 1234
//! ```
//!
//! ## Help and Version
//! ```bash
//! blink --version
//! blink --help
//! blink download --help
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use blink_client::cli::{Command, GlobalArgs, run};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "blink")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Refresh token saved from an earlier login
    #[arg(long, global = true, value_name = "TOKEN")]
    refresh_token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in (with two-factor verification) and print a refresh token
    Login,

    /// Show the sync modules on the account's dashboard
    Dashboard,

    /// List clips stored on the sync module
    Videos {
        /// List clips from every sync module
        #[arg(long)]
        all: bool,
    },

    /// Download clips into a directory
    Download {
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Only download the clip with this id
        #[arg(long, value_name = "ID")]
        clip: Option<String>,

        /// Request/poll cycles per clip
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        tries: Option<u32>,
    },

    /// Delete a clip
    Delete {
        /// Id of the clip to delete
        #[arg(long, value_name = "ID")]
        clip: String,
    },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Login => Command::Login,
            Commands::Dashboard => Command::Dashboard,
            Commands::Videos { all } => Command::Videos { all },
            Commands::Download { out, clip, tries } => Command::Download { out, clip, tries },
            Commands::Delete { clip } => Command::Delete { clip },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let args = GlobalArgs {
        config: cli.config,
        verbose: cli.verbose,
        refresh_token: cli.refresh_token,
    };
    run(args, cli.command.into()).await
}
