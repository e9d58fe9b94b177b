//! Command-line front end logic
//!
//! The `blink` binary parses its arguments and hands a [`Command`] to [`run`],
//! which loads the configuration, logs in and executes the command.

pub mod logging;
pub mod login;
pub mod videos;

#[cfg(test)]
pub(crate) mod mock;

use crate::{
    BlinkApi, BlinkClient, Settings,
    config::ConfigLoader,
    error::{format_error, format_error_for_logging},
    types::TokenRotation,
    utils::VERSION,
};
use anyhow::Result;
use std::path::PathBuf;
use tokio::io::BufReader;

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Debug logging
    pub verbose: bool,
    /// Refresh token overriding the configured one
    pub refresh_token: Option<String>,
}

/// What to do once logged in
#[derive(Debug, Clone)]
pub enum Command {
    /// Log in and print a refresh token
    Login,
    /// Print the dashboard's sync modules
    Dashboard,
    /// List clips
    Videos { all: bool },
    /// Download clips
    Download {
        out: PathBuf,
        clip: Option<String>,
        tries: Option<u32>,
    },
    /// Delete a clip
    Delete { clip: String },
}

/// Resolve settings from `--config`, `BLINK_CONFIG` or the default location,
/// then apply the command-line overrides
pub fn load_settings(args: &GlobalArgs) -> Result<Settings> {
    let config_path = args.config.clone().or_else(ConfigLoader::get_config_path);
    let mut settings = ConfigLoader::new().load(config_path.as_deref())?;

    if let Some(token) = &args.refresh_token {
        settings.account.refresh_token = Some(token.clone());
    }
    settings.logging.verbose = args.verbose;
    Ok(settings)
}

/// Run one command end to end
pub async fn run(args: GlobalArgs, command: Command) -> Result<()> {
    let settings = load_settings(&args)?;
    logging::init_logging(&settings.logging);
    tracing::debug!("blink v{}", VERSION);

    let client = BlinkClient::new(settings)?;
    let is_login = matches!(command, Command::Login);

    let authentication = login::resolve_authentication(client.settings(), is_login)?;
    let mut stdin = BufReader::new(tokio::io::stdin());
    login::interactive_login(&client, authentication, &mut stdin).await?;

    let outcome = match command {
        Command::Login => {
            println!("Logged in");
            Ok(())
        }
        Command::Dashboard => videos::run_dashboard(&client).await,
        Command::Videos { all } => videos::run_list(&client, all).await,
        Command::Download { out, clip, tries } => {
            let tries = tries.unwrap_or(client.settings().video.clip_try_count);
            videos::run_download(&client, &out, clip.as_deref(), tries)
                .await
                .map(|_| ())
        }
        Command::Delete { clip } => videos::run_delete(&client, &clip).await,
    };

    if let Err(e) = &outcome
        && let Some(error) = e.downcast_ref::<crate::Error>()
    {
        tracing::error!(
            details = %format_error_for_logging(error),
            "{}",
            format_error(error)
        );
    }

    // Rotations are reported even when the command failed
    report_token_rotation(&client, is_login).await;
    outcome
}

/// Print the newest rotated refresh token so it can be stored for the next run
///
/// The login command prints it on stdout; other commands keep stdout for
/// their own output and use stderr.
pub async fn report_token_rotation<C: BlinkApi + ?Sized>(
    client: &C,
    to_stdout: bool,
) -> Option<TokenRotation> {
    let newest = client.drain_token_rotations().await.into_iter().last()?;
    if to_stdout {
        println!("Refresh token: {}", newest.refresh_token);
    } else {
        eprintln!(
            "Refresh token rotated; store it for the next run: {}",
            newest.refresh_token
        );
    }
    Some(newest)
}
