//! Interactive login
//!
//! Picks the authentication mode from the settings and drives the
//! verification loop, reading one-time codes line by line.

use crate::{
    BlinkApi, Settings,
    types::{AuthChallengeResult, Authentication},
};
use anyhow::{Result, anyhow, bail};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

/// Choose how to authenticate from the configured account
///
/// A stored refresh token is preferred unless `prefer_credentials` is set, in
/// which case email and password win when both are configured.
pub fn resolve_authentication(
    settings: &Settings,
    prefer_credentials: bool,
) -> Result<Authentication> {
    let account = &settings.account;

    let credentials = match (account.email.as_deref(), account.password.as_deref()) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            Some(Authentication::credentials(email, password))
        }
        _ => None,
    };
    let refresh_token = account
        .refresh_token
        .as_deref()
        .filter(|token| !token.is_empty())
        .map(Authentication::refresh_token);

    let chosen = if prefer_credentials {
        credentials.or(refresh_token)
    } else {
        refresh_token.or(credentials)
    };

    chosen.ok_or_else(|| {
        anyhow!(
            "no account configured: set account.email and account.password \
             (or BLINK_EMAIL and BLINK_PASSWORD), or pass --refresh-token"
        )
    })
}

/// Authenticate, prompting for codes on `input` while the server asks for one
pub async fn interactive_login<C, R>(
    client: &C,
    authentication: Authentication,
    input: &mut R,
) -> Result<()>
where
    C: BlinkApi + ?Sized,
    R: AsyncBufRead + Unpin,
{
    let kind = authentication.kind();
    match client.authenticate(authentication).await? {
        AuthChallengeResult::Accepted => {
            info!("Logged in with {}", kind);
            Ok(())
        }
        AuthChallengeResult::Rejected => {
            bail!("login with {} was rejected; check the account settings", kind)
        }
        AuthChallengeResult::ChallengePending => {
            eprintln!("Enter the verification code sent by Blink:");
            verify_until_accepted(client, input).await
        }
    }
}

async fn verify_until_accepted<C, R>(client: &C, input: &mut R) -> Result<()>
where
    C: BlinkApi + ?Sized,
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line).await? == 0 {
            bail!("input closed before a verification code was accepted");
        }

        let code = line.trim();
        if code.is_empty() {
            eprintln!("The code cannot be empty. Enter the verification code:");
            continue;
        }

        if client.verify_pin(code).await? {
            info!("Verification successful");
            return Ok(());
        }
        warn!("Verification code rejected");
        eprintln!("Invalid verification code. Try again:");
    }
}
