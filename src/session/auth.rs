//! Authentication protocol
//!
//! Drives the login state machine against the vendor's OAuth endpoints (or
//! the legacy account login), owns the [`SessionState`] and keeps the access
//! token fresh.
//!
//! ```text
//! Unauthenticated ──login──▶ ChallengeIssued ──verify_pin──▶ Authenticated
//!        │                                                     │   ▲
//!        └──────────────login (no 2FA) / refresh token─────────┘   │
//!                                              near expiry ▼       │
//!                                                      Refreshing ─┘
//! ```
//!
//! Wrong passwords, pending 2FA and bad PINs are reported as values
//! ([`AuthChallengeResult`] or `bool`) so a caller can drive a
//! human-in-the-loop verification loop without inspecting HTTP statuses.

use crate::{
    Error, Result,
    config::Settings,
    session::{network::NetworkManager, transport::authorization_headers},
    types::{
        AuthChallengeResult, AuthMode, AuthState, Authentication, LegacyLoginRequest,
        LoginResponse, PinVerifyRequest, SessionState, TierInfo, TokenEnvelope,
        TokenGrantRequest, TokenRotation,
    },
    utils::http::{protocol_error, reason_phrase, read_json},
};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info, warn};
use url::Url;

const TOKEN_PATH: &str = "/oauth/token";
const TIER_INFO_PATH: &str = "/api/v1/users/tier_info";
const LEGACY_LOGIN_PATH: &str = "/api/v5/account/login";

/// Header carrying the one-time code on a verification grant
pub const TWO_FACTOR_HEADER: &str = "2fa-code";

/// Body text the server sends for a wrong or stale one-time code
const INVALID_CODE_MARKER: &str = "invalid or expired";

/// Login that is waiting for a one-time code
#[derive(Debug, Clone)]
enum PendingChallenge {
    /// Password grant to resubmit with the code
    OAuth { email: String, password: String },
    /// Legacy session waiting for PIN verification
    Legacy,
}

/// Channel carrying rotated refresh tokens to the caller
#[derive(Debug)]
struct RotationFeed {
    tx: mpsc::UnboundedSender<TokenRotation>,
    rx: Mutex<mpsc::UnboundedReceiver<TokenRotation>>,
}

impl RotationFeed {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    fn publish(&self, rotation: TokenRotation) {
        // The receiver lives as long as the feed, so sending cannot fail
        let _ = self.tx.send(rotation);
    }

    async fn drain(&self) -> Vec<TokenRotation> {
        let mut rx = self.rx.lock().await;
        let mut rotations = Vec::new();
        while let Ok(rotation) = rx.try_recv() {
            rotations.push(rotation);
        }
        rotations
    }
}

/// Login, verification and token refresh for one account
#[derive(Debug)]
pub struct AuthenticationProtocol {
    /// Configuration
    settings: Arc<Settings>,
    /// Client builder settings, for the user agent
    network: NetworkManager,
    /// Client for unauthenticated requests
    http: Client,
    /// Current credentials
    state: RwLock<SessionState>,
    /// Position in the login state machine
    phase: RwLock<AuthState>,
    /// Login waiting for a one-time code
    pending: Mutex<Option<PendingChallenge>>,
    /// Held while a silent refresh is in flight
    refresh_guard: Mutex<()>,
    /// Rotated refresh tokens not yet drained by the caller
    rotations: RotationFeed,
}

impl AuthenticationProtocol {
    /// Create an unauthenticated protocol instance
    pub fn new(settings: Arc<Settings>) -> Result<Self> {
        let network = NetworkManager::new(&settings);
        let http = network.plain_client()?;

        Ok(Self {
            settings,
            network,
            http,
            state: RwLock::new(SessionState::new()),
            phase: RwLock::new(AuthState::Unauthenticated),
            pending: Mutex::new(None),
            refresh_guard: Mutex::new(()),
            rotations: RotationFeed::new(),
        })
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Current state machine position
    pub async fn auth_state(&self) -> AuthState {
        *self.phase.read().await
    }

    /// Take every refresh token issued since the last call, oldest first
    pub async fn drain_token_rotations(&self) -> Vec<TokenRotation> {
        self.rotations.drain().await
    }

    /// Establish a session through any of the supported modes
    pub async fn authenticate(
        &self,
        authentication: Authentication,
    ) -> Result<AuthChallengeResult> {
        debug!("Authenticating with {}", authentication.kind());

        match authentication {
            Authentication::Credentials { email, password } => match self.settings.api.auth_mode {
                AuthMode::OAuth => self.login(&email, &password).await,
                AuthMode::Legacy => self.login_legacy(&email, &password, true).await,
            },
            Authentication::RefreshToken(token) => {
                if self.login_with_refresh_token(&token).await? {
                    Ok(AuthChallengeResult::Accepted)
                } else {
                    Ok(AuthChallengeResult::Rejected)
                }
            }
            Authentication::PresetSession(session) => {
                self.adopt_session(session).await?;
                Ok(AuthChallengeResult::Accepted)
            }
        }
    }

    /// Log in with a password grant
    ///
    /// Returns `ChallengePending` when the server wants a one-time code
    /// (HTTP 412) and `Rejected` for bad credentials (HTTP 401).
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthChallengeResult> {
        require_non_empty("email", email)?;
        require_non_empty("password", password)?;

        info!("Logging in with password grant");
        let grant = self.password_grant(email, password);
        let response = self
            .http
            .post(self.auth_endpoint(TOKEN_PATH)?)
            .form(&grant)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let envelope: TokenEnvelope = read_json("login", response).await?;
            self.complete_grant(envelope).await?;
            return Ok(AuthChallengeResult::Accepted);
        }

        match status {
            StatusCode::PRECONDITION_FAILED => {
                info!("Server requires two-factor verification");
                *self.pending.lock().await = Some(PendingChallenge::OAuth {
                    email: email.to_string(),
                    password: password.to_string(),
                });
                self.set_phase(AuthState::ChallengeIssued).await;
                Ok(AuthChallengeResult::ChallengePending)
            }
            StatusCode::UNAUTHORIZED => {
                warn!("Login rejected: wrong email or password");
                *self.pending.lock().await = None;
                self.set_phase(AuthState::Unauthenticated).await;
                Ok(AuthChallengeResult::Rejected)
            }
            _ => Err(protocol_error("login", response).await),
        }
    }

    /// Submit the one-time code for the pending login
    ///
    /// Returns `false` when the code is wrong or expired; the caller may
    /// retry with another code.
    pub async fn verify_pin(&self, code: &str) -> Result<bool> {
        require_non_empty("code", code)?;

        let pending = self.pending.lock().await.clone();
        match pending {
            Some(PendingChallenge::OAuth { email, password }) => {
                self.verify_oauth(&email, &password, code.trim()).await
            }
            Some(PendingChallenge::Legacy) => self.verify_legacy(code.trim()).await,
            None => Err(Error::validation(
                "code",
                "no login is waiting for verification; call login first",
            )),
        }
    }

    /// Log in with a refresh token saved from an earlier session
    ///
    /// Returns `false` when the server no longer accepts the token.
    pub async fn login_with_refresh_token(&self, refresh_token: &str) -> Result<bool> {
        require_non_empty("refresh_token", refresh_token)?;

        debug!("Requesting refresh token grant");
        let grant = TokenGrantRequest::refresh(
            refresh_token,
            self.settings.api.oauth_client_id.as_str(),
            self.settings.api.oauth_scope.as_str(),
        );
        let response = self
            .http
            .post(self.auth_endpoint(TOKEN_PATH)?)
            .form(&grant)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let envelope: TokenEnvelope = read_json("refresh token login", response).await?;
            self.complete_grant(envelope).await?;
            return Ok(true);
        }

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                warn!("Refresh token rejected with status {}", status);
                Ok(false)
            }
            _ => Err(protocol_error("refresh token login", response).await),
        }
    }

    /// Log in through the legacy account endpoint
    ///
    /// Sessions that still need a PIN are populated but stay in
    /// `ChallengeIssued` until [`verify_pin`](Self::verify_pin) succeeds.
    pub async fn login_legacy(
        &self,
        email: &str,
        password: &str,
        reauth: bool,
    ) -> Result<AuthChallengeResult> {
        require_non_empty("email", email)?;
        require_non_empty("password", password)?;

        info!("Logging in through the legacy account endpoint");
        let api = &self.settings.api;
        let body = LegacyLoginRequest {
            unique_id: api.unique_id(self.network.user_agent()),
            email: email.to_string(),
            password: password.to_string(),
            client_name: api.client_name.clone(),
            reauth,
        };
        let response = self
            .http
            .post(self.auth_endpoint(LEGACY_LOGIN_PATH)?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("Legacy login rejected: wrong email or password");
            self.set_phase(AuthState::Unauthenticated).await;
            return Ok(AuthChallengeResult::Rejected);
        }
        if !status.is_success() {
            return Err(protocol_error("legacy login", response).await);
        }

        let login: LoginResponse = read_json("legacy login", response).await?;
        if login.account.tier.is_empty() || login.auth.token.is_empty() {
            return Err(Error::protocol(
                "legacy login",
                status.as_u16(),
                "incomplete response",
                "response is missing the tier or the auth token",
            ));
        }

        let session = SessionState {
            mode: AuthMode::Legacy,
            tier: login.account.tier.clone(),
            account_id: login.account.account_id,
            client_id: login.account.client_id,
            access_token: login.auth.token.clone(),
            refresh_token: String::new(),
            valid_until: Some(Utc::now() + self.settings.session.legacy_token_lifetime()),
        };
        session.base_url(&api.tier_url_template)?;
        *self.state.write().await = session;

        if login.account.client_verification_required {
            info!(
                "Client verification required, PIN resend allowed in {}s",
                login.allow_pin_resend_seconds
            );
            *self.pending.lock().await = Some(PendingChallenge::Legacy);
            self.set_phase(AuthState::ChallengeIssued).await;
            Ok(AuthChallengeResult::ChallengePending)
        } else {
            *self.pending.lock().await = None;
            self.set_phase(AuthState::Authenticated).await;
            info!(
                "Legacy session established on tier {}",
                login.account.tier
            );
            Ok(AuthChallengeResult::Accepted)
        }
    }

    /// Refresh the access token if it expires within the look-ahead window
    ///
    /// Concurrent callers share a single refresh: the first one performs it,
    /// the others wait for it and then find the token fresh.
    pub async fn refresh_if_needed(&self) -> Result<()> {
        if !self.needs_refresh().await {
            return Ok(());
        }

        let _guard = self.refresh_guard.lock().await;
        if !self.needs_refresh().await {
            debug!("Token was refreshed while waiting for the refresh guard");
            return Ok(());
        }

        let refresh_token = self.state.read().await.refresh_token.clone();
        if refresh_token.is_empty() {
            warn!("Access token is about to expire and the session has no refresh token");
            return Ok(());
        }

        info!("Access token expires soon, refreshing");
        self.set_phase(AuthState::Refreshing).await;
        match self.login_with_refresh_token(&refresh_token).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.set_phase(AuthState::Unauthenticated).await;
                Err(Error::auth_rejected("token refresh"))
            }
            Err(e) => {
                self.set_phase(AuthState::Authenticated).await;
                Err(e)
            }
        }
    }

    async fn needs_refresh(&self) -> bool {
        if !self.auth_state().await.permits_protected_calls() {
            return false;
        }
        self.state
            .read()
            .await
            .needs_refresh(Utc::now(), self.settings.session.refresh_window())
    }

    async fn verify_oauth(&self, email: &str, password: &str, code: &str) -> Result<bool> {
        info!("Submitting two-factor code");
        let grant = self.password_grant(email, password);
        let response = self
            .http
            .post(self.auth_endpoint(TOKEN_PATH)?)
            .header(TWO_FACTOR_HEADER, code)
            .form(&grant)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let envelope: TokenEnvelope = read_json("verify pin", response).await?;
            self.complete_grant(envelope).await?;
            return Ok(true);
        }

        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await?;
            if body.to_ascii_lowercase().contains(INVALID_CODE_MARKER) {
                warn!("Two-factor code is invalid or expired");
                return Ok(false);
            }
            return Err(Error::protocol(
                "verify pin",
                status.as_u16(),
                reason_phrase(status).as_str(),
                body.as_str(),
            ));
        }

        Err(protocol_error("verify pin", response).await)
    }

    async fn verify_legacy(&self, code: &str) -> Result<bool> {
        let session = self.session().await;
        let url = session.base_url(&self.settings.api.tier_url_template)?.join(&format!(
            "/api/v4/account/{}/client/{}/pin/verify",
            session.account_id, session.client_id
        ))?;

        info!("Submitting legacy PIN");
        let response = self
            .http
            .post(url)
            .headers(authorization_headers(&self.settings.api, &session)?)
            .json(&PinVerifyRequest::new(code))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            *self.pending.lock().await = None;
            self.set_phase(AuthState::Authenticated).await;
            info!("Legacy PIN accepted, session established on tier {}", session.tier);
            return Ok(true);
        }
        if status == StatusCode::BAD_REQUEST {
            warn!("Legacy PIN rejected");
            return Ok(false);
        }
        Err(protocol_error("verify pin", response).await)
    }

    /// Shared success path of every OAuth grant
    async fn complete_grant(&self, envelope: TokenEnvelope) -> Result<()> {
        if envelope.access_token.is_empty() {
            return Err(Error::protocol(
                "token grant",
                StatusCode::OK.as_u16(),
                "incomplete response",
                "token envelope has no access token",
            ));
        }

        let issued_at = Utc::now();
        let valid_until = chrono::Duration::try_seconds(envelope.expires_in.max(0))
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                Error::protocol(
                    "token grant",
                    StatusCode::OK.as_u16(),
                    "invalid response",
                    "expires_in out of range",
                )
            })?;
        let tier_info = self.lookup_tier(&envelope.access_token).await?;

        let mut session = self.state.write().await;
        let refresh_token = if envelope.refresh_token.is_empty() {
            session.refresh_token.clone()
        } else {
            envelope.refresh_token.clone()
        };
        let next = SessionState {
            mode: AuthMode::OAuth,
            tier: tier_info.tier,
            account_id: tier_info.account_id,
            client_id: session.client_id,
            access_token: envelope.access_token,
            refresh_token,
            valid_until: Some(valid_until),
        };
        next.base_url(&self.settings.api.tier_url_template)?;
        info!(
            "Session established on tier {} for account {}, token valid until {}",
            next.tier, next.account_id, valid_until
        );
        *session = next;
        drop(session);

        *self.pending.lock().await = None;
        self.set_phase(AuthState::Authenticated).await;

        if !envelope.refresh_token.is_empty() {
            self.rotations.publish(TokenRotation {
                refresh_token: envelope.refresh_token,
                issued_at,
                valid_until: Some(valid_until),
            });
        }
        Ok(())
    }

    async fn lookup_tier(&self, access_token: &str) -> Result<TierInfo> {
        debug!("Resolving tier for the new token");
        let response = self
            .http
            .get(self.auth_endpoint(TIER_INFO_PATH)?)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(protocol_error("tier info", response).await);
        }
        let info: TierInfo = read_json("tier info", response).await?;
        if info.tier.is_empty() || info.account_id == 0 {
            return Err(Error::protocol(
                "tier info",
                StatusCode::OK.as_u16(),
                "incomplete response",
                "tier info has no tier or account id",
            ));
        }
        Ok(info)
    }

    async fn adopt_session(&self, mut session: SessionState) -> Result<()> {
        require_non_empty("access_token", &session.access_token)?;
        require_non_empty("tier", &session.tier)?;
        if session.account_id == 0 {
            return Err(Error::validation("account_id", "account id must be set"));
        }
        session.base_url(&self.settings.api.tier_url_template)?;
        if session.valid_until.is_none() {
            session.valid_until = Some(Utc::now() + self.settings.session.legacy_token_lifetime());
        }

        info!(
            "Using preset {} session on tier {}",
            session.mode, session.tier
        );
        *self.state.write().await = session;
        *self.pending.lock().await = None;
        self.set_phase(AuthState::Authenticated).await;
        Ok(())
    }

    async fn set_phase(&self, next: AuthState) {
        let mut phase = self.phase.write().await;
        if *phase != next {
            debug!("Auth state {:?} -> {:?}", *phase, next);
            *phase = next;
        }
    }

    fn password_grant(&self, email: &str, password: &str) -> TokenGrantRequest {
        TokenGrantRequest::password(
            email,
            password,
            self.settings.api.oauth_client_id.as_str(),
            self.settings.api.oauth_scope.as_str(),
        )
    }

    fn auth_endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&self.settings.api.auth_base_url)?.join(path)?)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(())
}
