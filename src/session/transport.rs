//! Authorized transport construction
//!
//! A transport is an HTTP client bound to one session binding (tier, token
//! and auth mode) plus the regional base URL derived from it. The factory
//! refreshes an expiring token first, then hands out the cached transport
//! while the binding is unchanged and rebuilds it when it changes.

use crate::{
    Error, Result,
    config::{ApiSettings, Settings},
    session::{auth::AuthenticationProtocol, network::NetworkManager},
    types::{AuthMode, SessionState},
};
use reqwest::{
    Client, RequestBuilder,
    header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

const APP_BUILD_HEADER: &str = "app-build";
const LOCALE_HEADER: &str = "locale";
const TIME_ZONE_HEADER: &str = "x-blink-time-zone";
const TOKEN_AUTH_HEADER: &str = "token-auth";

/// Headers every protected request carries, including the credential
///
/// OAuth sessions send `Authorization: Bearer <token>`; legacy sessions send
/// `TOKEN-AUTH: <token>`. The user agent is set by the client itself.
pub fn authorization_headers(api: &ApiSettings, session: &SessionState) -> Result<HeaderMap> {
    if !session.has_token() {
        return Err(Error::not_authorized(
            "build request headers",
            "the session has no access token",
        ));
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(APP_BUILD_HEADER),
        header_value("api.app_build", &api.app_build)?,
    );
    headers.insert(
        HeaderName::from_static(LOCALE_HEADER),
        header_value("api.locale", &api.locale)?,
    );
    headers.insert(
        HeaderName::from_static(TIME_ZONE_HEADER),
        header_value("api.time_zone", &api.time_zone)?,
    );

    let (name, credential) = match session.mode {
        AuthMode::OAuth => (AUTHORIZATION, format!("Bearer {}", session.access_token)),
        AuthMode::Legacy => (
            HeaderName::from_static(TOKEN_AUTH_HEADER),
            session.access_token.clone(),
        ),
    };
    let mut credential = header_value("access_token", &credential)?;
    credential.set_sensitive(true);
    headers.insert(name, credential);

    Ok(headers)
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::validation(field, "contains characters not allowed in a header"))
}

/// What a transport is bound to; a change forces a rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportBinding {
    /// Regional tier
    pub tier: String,
    /// Access token baked into the default headers
    pub access_token: String,
    /// Header scheme
    pub mode: AuthMode,
}

impl TransportBinding {
    fn of(session: &SessionState) -> Self {
        Self {
            tier: session.tier.clone(),
            access_token: session.access_token.clone(),
            mode: session.mode,
        }
    }
}

/// HTTP client bound to the authorized tier
#[derive(Debug, Clone)]
pub struct AuthorizedTransport {
    client: Client,
    base_url: Url,
    account_id: u64,
    binding: TransportBinding,
}

impl AuthorizedTransport {
    /// Account the session belongs to
    pub fn account_id(&self) -> u64 {
        self.account_id
    }

    /// Regional base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Binding the transport was built for
    pub fn binding(&self) -> &TransportBinding {
        &self.binding
    }

    /// Resolve an absolute API path against the regional host
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Start a GET request to `path`
    pub fn get(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.client.get(self.endpoint(path)?))
    }

    /// Start a POST request to `path`
    pub fn post(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.client.post(self.endpoint(path)?))
    }
}

/// Hands out transports for protected calls
#[derive(Debug)]
pub struct TransportFactory {
    auth: Arc<AuthenticationProtocol>,
    network: NetworkManager,
    api: ApiSettings,
    cached: Mutex<Option<AuthorizedTransport>>,
}

impl TransportFactory {
    /// Create a factory serving the sessions of `auth`
    pub fn new(auth: Arc<AuthenticationProtocol>, settings: &Settings) -> Self {
        Self {
            auth,
            network: NetworkManager::new(settings),
            api: settings.api.clone(),
            cached: Mutex::new(None),
        }
    }

    /// The authentication protocol backing this factory
    pub fn auth(&self) -> &Arc<AuthenticationProtocol> {
        &self.auth
    }

    /// Transport for a protected call named `operation`
    ///
    /// Refreshes the token when it is about to expire. Fails with
    /// `NotAuthorized` until a login has completed.
    pub async fn authorized(&self, operation: &str) -> Result<AuthorizedTransport> {
        if !self.auth.auth_state().await.permits_protected_calls() {
            return Err(Error::not_authorized(
                operation,
                "no authenticated session; log in first",
            ));
        }

        self.auth.refresh_if_needed().await?;

        let session = self.auth.session().await;
        if !session.has_token() || !session.has_tier() {
            return Err(Error::not_authorized(
                operation,
                "the session has no token, tier or account",
            ));
        }

        let binding = TransportBinding::of(&session);
        let mut cached = self.cached.lock().await;
        if let Some(transport) = cached.as_ref()
            && transport.binding == binding
        {
            return Ok(transport.clone());
        }

        debug!(
            "Building {} transport for tier {}",
            session.mode, session.tier
        );
        let transport = AuthorizedTransport {
            client: self
                .network
                .build_client(authorization_headers(&self.api, &session)?)?,
            base_url: session.base_url(&self.api.tier_url_template)?,
            account_id: session.account_id,
            binding,
        };
        *cached = Some(transport.clone());
        Ok(transport)
    }
}
