//! Client facade
//!
//! [`BlinkClient`] wires one authentication protocol, transport factory and
//! video pipeline together for a single account. [`BlinkApi`] is the surface
//! callers program against, so front ends can be exercised with a mock.

use crate::{
    Result,
    config::Settings,
    session::{AuthenticationProtocol, TransportFactory},
    types::{
        AuthChallengeResult, AuthState, Authentication, Dashboard, SessionState, SyncModule,
        TokenRotation, VideoDescriptor,
    },
    video::VideoPipeline,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations of a Blink client
#[async_trait]
pub trait BlinkApi: Send + Sync {
    /// Establish a session through any supported mode
    async fn authenticate(&self, authentication: Authentication) -> Result<AuthChallengeResult>;

    /// Log in with email and password
    async fn login(&self, email: &str, password: &str) -> Result<AuthChallengeResult>;

    /// Submit the one-time code for a pending login
    async fn verify_pin(&self, code: &str) -> Result<bool>;

    /// Log in with a stored refresh token
    async fn login_with_refresh_token(&self, refresh_token: &str) -> Result<bool>;

    /// Home screen with the account's sync modules
    async fn dashboard(&self) -> Result<Dashboard>;

    /// Clips of every sync module
    async fn videos(&self) -> Result<Vec<VideoDescriptor>>;

    /// Clips of one sync module
    async fn videos_from_module(&self, module: &SyncModule) -> Result<Vec<VideoDescriptor>>;

    /// Clips of the account's only sync module
    async fn videos_from_single_module(&self) -> Result<Vec<VideoDescriptor>>;

    /// Clip contents
    async fn video_bytes(&self, video: &VideoDescriptor, try_count: u32) -> Result<Vec<u8>>;

    /// Delete a clip
    async fn delete_video(&self, video: &VideoDescriptor) -> Result<()>;

    /// Refresh tokens issued since the last call
    async fn drain_token_rotations(&self) -> Vec<TokenRotation>;
}

/// Blink client for one account
#[derive(Debug)]
pub struct BlinkClient {
    settings: Arc<Settings>,
    auth: Arc<AuthenticationProtocol>,
    videos: VideoPipeline,
}

impl BlinkClient {
    /// Create a client; the settings are validated first
    ///
    /// ```rust
    /// use blink_client::{AuthState, BlinkClient, Settings};
    ///
    /// # tokio_test::block_on(async {
    /// let client = BlinkClient::new(Settings::default())?;
    /// assert_eq!(client.auth_state().await, AuthState::Unauthenticated);
    /// # Ok::<(), blink_client::Error>(())
    /// # }).unwrap();
    /// ```
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let settings = Arc::new(settings);

        let auth = Arc::new(AuthenticationProtocol::new(settings.clone())?);
        let transport = Arc::new(TransportFactory::new(auth.clone(), &settings));
        let videos = VideoPipeline::new(transport, settings.video.clone());

        Ok(Self {
            settings,
            auth,
            videos,
        })
    }

    /// Settings the client was built with
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Authentication protocol, for legacy logins and state inspection
    pub fn auth(&self) -> &AuthenticationProtocol {
        &self.auth
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> SessionState {
        self.auth.session().await
    }

    /// Current login state
    pub async fn auth_state(&self) -> AuthState {
        self.auth.auth_state().await
    }

    /// Log in through the legacy account endpoint
    pub async fn login_legacy(
        &self,
        email: &str,
        password: &str,
        reauth: bool,
    ) -> Result<AuthChallengeResult> {
        self.auth.login_legacy(email, password, reauth).await
    }
}

#[async_trait]
impl BlinkApi for BlinkClient {
    async fn authenticate(&self, authentication: Authentication) -> Result<AuthChallengeResult> {
        self.auth.authenticate(authentication).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthChallengeResult> {
        self.auth.login(email, password).await
    }

    async fn verify_pin(&self, code: &str) -> Result<bool> {
        self.auth.verify_pin(code).await
    }

    async fn login_with_refresh_token(&self, refresh_token: &str) -> Result<bool> {
        self.auth.login_with_refresh_token(refresh_token).await
    }

    async fn dashboard(&self) -> Result<Dashboard> {
        self.videos.dashboard().await
    }

    async fn videos(&self) -> Result<Vec<VideoDescriptor>> {
        self.videos.videos().await
    }

    async fn videos_from_module(&self, module: &SyncModule) -> Result<Vec<VideoDescriptor>> {
        self.videos.videos_from_module(module).await
    }

    async fn videos_from_single_module(&self) -> Result<Vec<VideoDescriptor>> {
        self.videos.videos_from_single_module().await
    }

    async fn video_bytes(&self, video: &VideoDescriptor, try_count: u32) -> Result<Vec<u8>> {
        self.videos.video_bytes(video, try_count).await
    }

    async fn delete_video(&self, video: &VideoDescriptor) -> Result<()> {
        self.videos.delete_video(video).await
    }

    async fn drain_token_rotations(&self) -> Vec<TokenRotation> {
        self.auth.drain_token_rotations().await
    }
}
