//! Blink Client - Rust Implementation
//!
//! A client for the Blink cloud camera REST API. It handles the account
//! login (including two-factor verification), keeps the session token fresh
//! and retrieves the video clips stored on the account's sync modules.
//!
//! # Features
//!
//! - **OAuth and legacy logins**: password grant with 2FA, refresh-token
//!   grant, legacy account login with PIN verification, preset sessions
//! - **Silent refresh**: tokens about to expire are refreshed before the next
//!   protected call, at most one refresh in flight
//! - **Token rotation feed**: new refresh tokens are delivered to the caller
//!   for persistence
//! - **Two-phase retrieval**: manifests and clips are requested, then polled
//!   until the backend has materialized them
//!
//! # Architecture
//!
//! - [`session::AuthenticationProtocol`] owns the [`SessionState`] and the
//!   login state machine
//! - [`session::TransportFactory`] turns the session into an HTTP client bound
//!   to the account's regional tier
//! - [`video::VideoPipeline`] lists, downloads and deletes clips
//! - [`BlinkClient`] ties them together behind the [`BlinkApi`] trait
//!
//! # Examples
//!
//! ```rust,no_run
//! use blink_client::{AuthChallengeResult, BlinkApi, BlinkClient, Settings};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = BlinkClient::new(Settings::default())?;
//! if client.login("me@example.com", "secret").await? == AuthChallengeResult::ChallengePending {
//!     client.verify_pin("123456").await?;
//! }
//! for video in client.videos().await? {
//!     println!("{} {}", video.id, video.camera_name);
//! }
//! for rotation in client.drain_token_rotations().await {
//!     println!("store {}", rotation.refresh_token);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod types;
pub mod utils;
pub mod video;

pub use client::{BlinkApi, BlinkClient};
pub use config::{ConfigLoader, Settings};
pub use error::{Error, Result};
pub use types::{
    AuthChallengeResult, AuthMode, AuthState, Authentication, Dashboard, ManifestHandle,
    SessionState, SyncModule, TokenRotation, VideoDescriptor,
};
