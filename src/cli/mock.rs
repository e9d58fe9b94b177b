//! Scripted [`BlinkApi`] for exercising the command logic without a server

use crate::{
    BlinkApi, Error, Result,
    types::{
        AuthChallengeResult, Authentication, Dashboard, SyncModule, TokenRotation,
        VideoDescriptor,
    },
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::Mutex;

pub(crate) struct MockClient {
    outcome: AuthChallengeResult,
    valid_code: String,
    videos: Vec<VideoDescriptor>,
    clip: Vec<u8>,
    rotations: Mutex<Vec<TokenRotation>>,
    codes: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MockClient {
    fn with_outcome(outcome: AuthChallengeResult) -> Self {
        Self {
            outcome,
            valid_code: String::new(),
            videos: Vec::new(),
            clip: Vec::new(),
            rotations: Mutex::new(Vec::new()),
            codes: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn accepting() -> Self {
        Self::with_outcome(AuthChallengeResult::Accepted)
    }

    pub(crate) fn rejecting() -> Self {
        Self::with_outcome(AuthChallengeResult::Rejected)
    }

    pub(crate) fn challenged(valid_code: &str) -> Self {
        let mut client = Self::with_outcome(AuthChallengeResult::ChallengePending);
        client.valid_code = valid_code.to_string();
        client
    }

    pub(crate) fn with_videos(mut self, ids: &[&str], clip: &[u8]) -> Self {
        self.videos = ids
            .iter()
            .map(|id| {
                let mut video = VideoDescriptor {
                    id: id.to_string(),
                    size: "3".to_string(),
                    camera_name: "Front Door".to_string(),
                    created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
                    network_id: 0,
                    module_id: 0,
                    manifest_id: String::new(),
                };
                video.stamp(5, 7, "m1");
                video
            })
            .collect();
        self.clip = clip.to_vec();
        self
    }

    pub(crate) fn with_rotations(self, tokens: &[&str]) -> Self {
        *self.rotations.lock().unwrap() = tokens
            .iter()
            .map(|token| TokenRotation {
                refresh_token: token.to_string(),
                issued_at: Utc::now(),
                valid_until: None,
            })
            .collect();
        self
    }

    pub(crate) fn codes_tried(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlinkApi for MockClient {
    async fn authenticate(&self, _authentication: Authentication) -> Result<AuthChallengeResult> {
        Ok(self.outcome)
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<AuthChallengeResult> {
        Ok(self.outcome)
    }

    async fn verify_pin(&self, code: &str) -> Result<bool> {
        self.codes.lock().unwrap().push(code.to_string());
        Ok(code == self.valid_code)
    }

    async fn login_with_refresh_token(&self, _refresh_token: &str) -> Result<bool> {
        Ok(self.outcome == AuthChallengeResult::Accepted)
    }

    async fn dashboard(&self) -> Result<Dashboard> {
        Ok(Dashboard {
            sync_modules: vec![SyncModule::new(7, 5)],
        })
    }

    async fn videos(&self) -> Result<Vec<VideoDescriptor>> {
        Ok(self.videos.clone())
    }

    async fn videos_from_module(&self, _module: &SyncModule) -> Result<Vec<VideoDescriptor>> {
        Ok(self.videos.clone())
    }

    async fn videos_from_single_module(&self) -> Result<Vec<VideoDescriptor>> {
        Ok(self.videos.clone())
    }

    async fn video_bytes(&self, video: &VideoDescriptor, try_count: u32) -> Result<Vec<u8>> {
        if try_count == 0 {
            return Err(Error::validation("try_count", "must be at least 1"));
        }
        video.require_stamped()?;
        Ok(self.clip.clone())
    }

    async fn delete_video(&self, video: &VideoDescriptor) -> Result<()> {
        self.deleted.lock().unwrap().push(video.id.clone());
        Ok(())
    }

    async fn drain_token_rotations(&self) -> Vec<TokenRotation> {
        std::mem::take(&mut *self.rotations.lock().unwrap())
    }
}
