//! Two-phase video retrieval
//!
//! The backend materializes manifests and clips on demand. Each phase posts a
//! request, waits for the settle delay and then polls the same resource until
//! it is ready or the attempt budget runs out.

use crate::{
    Error, Result,
    config::VideoSettings,
    session::{AuthorizedTransport, TransportFactory},
    types::{Dashboard, ManifestHandle, ManifestResponse, SyncModule, VideoDescriptor},
    utils::http::{media_type, protocol_error, read_json, reason_phrase},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Content type of a materialized clip
pub const VIDEO_MEDIA_TYPE: &str = "video/mp4";

/// Lists, downloads and deletes clips stored on sync modules
#[derive(Debug)]
pub struct VideoPipeline {
    transport: Arc<TransportFactory>,
    settings: VideoSettings,
}

impl VideoPipeline {
    /// Create a pipeline issuing requests through `transport`
    pub fn new(transport: Arc<TransportFactory>, settings: VideoSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Retrieval settings in effect
    pub fn settings(&self) -> &VideoSettings {
        &self.settings
    }

    /// Home screen listing the account's sync modules
    pub async fn dashboard(&self) -> Result<Dashboard> {
        let transport = self.transport.authorized("dashboard").await?;
        let path = format!("/api/v3/accounts/{}/homescreen", transport.account_id());

        debug!("Fetching dashboard");
        let response = transport.get(&path)?.send().await?;
        if !response.status().is_success() {
            return Err(protocol_error("dashboard", response).await);
        }
        let dashboard: Dashboard = read_json("dashboard", response).await?;
        debug!("Dashboard lists {} sync modules", dashboard.sync_modules.len());
        Ok(dashboard)
    }

    /// Ask the module to build a manifest of its local storage
    pub async fn request_manifest(&self, module: &SyncModule) -> Result<ManifestHandle> {
        require_module(module)?;
        let transport = self.transport.authorized("request manifest").await?;
        let path = manifest_path(&transport, module);

        debug!("Requesting manifest for sync module {}", module.id);
        let response = transport.post(&path)?.send().await?;
        if !response.status().is_success() {
            return Err(protocol_error("request manifest", response).await);
        }
        read_json("request manifest", response).await
    }

    /// Poll for the manifest behind `handle`
    ///
    /// An empty body means the manifest is not ready yet.
    pub async fn fetch_manifest(
        &self,
        module: &SyncModule,
        handle: &ManifestHandle,
    ) -> Result<ManifestResponse> {
        require_module(module)?;
        let attempts = self.settings.manifest_try_count.max(1);
        let mut content_type = String::new();
        let mut reason = String::new();

        for attempt in 1..=attempts {
            self.settle().await;

            let transport = self.transport.authorized("fetch manifest").await?;
            let path = format!("{}/{}", manifest_path(&transport, module), handle.manifest_id);
            let response = transport.get(&path)?.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(protocol_error("fetch manifest", response).await);
            }

            content_type = media_type(&response);
            reason = reason_phrase(status);
            let body = response.text().await?;
            if body.trim().is_empty() {
                warn!(
                    "Manifest {} not ready (attempt {}/{})",
                    handle.manifest_id, attempt, attempts
                );
                continue;
            }

            return serde_json::from_str(&body).map_err(|e| {
                tracing::error!("Failed to parse manifest {}: {}", handle.manifest_id, e);
                Error::Json(e)
            });
        }

        Err(Error::MaterializationTimeout {
            resource: format!("manifest {}", handle.manifest_id),
            attempts,
            content_type,
            reason,
            body: String::new(),
        })
    }

    /// Clips stored on one sync module, stamped for retrieval
    pub async fn videos_from_module(&self, module: &SyncModule) -> Result<Vec<VideoDescriptor>> {
        let handle = self.request_manifest(module).await?;
        let manifest = self.fetch_manifest(module, &handle).await?;

        let manifest_id = if manifest.manifest_id.trim().is_empty() {
            handle.manifest_id.clone()
        } else {
            manifest.manifest_id.clone()
        };

        let mut videos = manifest.clips;
        for video in &mut videos {
            video.stamp(module.network_id, module.id, manifest_id.as_str());
        }
        info!(
            "Sync module {} lists {} clips in manifest {}",
            module.id,
            videos.len(),
            manifest_id
        );
        Ok(videos)
    }

    /// Clips of the account's only sync module
    ///
    /// Fails with a `SyncModule` error when the dashboard lists no module or
    /// more than one; use [`videos`](Self::videos) for multi-module accounts.
    pub async fn videos_from_single_module(&self) -> Result<Vec<VideoDescriptor>> {
        let dashboard = self.dashboard().await?;
        match dashboard.sync_modules.as_slice() {
            [module] => self.videos_from_module(module).await,
            [] => Err(Error::sync_module(0, "no sync modules found on the dashboard")),
            modules => Err(Error::sync_module(
                modules.len(),
                "more than one sync module found; list videos from all modules instead",
            )),
        }
    }

    /// Clips of every sync module, in dashboard order
    pub async fn videos(&self) -> Result<Vec<VideoDescriptor>> {
        let dashboard = self.dashboard().await?;
        let mut videos = Vec::new();
        for module in &dashboard.sync_modules {
            videos.extend(self.videos_from_module(module).await?);
        }
        Ok(videos)
    }

    /// Download a clip, polling up to `try_count` times until it is materialized
    pub async fn video_bytes(&self, video: &VideoDescriptor, try_count: u32) -> Result<Vec<u8>> {
        if try_count == 0 {
            return Err(Error::validation("try_count", "must be at least 1"));
        }
        video.require_stamped()?;

        let mut content_type = String::new();
        let mut reason = String::new();
        let mut body = String::new();

        for attempt in 1..=try_count {
            let transport = self.transport.authorized("download clip").await?;
            let path = clip_path(&transport, video, "request");

            debug!("Requesting clip {} (attempt {}/{})", video.id, attempt, try_count);
            let response = transport.post(&path)?.send().await?;
            if !response.status().is_success() {
                return Err(protocol_error("request clip", response).await);
            }

            self.settle().await;

            let response = transport.get(&path)?.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(protocol_error("download clip", response).await);
            }

            content_type = media_type(&response);
            if content_type == VIDEO_MEDIA_TYPE {
                let bytes = response.bytes().await?;
                info!("Downloaded clip {} ({} bytes)", video.id, bytes.len());
                return Ok(bytes.to_vec());
            }

            reason = reason_phrase(status);
            body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            warn!(
                "Clip {} not ready, got content type '{}' (attempt {}/{})",
                video.id, content_type, attempt, try_count
            );
        }

        Err(Error::MaterializationTimeout {
            resource: format!("clip {}", video.id),
            attempts: try_count,
            content_type,
            reason,
            body,
        })
    }

    /// Delete a clip from its sync module
    pub async fn delete_video(&self, video: &VideoDescriptor) -> Result<()> {
        video.require_stamped()?;
        let transport = self.transport.authorized("delete clip").await?;
        let path = clip_path(&transport, video, "delete");

        self.settle().await;
        let response = transport.post(&path)?.send().await?;
        if !response.status().is_success() {
            return Err(protocol_error(&format!("delete clip {}", video.id), response).await);
        }
        info!("Deleted clip {}", video.id);
        Ok(())
    }

    async fn settle(&self) {
        let delay = self.settings.settle_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn require_module(module: &SyncModule) -> Result<()> {
    if module.id == 0 || module.network_id == 0 {
        return Err(Error::validation(
            "module",
            "sync module and network ids must be set",
        ));
    }
    Ok(())
}

fn manifest_path(transport: &AuthorizedTransport, module: &SyncModule) -> String {
    format!(
        "/api/v1/accounts/{}/networks/{}/sync_modules/{}/local_storage/manifest/request",
        transport.account_id(),
        module.network_id,
        module.id
    )
}

fn clip_path(transport: &AuthorizedTransport, video: &VideoDescriptor, action: &str) -> String {
    format!(
        "/api/v1/accounts/{}/networks/{}/sync_modules/{}/local_storage/manifest/{}/clip/{}/{}",
        transport.account_id(),
        video.network_id,
        video.module_id,
        video.manifest_id,
        action,
        video.id
    )
}
