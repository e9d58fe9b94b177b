//! Dashboard and clip commands

use crate::{BlinkApi, types::VideoDescriptor};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::info;

/// Print the sync modules listed on the dashboard
pub async fn run_dashboard<C: BlinkApi + ?Sized>(client: &C) -> Result<()> {
    let dashboard = client.dashboard().await?;
    println!("{} sync module(s)", dashboard.sync_modules.len());
    for module in &dashboard.sync_modules {
        println!("{}\t{}\t{}", module.id, module.network_id, module.name);
    }
    Ok(())
}

/// Print the stored clips, from every module when `all` is set
pub async fn run_list<C: BlinkApi + ?Sized>(client: &C, all: bool) -> Result<()> {
    let videos = if all {
        client.videos().await?
    } else {
        client.videos_from_single_module().await?
    };
    for video in &videos {
        println!("{}", describe(video));
    }
    Ok(())
}

/// Download clips into `out`; returns the written files
pub async fn run_download<C: BlinkApi + ?Sized>(
    client: &C,
    out: &Path,
    clip: Option<&str>,
    tries: u32,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(out)
        .await
        .with_context(|| format!("failed to create {}", out.display()))?;

    let videos = select(client.videos().await?, clip)?;
    let mut written = Vec::with_capacity(videos.len());
    for video in &videos {
        let bytes = client
            .video_bytes(video, tries)
            .await
            .with_context(|| format!("failed to download clip {}", video.id))?;

        let path = out.join(clip_file_name(video));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Saved clip {} to {}", video.id, path.display());
        println!("{}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Delete the clip with id `clip`
pub async fn run_delete<C: BlinkApi + ?Sized>(client: &C, clip: &str) -> Result<()> {
    for video in select(client.videos().await?, Some(clip))? {
        client.delete_video(&video).await?;
        println!("Deleted clip {}", video.id);
    }
    Ok(())
}

/// One listing line: id, creation time, camera, size
pub fn describe(video: &VideoDescriptor) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        video.id,
        video.created_at.to_rfc3339(),
        video.camera_name,
        video.size
    )
}

/// File name for a downloaded clip
///
/// Camera name and clip id come from the server and are reduced to ASCII
/// alphanumerics, so the name never leaves the output directory.
pub fn clip_file_name(video: &VideoDescriptor) -> String {
    format!(
        "{}_{}_{}.mp4",
        file_name_part(&video.camera_name, "clip"),
        video.created_at.format("%Y%m%d_%H%M%S"),
        file_name_part(&video.id, "unknown")
    )
}

fn file_name_part(raw: &str, fallback: &str) -> String {
    let part: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if part.is_empty() {
        fallback.to_string()
    } else {
        part
    }
}

fn select(videos: Vec<VideoDescriptor>, clip: Option<&str>) -> Result<Vec<VideoDescriptor>> {
    let Some(id) = clip else {
        return Ok(videos);
    };
    let selected: Vec<_> = videos.into_iter().filter(|video| video.id == id).collect();
    if selected.is_empty() {
        bail!("clip {} is not listed on any sync module", id);
    }
    Ok(selected)
}
