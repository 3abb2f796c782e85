// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local image store: ensures base/overlay images referenced by a drop are
//! present on disk, downloading from the code-cache image endpoint when
//! missing or stale, and coalescing concurrent downloads of the same id.

use md5::{Digest, Md5};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;

#[derive(Debug, Error)]
pub enum ImageManagerError {
    #[error("download failed for image {0}: {1}")]
    Download(String, String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Tracks a per-worker local cache of base images under `store_dir`, keyed by
/// the legacy external filename contract `<image-id>_vagrant_box_image_0.img`
/// (§6 "Persisted state layout").
pub struct ImageManager {
    store_dir: PathBuf,
    image_base_url: String,
    client: reqwest::Client,
    inflight: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ImageManager {
    pub fn new(store_dir: PathBuf, image_base_url: impl Into<String>) -> Self {
        Self {
            store_dir,
            image_base_url: image_base_url.into(),
            client: reqwest::Client::new(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn image_path(&self, image_id: &str) -> PathBuf {
        self.store_dir.join(format!("{image_id}_vagrant_box_image_0.img"))
    }

    /// Ensure one image is present and (if `expected_md5` is given) matches.
    /// Concurrent calls for the same `image_id` coalesce into a single
    /// download: the first caller performs the fetch, later callers wait on
    /// a [`Notify`] and then re-check the file.
    pub async fn ensure_image(
        &self,
        image_id: &str,
        expected_md5: Option<&str>,
    ) -> Result<PathBuf, ImageManagerError> {
        let path = self.image_path(image_id);
        if self.is_fresh(&path, expected_md5).await? {
            return Ok(path);
        }

        let waiter = {
            let mut inflight = self.inflight.lock();
            if let Some(notify) = inflight.get(image_id) {
                Some(notify.clone())
            } else {
                inflight.insert(image_id.to_string(), Arc::new(Notify::new()));
                None
            }
        };

        if let Some(notify) = waiter {
            notify.notified().await;
            if self.is_fresh(&path, expected_md5).await? {
                return Ok(path);
            }
            return Err(ImageManagerError::Download(
                image_id.to_string(),
                "concurrent download did not produce a fresh image".into(),
            ));
        }

        let result = self.download(image_id, &path).await;

        let notify = self.inflight.lock().remove(image_id);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }

        result.map(|_| path)
    }

    /// Ensure a base-image chain in order (base-most first); recursive
    /// backing-image resolution is just ensuring every link before the leaf.
    pub async fn ensure_chain(
        &self,
        chain: &[(String, Option<String>)],
    ) -> Result<PathBuf, ImageManagerError> {
        let mut last = None;
        for (image_id, md5) in chain {
            last = Some(self.ensure_image(image_id, md5.as_deref()).await?);
        }
        last.ok_or_else(|| ImageManagerError::Download("<empty chain>".into(), "empty chain".into()))
    }

    async fn is_fresh(&self, path: &Path, expected_md5: Option<&str>) -> Result<bool, ImageManagerError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(false);
        }
        match expected_md5 {
            Some(expected) => Ok(file_md5(path).await? == expected),
            None => Ok(true),
        }
    }

    async fn download(&self, image_id: &str, dest: &Path) -> Result<(), ImageManagerError> {
        let url = format!("{}/{}", self.image_base_url.trim_end_matches('/'), image_id);
        tracing::info!(image_id, %url, "downloading image");
        let response = self.client.get(&url).send().await?;
        let response = response.error_for_status().map_err(|e| {
            ImageManagerError::Download(image_id.to_string(), e.to_string())
        })?;
        let bytes = response.bytes().await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = dest.with_extension("img.partial");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, dest).await?;
        tracing::info!(image_id, bytes = bytes.len(), "image download complete");
        Ok(())
    }
}

async fn file_md5(path: &Path) -> Result<String, std::io::Error> {
    let data = tokio::fs::read(path).await?;
    let mut hasher = Md5::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}
