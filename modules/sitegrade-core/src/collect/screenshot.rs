use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use browserless_client::{BrowserlessClient, ScreenshotOptions};
use tracing::{debug, info, warn};

use super::PageRenderer;
use crate::config::DEFAULT_SCREENSHOT_RETENTION;
use crate::error::{CollectError, CollectResult};
use crate::types::ScreenshotId;

/// Captured screenshots on disk, one `<id>.jpeg` file per capture.
///
/// Each capture gets a fresh id, so concurrent captures never overwrite each
/// other and a UX evaluation reads exactly the image it was handed. Only the
/// newest `retention` captures are kept; older ones are swept on every save.
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    dir: PathBuf,
    retention: usize,
}

impl ScreenshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retention: DEFAULT_SCREENSHOT_RETENTION,
        }
    }

    /// Keep at most `keep` captures (never fewer than one).
    pub fn with_retention(mut self, keep: usize) -> Self {
        self.retention = keep.max(1);
        self
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &ScreenshotId) -> PathBuf {
        self.dir.join(id.file_name())
    }

    pub async fn save(&self, image: &[u8]) -> CollectResult<ScreenshotId> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let id = ScreenshotId::new();
        let path = self.path_for(&id);
        tokio::fs::write(&path, image).await?;

        info!(screenshot_id = %id, path = %path.display(), bytes = image.len(), "Screenshot stored");

        // A failed sweep leaves extra files behind but the capture itself is fine.
        match self.evict_older_than(&id).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, keep = self.retention, "Old screenshots evicted"),
            Err(e) => warn!(error = %e, dir = %self.dir.display(), "Screenshot eviction failed"),
        }
        Ok(id)
    }

    /// Delete the oldest captures so that, counting `newest`, no more than
    /// `retention` remain. Files that are not captures are left alone.
    async fn evict_older_than(&self, newest: &ScreenshotId) -> CollectResult<usize> {
        let mut captures = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jpeg") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<ScreenshotId>().ok())
            else {
                continue;
            };
            if id == *newest {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            captures.push((modified, path));
        }

        let allowed = self.retention - 1;
        if captures.len() <= allowed {
            return Ok(0);
        }

        // Newest first; everything past the allowance goes.
        captures.sort_by(|a, b| b.0.cmp(&a.0));
        let mut removed = 0;
        for (_, path) in captures.drain(allowed..) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                // Already swept by a concurrent save.
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    pub async fn exists(&self, id: &ScreenshotId) -> bool {
        tokio::fs::try_exists(self.path_for(id)).await.unwrap_or(false)
    }

    /// Read a stored capture as standard base64.
    pub async fn load_base64(&self, id: &ScreenshotId) -> CollectResult<String> {
        let bytes = match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CollectError::ScreenshotNotFound(*id));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(screenshot_id = %id, bytes = bytes.len(), "Screenshot loaded");
        Ok(ai_client::encode_base64(&bytes))
    }
}

/// Renderer backed by a Browserless instance.
pub struct BrowserlessRenderer {
    client: BrowserlessClient,
    options: ScreenshotOptions,
}

impl BrowserlessRenderer {
    pub fn new(client: BrowserlessClient) -> Self {
        Self {
            client,
            options: ScreenshotOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScreenshotOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn capture_full_page(&self, url: &str) -> CollectResult<Vec<u8>> {
        Ok(self.client.screenshot(url, &self.options).await?)
    }

    fn name(&self) -> &str {
        "browserless"
    }
}
