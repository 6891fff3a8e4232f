//! Save affordance for the selected document

use crate::error::{Error, Result};
use crate::source::{SourceConfig, SourceResolver};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A request to save a document under a suggested file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveAction {
    /// Locator of the document to save
    pub href: String,
    /// Suggested file name, `document<N>.pdf` with N 1-based
    pub filename: String,
}

impl SaveAction {
    /// Save action for the document at 0-based `index`
    pub fn for_document(locator: &str, index: usize) -> Self {
        Self {
            href: locator.to_string(),
            filename: format!("document{}.pdf", index + 1),
        }
    }
}

/// Host-side save affordance. Activation is fire-and-forget.
pub trait Downloader: Send + Sync {
    fn activate(&self, action: &SaveAction);
}

struct FileDownloaderInner {
    dir: PathBuf,
    resolver: SourceResolver,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

/// Saves documents into a directory, fetching them through the source resolver
#[derive(Clone)]
pub struct FileDownloader {
    inner: Arc<FileDownloaderInner>,
}

impl FileDownloader {
    pub fn new<P: Into<PathBuf>>(dir: P, config: SourceConfig) -> Self {
        Self {
            inner: Arc::new(FileDownloaderInner {
                dir: dir.into(),
                resolver: SourceResolver::new(config),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Fetch the action's document and write it under the suggested name
    pub async fn save(&self, action: &SaveAction) -> Result<PathBuf> {
        // The suggested name must not escape the target directory
        let filename = Path::new(&action.filename)
            .file_name()
            .ok_or_else(|| Error::SourceResolution {
                reason: format!("Invalid file name: {}", action.filename),
            })?;

        let data = self.inner.resolver.resolve(&action.href).await?;
        tokio::fs::create_dir_all(&self.inner.dir).await?;

        let path = self.inner.dir.join(filename);
        tokio::fs::write(&path, data.as_slice()).await?;
        Ok(path)
    }

    /// Wait for every save started by [`Downloader::activate`] so far
    pub async fn flush(&self) {
        let pending: Vec<_> = std::mem::take(&mut *self.inner.pending.lock());
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "download task failed");
            }
        }
    }
}

impl Downloader for FileDownloader {
    fn activate(&self, action: &SaveAction) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(filename = %action.filename, "no async runtime; download dropped");
            return;
        };

        let downloader = self.clone();
        let action = action.clone();
        let handle = runtime.spawn(async move {
            match downloader.save(&action).await {
                Ok(path) => tracing::info!(path = %path.display(), "document saved"),
                Err(e) => tracing::warn!(error = %e, filename = %action.filename, "download failed"),
            }
        });
        let mut pending = self.inner.pending.lock();
        pending.retain(|task| !task.is_finished());
        pending.push(handle);
    }
}
