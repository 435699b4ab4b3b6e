//! Album cover thumbnails cached on disk.

use std::path::{Path, PathBuf};

use api_client::Album;

use crate::session::Session;

#[derive(Debug, Clone)]
pub struct CoverLoader {
    cache_dir: PathBuf,
}

impl CoverLoader {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        CoverLoader {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn thumbnail_path(&self, album_id: &str) -> PathBuf {
        self.cache_dir
            .join("thumbnails")
            .join(format!("{}.jpg", album_id))
    }

    /// Fetch the album's cover at thumbnail size. Albums without a cover and
    /// any fetch or write failure yield `None`.
    pub async fn load(&self, session: &Session, album: &Album) -> Option<PathBuf> {
        let url = album.cover_thumbnail_url()?;
        let path = self.thumbnail_path(&album.id);
        if path.exists() {
            return Some(path);
        }

        let bytes = match session.fetch_bytes(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(album = %album.id, error = %e, "Failed to fetch cover image");
                return None;
            }
        };

        match write_thumbnail(&path, &bytes).await {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to cache cover image");
                None
            }
        }
    }
}

async fn write_thumbnail(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}
