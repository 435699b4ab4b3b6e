//! Local mirror layout and resume inspection.
//!
//! The mirror is `<root>/<album title with spaces as underscores>/<remote filename>`.
//! There is no manifest: the number of regular files in an album folder is the
//! only record of what was downloaded, so a `.part` file left by an
//! interrupted download counts as present.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use api_client::Album;

use crate::session::Session;

pub const DEFAULT_DOWNLOAD_ROOT: &str = "downloads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorLayout {
    root: PathBuf,
}

impl Default for MirrorLayout {
    fn default() -> Self {
        MirrorLayout::new(DEFAULT_DOWNLOAD_ROOT)
    }
}

impl MirrorLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MirrorLayout { root: root.into() }
    }

    /// Folder for an album title. Titles that differ only in spaces versus
    /// underscores share a folder. Only spaces are rewritten: a title holding
    /// `/` resolves to a nested folder and one starting with `../` to a
    /// folder beside the root.
    pub fn resolve_folder_path(&self, album_title: &str) -> PathBuf {
        self.root.join(album_title.replace(' ', "_"))
    }

    pub fn album_folder(&self, album: &Album) -> PathBuf {
        self.resolve_folder_path(album.display_title())
    }
}

/// Count regular files directly inside `folder`. A missing folder counts as 0.
pub async fn count_local_files(folder: &Path) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(folder).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut count = 0;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// Informational download state of one album.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlbumStatus {
    pub downloaded: usize,
    /// `None` when the remote count could not be fetched.
    pub total: Option<usize>,
}

impl fmt::Display for AlbumStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "Already downloaded: {}/{}", self.downloaded, total),
            None => write!(f, "Already downloaded: {}", self.downloaded),
        }
    }
}

/// Compare the local folder against the remote item count. Never fails.
pub async fn album_status(session: &Session, layout: &MirrorLayout, album: &Album) -> AlbumStatus {
    let total = match session.count_media_items(&album.id).await {
        Ok(total) => Some(total),
        Err(e) => {
            tracing::warn!(album = %album.id, error = %e, "Failed to count remote media items");
            None
        }
    };

    let folder = layout.album_folder(album);
    let downloaded = count_local_files(&folder).await.unwrap_or_else(|e| {
        tracing::warn!(folder = ?folder, error = %e, "Failed to count local files");
        0
    });

    AlbumStatus { downloaded, total }
}
