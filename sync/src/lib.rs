//! Album search, local mirror inspection and album download for Google Photos.

use api_client::ApiClientError;
use thiserror::Error;

pub mod cover;
pub mod downloader;
pub mod events;
pub mod filter;
pub mod mirror;
pub mod session;
pub mod tasks;

pub use cover::CoverLoader;
pub use downloader::{search_albums, AlbumReport, Downloader, ItemProgress};
pub use events::SyncEvent;
pub use filter::{filter_highlight_albums, AlbumFilter, HIGHLIGHT_KEYWORDS};
pub use mirror::{album_status, count_local_files, AlbumStatus, MirrorLayout};
pub use session::Session;
pub use tasks::{spawn_album_status, spawn_cover, spawn_download, spawn_search};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error("I/O Error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Refusing to write media item with unsafe filename {0:?}")]
    UnsafeFilename(String),
    #[error("Session worker is no longer running")]
    SessionClosed,
}

impl SyncError {
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Api(e) if e.is_auth())
    }

    /// Errors that only affect a single media item and never stop an album.
    pub fn is_item_level(&self) -> bool {
        matches!(self, SyncError::Api(_) | SyncError::UnsafeFilename(_))
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
