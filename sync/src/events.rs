use std::path::PathBuf;

use api_client::Album;

use crate::downloader::AlbumReport;
use crate::mirror::AlbumStatus;

/// Messages from background tasks to the presentation layer.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Status(String),
    AlbumsFound(Vec<Album>),
    AlbumStatus { album_id: String, status: AlbumStatus },
    CoverReady { album_id: String, path: Option<PathBuf> },
    AlbumStarted { album_id: String, title: String, total: usize },
    ItemDownloaded { album_id: String, filename: String, done: usize, total: usize },
    ItemFailed { album_id: String, filename: String, error: String },
    AlbumFinished(AlbumReport),
    DownloadComplete { albums: usize },
    /// The operation stopped. `auth` is set when the service rejected the
    /// session's credentials.
    Error { message: String, auth: bool },
}
