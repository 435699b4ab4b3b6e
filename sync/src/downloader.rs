//! Album download orchestration.

use std::path::{Component, Path, PathBuf};

use api_client::{Album, ByteStream, MediaItem};
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::events::SyncEvent;
use crate::filter::AlbumFilter;
use crate::mirror::MirrorLayout;
use crate::session::Session;
use crate::SyncError;

/// Outcome of downloading one album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumReport {
    pub album_id: String,
    pub title: String,
    pub folder: PathBuf,
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
}

/// Per-item callbacks from [`Downloader::download_album`].
#[derive(Debug)]
pub enum ItemProgress<'a> {
    /// The album listing finished; `total` items will be attempted.
    Listed { total: usize },
    Downloaded { item: &'a MediaItem, done: usize, total: usize },
    Failed { item: &'a MediaItem, error: &'a SyncError },
}

/// List every album and keep the ones the filter accepts.
#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(session)))]
pub async fn search_albums(session: &Session, filter: &AlbumFilter) -> Result<Vec<Album>, SyncError> {
    let albums = session.list_albums().await?;
    let total = albums.len();
    let matching = filter.apply(albums);
    tracing::info!(total, matching = matching.len(), "Album search finished");
    Ok(matching)
}

/// Appended to a filename while its bytes are still arriving.
const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Clone)]
pub struct Downloader {
    session: Session,
    layout: MirrorLayout,
}

impl Downloader {
    pub fn new(session: Session, layout: MirrorLayout) -> Self {
        Downloader { session, layout }
    }

    /// Download every media item of `album` into its mirror folder.
    ///
    /// Existing files with the same name are overwritten. A failed fetch or an
    /// unsafe filename skips that item; listing and local write failures
    /// abort the album.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, album, progress), fields(album = %album.id)))]
    pub async fn download_album<F>(&self, album: &Album, mut progress: F) -> Result<AlbumReport, SyncError>
    where
        F: FnMut(ItemProgress<'_>),
    {
        let folder = self.layout.album_folder(album);
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| SyncError::io(&folder, e))?;

        let items = self.session.list_media_items(&album.id).await?;
        let total = items.len();
        tracing::info!(title = album.display_title(), total, "Downloading album");
        progress(ItemProgress::Listed { total });

        let mut report = AlbumReport {
            album_id: album.id.clone(),
            title: album.display_title().to_string(),
            folder: folder.clone(),
            total,
            downloaded: 0,
            failed: 0,
        };

        for item in &items {
            match self.download_item(item, &folder).await {
                Ok(()) => {
                    report.downloaded += 1;
                    progress(ItemProgress::Downloaded {
                        item,
                        done: report.downloaded,
                        total,
                    });
                }
                Err(e) if e.is_item_level() => {
                    tracing::warn!(filename = %item.filename, error = %e, "Skipping media item");
                    report.failed += 1;
                    progress(ItemProgress::Failed { item, error: &e });
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            title = %report.title,
            downloaded = report.downloaded,
            failed = report.failed,
            "Album finished"
        );
        Ok(report)
    }

    async fn download_item(&self, item: &MediaItem, folder: &Path) -> Result<(), SyncError> {
        if !is_plain_filename(&item.filename) {
            return Err(SyncError::UnsafeFilename(item.filename.clone()));
        }
        tracing::debug!(filename = %item.filename, mime_type = %item.mime_type, "Downloading");
        let mut body = self.session.fetch_stream(&item.download_url()).await?;

        // An earlier copy is only replaced by a complete body.
        let path = folder.join(&item.filename);
        let partial = folder.join(format!("{}{}", item.filename, PARTIAL_SUFFIX));
        let written = write_stream(&mut body, &partial).await;
        if written.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        written?;
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| SyncError::io(&path, e))
    }

    /// Download albums one after another, reporting through `events`.
    ///
    /// Stops at the first album whose download fails as a whole; the
    /// remaining albums are not attempted.
    pub async fn download_albums(
        &self,
        albums: &[Album],
        events: &UnboundedSender<SyncEvent>,
    ) -> Result<Vec<AlbumReport>, SyncError> {
        let mut reports = Vec::with_capacity(albums.len());
        for album in albums {
            emit(
                events,
                SyncEvent::Status(format!("Downloading album: {}", album.display_title())),
            );
            let report = self
                .download_album(album, |p| match p {
                    ItemProgress::Listed { total } => emit(
                        events,
                        SyncEvent::AlbumStarted {
                            album_id: album.id.clone(),
                            title: album.display_title().to_string(),
                            total,
                        },
                    ),
                    ItemProgress::Downloaded { item, done, total } => emit(
                        events,
                        SyncEvent::ItemDownloaded {
                            album_id: album.id.clone(),
                            filename: item.filename.clone(),
                            done,
                            total,
                        },
                    ),
                    ItemProgress::Failed { item, error } => emit(
                        events,
                        SyncEvent::ItemFailed {
                            album_id: album.id.clone(),
                            filename: item.filename.clone(),
                            error: error.to_string(),
                        },
                    ),
                })
                .await?;
            emit(events, SyncEvent::AlbumFinished(report.clone()));
            reports.push(report);
        }
        Ok(reports)
    }
}

async fn write_stream(body: &mut ByteStream, path: &Path) -> Result<(), SyncError> {
    let mut file = File::create(path).await.map_err(|e| SyncError::io(path, e))?;
    while let Some(chunk) = body.next().await {
        file.write_all(&chunk?)
            .await
            .map_err(|e| SyncError::io(path, e))?;
    }
    file.flush().await.map_err(|e| SyncError::io(path, e))
}

pub(crate) fn emit(events: &UnboundedSender<SyncEvent>, event: SyncEvent) {
    if let Err(e) = events.send(event) {
        tracing::debug!(event = ?e.0, "Event receiver closed");
    }
}

/// A filename that stays inside the album folder.
fn is_plain_filename(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filenames() {
        assert!(is_plain_filename("IMG_0001.JPG"));
        assert!(is_plain_filename("clip with spaces.mp4"));
        assert!(!is_plain_filename(""));
        assert!(!is_plain_filename("."));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename("../escape.jpg"));
        assert!(!is_plain_filename("nested/file.jpg"));
        assert!(!is_plain_filename("/etc/passwd"));
        assert!(!is_plain_filename("dir\\file.jpg"));
    }
}
