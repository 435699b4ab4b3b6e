//! Background units started by the presentation layer.
//!
//! Each trigger spawns one task and reports through the event channel; no
//! ordering is defined between tasks.

use api_client::Album;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::cover::CoverLoader;
use crate::downloader::{emit, search_albums, Downloader};
use crate::events::SyncEvent;
use crate::filter::AlbumFilter;
use crate::mirror::{album_status, MirrorLayout};
use crate::session::Session;
use crate::SyncError;

pub fn spawn_search(
    session: Session,
    filter: AlbumFilter,
    events: UnboundedSender<SyncEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        emit(&events, SyncEvent::Status("Searching albums...".into()));
        match search_albums(&session, &filter).await {
            Ok(albums) => {
                emit(&events, SyncEvent::Status(format!("Found {} album(s).", albums.len())));
                emit(&events, SyncEvent::AlbumsFound(albums));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Album search failed");
                emit(&events, failure(&e));
            }
        }
    })
}

pub fn spawn_album_status(
    session: Session,
    layout: MirrorLayout,
    album: Album,
    events: UnboundedSender<SyncEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let status = album_status(&session, &layout, &album).await;
        emit(
            &events,
            SyncEvent::AlbumStatus {
                album_id: album.id,
                status,
            },
        );
    })
}

pub fn spawn_cover(
    session: Session,
    loader: CoverLoader,
    album: Album,
    events: UnboundedSender<SyncEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let path = loader.load(&session, &album).await;
        emit(
            &events,
            SyncEvent::CoverReady {
                album_id: album.id,
                path,
            },
        );
    })
}

/// Download the selected albums in order. Runs to completion or to the first
/// album-level failure; there is no cancellation.
pub fn spawn_download(
    downloader: Downloader,
    albums: Vec<Album>,
    events: UnboundedSender<SyncEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match downloader.download_albums(&albums, &events).await {
            Ok(reports) => {
                emit(&events, SyncEvent::Status("Download complete.".into()));
                emit(
                    &events,
                    SyncEvent::DownloadComplete {
                        albums: reports.len(),
                    },
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Download stopped");
                emit(&events, failure(&e));
            }
        }
    })
}

fn failure(e: &SyncError) -> SyncEvent {
    SyncEvent::Error {
        message: e.to_string(),
        auth: e.is_auth(),
    }
}
