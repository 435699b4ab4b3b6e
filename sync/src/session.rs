//! Single-owner session worker.
//!
//! One task owns the [`ApiClient`]; every remote call is sent to it as a
//! request and answered over a oneshot channel, so calls from concurrent
//! background tasks are processed one at a time.

use api_client::{Album, ApiClient, ApiClientError, ByteStream, MediaItem};
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::SyncError;

type Reply<T> = oneshot::Sender<Result<T, ApiClientError>>;

enum Request {
    ListAlbums(Reply<Vec<Album>>),
    ListMediaItems { album_id: String, reply: Reply<Vec<MediaItem>> },
    CountMediaItems { album_id: String, reply: Reply<usize> },
    FetchBytes { url: String, reply: Reply<Bytes> },
    FetchStream { url: String, reply: Reply<ByteStream> },
}

/// Cloneable handle to the session worker.
#[derive(Debug, Clone)]
pub struct Session {
    tx: mpsc::Sender<Request>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Request::ListAlbums(_) => write!(f, "ListAlbums"),
            Request::ListMediaItems { album_id, .. } => write!(f, "ListMediaItems({})", album_id),
            Request::CountMediaItems { album_id, .. } => write!(f, "CountMediaItems({})", album_id),
            Request::FetchBytes { url, .. } => write!(f, "FetchBytes({})", url),
            Request::FetchStream { url, .. } => write!(f, "FetchStream({})", url),
        }
    }
}

impl Session {
    /// Start the worker on the current tokio runtime. The worker exits once
    /// every `Session` clone has been dropped.
    pub fn spawn(client: ApiClient) -> (Session, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(32);
        let handle = tokio::spawn(run(client, rx));
        (Session { tx }, handle)
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> Result<T, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| SyncError::SessionClosed)?;
        let result = rx.await.map_err(|_| SyncError::SessionClosed)?;
        Ok(result?)
    }

    pub async fn list_albums(&self) -> Result<Vec<Album>, SyncError> {
        self.call(Request::ListAlbums).await
    }

    pub async fn list_media_items(&self, album_id: &str) -> Result<Vec<MediaItem>, SyncError> {
        let album_id = album_id.to_string();
        self.call(|reply| Request::ListMediaItems { album_id, reply })
            .await
    }

    pub async fn count_media_items(&self, album_id: &str) -> Result<usize, SyncError> {
        let album_id = album_id.to_string();
        self.call(|reply| Request::CountMediaItems { album_id, reply })
            .await
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, SyncError> {
        let url = url.to_string();
        self.call(|reply| Request::FetchBytes { url, reply }).await
    }

    /// Start a download through the worker. The worker is released once the
    /// response headers arrive; the caller drains the body.
    pub async fn fetch_stream(&self, url: &str) -> Result<ByteStream, SyncError> {
        let url = url.to_string();
        self.call(|reply| Request::FetchStream { url, reply }).await
    }
}

async fn run(client: ApiClient, mut rx: mpsc::Receiver<Request>) {
    tracing::debug!("Session worker started");
    while let Some(request) = rx.recv().await {
        tracing::trace!(?request, "Session request");
        // A dropped reply receiver only means the caller gave up waiting.
        match request {
            Request::ListAlbums(reply) => {
                let _ = reply.send(client.list_albums().await);
            }
            Request::ListMediaItems { album_id, reply } => {
                let _ = reply.send(client.list_media_items(&album_id).await);
            }
            Request::CountMediaItems { album_id, reply } => {
                let _ = reply.send(client.count_media_items(&album_id).await);
            }
            Request::FetchBytes { url, reply } => {
                let _ = reply.send(client.fetch_bytes(&url).await);
            }
            Request::FetchStream { url, reply } => {
                let _ = reply.send(client.fetch_stream(&url).await);
            }
        }
    }
    tracing::debug!("Session worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocks::{album_json, api_base_url, expect_album_page, photos_server};

    #[tokio::test]
    async fn test_requests_are_answered() {
        let server = photos_server();
        expect_album_page(&server, None, vec![album_json("1", "A", None)], None);
        let client = ApiClient::with_base_url("token".into(), api_base_url(&server));
        let (session, _handle) = Session::spawn(client);
        let albums = session.list_albums().await.unwrap();
        assert_eq!(albums.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_session() {
        let client = ApiClient::with_base_url("token".into(), "http://127.0.0.1:9".into());
        let (session, handle) = Session::spawn(client);
        handle.abort();
        let _ = handle.await;
        let err = session.list_albums().await.unwrap_err();
        assert!(matches!(err, SyncError::SessionClosed));
    }
}
