//! API client for the Google Photos Library API.

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod pagination;

pub use pagination::{collect_pages, count_pages, for_each_page, Page};

pub const DEFAULT_BASE_URL: &str = "https://photoslibrary.googleapis.com";
pub const DEFAULT_PAGE_SIZE: i32 = 50;

/// Suffix requesting a 150x150 rendition of an image.
pub const THUMBNAIL_SUFFIX: &str = "=w150-h150";
/// Suffix requesting the original image bytes.
pub const IMAGE_DOWNLOAD_SUFFIX: &str = "=d";
/// Suffix requesting the full video file.
pub const VIDEO_DOWNLOAD_SUFFIX: &str = "=dv";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub description: Option<String>,
    pub product_url: Option<String>,
    pub base_url: String,
    #[serde(default)]
    pub mime_type: String,
    pub filename: String,
}

impl MediaItem {
    pub fn is_video(&self) -> bool {
        self.mime_type.to_lowercase().contains("video")
    }

    /// URL of the full-quality bytes. Videos and images use different suffixes.
    pub fn download_url(&self) -> String {
        let suffix = if self.is_video() {
            VIDEO_DOWNLOAD_SUFFIX
        } else {
            IMAGE_DOWNLOAD_SUFFIX
        };
        format!("{}{}", self.base_url, suffix)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: Option<String>,
    pub product_url: Option<String>,
    pub media_items_count: Option<String>,
    pub cover_photo_base_url: Option<String>,
}

impl Album {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }

    pub fn cover_thumbnail_url(&self) -> Option<String> {
        self.cover_photo_base_url.as_deref().map(thumbnail_url)
    }
}

pub fn thumbnail_url(base_url: &str) -> String {
    format!("{}{}", base_url, THUMBNAIL_SUFFIX)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMediaItemsResponse {
    media_items: Option<Vec<MediaItem>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAlbumsResponse {
    albums: Option<Vec<Album>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchMediaItemsRequest<'a> {
    album_id: &'a str,
    page_size: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiClientError {
    #[error("Authentication Error: {0}")]
    Auth(String),
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Google API Error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl ApiClientError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiClientError::Auth(_))
    }
}

/// Body of a media download, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, ApiClientError>>;

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    page_size: i32,
}

impl ApiClient {
/// Create a client for the API at `base_url` (normally [`DEFAULT_BASE_URL`]).
    /// A trailing slash is ignored.
    pub fn with_base_url(access_token: String, base_url: String) -> Self {
        ApiClient {
            client: reqwest::Client::new(),
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fetch every album in the library.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn list_albums(&self) -> Result<Vec<Album>, ApiClientError> {
        let albums = collect_pages(|token| self.list_albums_page(self.page_size, token)).await?;
        tracing::debug!(count = albums.len(), "Listed albums");
        Ok(albums)
    }

    /// Fetch every media item of one album, in the order the service returns them.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn list_media_items(&self, album_id: &str) -> Result<Vec<MediaItem>, ApiClientError> {
        collect_pages(|token| self.search_media_items(album_id, self.page_size, token)).await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn count_media_items(&self, album_id: &str) -> Result<usize, ApiClientError> {
        count_pages(|token| self.search_media_items(album_id, self.page_size, token)).await
    }

    pub async fn list_albums_page(
        &self,
        page_size: i32,
        page_token: Option<String>,
    ) -> Result<Page<Album>, ApiClientError> {
        let url = format!("{}/v1/albums", self.base_url);
        let mut query = vec![("pageSize", page_size.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .query(&query)
            .send()
            .await
            .map_err(|e| ApiClientError::Network(e.to_string()))?;
        let response = check_status(response).await?;

        let list_response = response
            .json::<ListAlbumsResponse>()
            .await
            .map_err(|e| ApiClientError::Network(e.to_string()))?;

        Ok(Page::new(
            list_response.albums.unwrap_or_default(),
            list_response.next_page_token,
        ))
    }

    pub async fn search_media_items(
        &self,
        album_id: &str,
        page_size: i32,
        page_token: Option<String>,
    ) -> Result<Page<MediaItem>, ApiClientError> {
        let url = format!("{}/v1/mediaItems:search", self.base_url);

        let request_body = SearchMediaItemsRequest {
            album_id,
            page_size,
            page_token,
        };

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(CONTENT_TYPE, "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ApiClientError::Network(e.to_string()))?;
        let response = check_status(response).await?;

        let search_response = response
            .json::<ListMediaItemsResponse>()
            .await
            .map_err(|e| ApiClientError::Network(e.to_string()))?;

        Ok(Page::new(
            search_response.media_items.unwrap_or_default(),
            search_response.next_page_token,
        ))
    }

    /// Download raw bytes from a media URL. Any non-success status is a
    /// network error; there is no retry.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, ApiClientError> {
        self.get_media(url)
            .await?
            .bytes()
            .await
            .map_err(|e| ApiClientError::Network(e.to_string()))
    }

    /// Start a media download and hand back its body as a stream, for files
    /// too large to hold in memory. Status handling matches [`fetch_bytes`].
    ///
    /// [`fetch_bytes`]: ApiClient::fetch_bytes
    pub async fn fetch_stream(&self, url: &str) -> Result<ByteStream, ApiClientError> {
        let response = self.get_media(url).await?;
        Ok(response
            .bytes_stream()
            .map_err(|e| ApiClientError::Network(e.to_string()))
            .boxed())
    }

    async fn get_media(&self, url: &str) -> Result<reqwest::Response, ApiClientError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiClientError::Network(format!(
                "GET {} returned status {}",
                url, status
            )));
        }
        Ok(response)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiClientError::Auth(error_text));
    }
    Err(ApiClientError::Api {
        status: status.as_u16(),
        message: error_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_albums_response() {
        let json = r#"{
            "albums": [
                {
                    "id": "1",
                    "title": "Test Album",
                    "productUrl": "http://example.com/album/1",
                    "isWriteable": true,
                    "mediaItemsCount": "10",
                    "coverPhotoBaseUrl": "http://example.com/base",
                    "coverPhotoMediaItemId": "cover1"
                }
            ],
            "nextPageToken": "token123"
        }"#;

        let parsed: ListAlbumsResponse = serde_json::from_str(json).unwrap();
        let albums = parsed.albums.unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].id, "1");
        assert_eq!(albums[0].title.as_deref(), Some("Test Album"));
        assert_eq!(
            albums[0].cover_thumbnail_url().as_deref(),
            Some("http://example.com/base=w150-h150")
        );
        assert_eq!(parsed.next_page_token, Some("token123".to_string()));
    }

    #[test]
    fn test_parse_empty_page() {
        let parsed: ListMediaItemsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.media_items.is_none());
        assert!(parsed.next_page_token.is_none());
    }

    #[test]
    fn test_untitled_album() {
        let album: Album = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(album.display_title(), "Untitled");
        assert!(album.cover_thumbnail_url().is_none());
    }

    #[test]
    fn test_download_url_depends_on_mime_type() {
        let mut item = MediaItem {
            id: "1".into(),
            description: None,
            product_url: None,
            base_url: "https://lh3.example/abc".into(),
            mime_type: "image/jpeg".into(),
            filename: "a.jpg".into(),
        };
        assert_eq!(item.download_url(), "https://lh3.example/abc=d");

        item.mime_type = "Video/MP4".into();
        assert!(item.is_video());
        assert_eq!(item.download_url(), "https://lh3.example/abc=dv");
    }

    #[test]
    fn test_search_request_omits_missing_token() {
        let body = SearchMediaItemsRequest {
            album_id: "a1",
            page_size: 50,
            page_token: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"albumId": "a1", "pageSize": 50})
        );
    }
}
