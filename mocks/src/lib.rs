//! Mock servers for the OAuth token endpoint and the Photos Library API.

use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::{json, Value};

pub use httptest;

/// Create a mock server for the OAuth token endpoint.
/// The server will respond to POST `/token` with a fixed access token.
pub fn token_server(access_token: &str) -> Server {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![request::method_path("POST", "/token"),]).respond_with(
            json_encoded(json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": 3600
            })),
        ),
    );
    server
}

/// Create an empty mock server for Google Photos API endpoints.
pub fn photos_server() -> Server {
    Server::run()
}

/// Base URL to hand to `ApiClient::with_base_url`, without a trailing slash.
pub fn api_base_url(server: &Server) -> String {
    server.url_str("").trim_end_matches('/').to_string()
}

pub fn album_json(id: &str, title: &str, cover_base_url: Option<&str>) -> Value {
    let mut album = json!({
        "id": id,
        "title": title,
        "productUrl": format!("https://photos.example/album/{}", id),
        "mediaItemsCount": "0",
    });
    if let Some(cover) = cover_base_url {
        album["coverPhotoBaseUrl"] = json!(cover);
    }
    album
}

pub fn media_item_json(id: &str, filename: &str, base_url: &str, mime_type: &str) -> Value {
    json!({
        "id": id,
        "productUrl": format!("https://photos.example/photo/{}", id),
        "baseUrl": base_url,
        "mimeType": mime_type,
        "mediaMetadata": {
            "creationTime": "2024-01-01T00:00:00Z",
            "width": "100",
            "height": "200"
        },
        "filename": filename
    })
}

fn page_body(key: &str, items: Vec<Value>, next_page_token: Option<&str>) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), Value::Array(items));
    if let Some(token) = next_page_token {
        body.insert("nextPageToken".to_string(), json!(token));
    }
    Value::Object(body)
}

/// Expect exactly one GET `/v1/albums` for the given page token.
pub fn expect_album_page(
    server: &Server,
    page_token: Option<&str>,
    albums: Vec<Value>,
    next_page_token: Option<&str>,
) {
    let body = page_body("albums", albums, next_page_token);
    match page_token {
        Some(token) => server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/v1/albums"),
                request::query(url_decoded(contains(("pageToken", eq(token.to_string()))))),
            ])
            .respond_with(json_encoded(body)),
        ),
        None => server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/v1/albums"),
                request::query(url_decoded(not(contains(key("pageToken"))))),
            ])
            .respond_with(json_encoded(body)),
        ),
    }
}

/// Expect exactly one GET `/v1/albums` answered with `status`.
pub fn expect_album_listing_status(server: &Server, status: u16) {
    server.expect(
        Expectation::matching(request::method_path("GET", "/v1/albums"))
            .respond_with(status_code(status).body("{\"error\":\"mock\"}")),
    );
}

fn search_body(album_id: &str, page_token: Option<&str>) -> Value {
    let mut body = json!({ "albumId": album_id, "pageSize": 50 });
    if let Some(token) = page_token {
        body["pageToken"] = json!(token);
    }
    body
}

/// Expect exactly one POST `/v1/mediaItems:search` for the album and page
/// token, using the default page size.
pub fn expect_media_page(
    server: &Server,
    album_id: &str,
    page_token: Option<&str>,
    items: Vec<Value>,
    next_page_token: Option<&str>,
) {
    expect_media_page_times(server, album_id, page_token, items, next_page_token, 1);
}

/// Same as [`expect_media_page`], for pages requested more than once
/// (listing and counting the same album).
pub fn expect_media_page_times(
    server: &Server,
    album_id: &str,
    page_token: Option<&str>,
    items: Vec<Value>,
    next_page_token: Option<&str>,
    times: usize,
) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/mediaItems:search"),
            request::body(json_decoded(eq(search_body(album_id, page_token)))),
        ])
        .times(times)
        .respond_with(json_encoded(page_body("mediaItems", items, next_page_token))),
    );
}

/// Expect exactly one media search for `album_id` answered with `status`.
pub fn expect_media_search_status(server: &Server, album_id: &str, status: u16) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/mediaItems:search"),
            request::body(json_decoded(eq(search_body(album_id, None)))),
        ])
        .respond_with(status_code(status).body("{\"error\":\"mock\"}")),
    );
}

/// Expect exactly one GET of `path` returning `body`.
pub fn expect_bytes(server: &Server, path: &str, body: &'static [u8]) {
    server.expect(
        Expectation::matching(request::method_path("GET", eq(path.to_string())))
            .respond_with(status_code(200).body(body)),
    );
}

/// Expect exactly one GET of `path` answered with a bare `status`.
pub fn expect_bytes_status(server: &Server, path: &str, status: u16) {
    server.expect(
        Expectation::matching(request::method_path("GET", eq(path.to_string())))
            .respond_with(status_code(status)),
    );
}
