use api_client::{ApiClient, ApiClientError};
use futures::TryStreamExt;
use mocks::{
    album_json, api_base_url, expect_album_listing_status, expect_album_page, expect_bytes,
    expect_bytes_status, expect_media_page, expect_media_page_times, expect_media_search_status,
    media_item_json, photos_server,
};

#[tokio::test]
async fn test_list_albums_follows_page_tokens() {
    let server = photos_server();
    expect_album_page(
        &server,
        None,
        vec![album_json("1", "One", None), album_json("2", "Two", None)],
        Some("p2"),
    );
    expect_album_page(&server, Some("p2"), vec![album_json("3", "Three", None)], Some("p3"));
    expect_album_page(&server, Some("p3"), vec![], None);

    let client = ApiClient::with_base_url("token".into(), api_base_url(&server));
    let albums = client.list_albums().await.unwrap();
    let ids: Vec<&str> = albums.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_trailing_slash_in_base_url_is_ignored() {
    let server = photos_server();
    expect_album_page(&server, None, vec![album_json("1", "One", None)], None);

    let base = format!("{}/", api_base_url(&server));
    let client = ApiClient::with_base_url("token".into(), base);
    assert_eq!(client.list_albums().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_and_count_media_items() {
    let server = photos_server();
    let base = server.url_str("/media");
    expect_media_page_times(
        &server,
        "album",
        None,
        vec![media_item_json("1", "a.jpg", &base, "image/jpeg")],
        Some("next"),
        2,
    );
    expect_media_page_times(
        &server,
        "album",
        Some("next"),
        vec![
            media_item_json("2", "b.mp4", &base, "video/mp4"),
            media_item_json("3", "c.jpg", &base, "image/jpeg"),
        ],
        None,
        2,
    );

    let client = ApiClient::with_base_url("token".into(), api_base_url(&server));
    let items = client.list_media_items("album").await.unwrap();
    let names: Vec<&str> = items.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(names, vec!["a.jpg", "b.mp4", "c.jpg"]);
    assert_eq!(client.count_media_items("album").await.unwrap(), 3);
}

#[tokio::test]
async fn test_empty_album_has_no_items() {
    let server = photos_server();
    expect_media_page(&server, "empty", None, vec![], None);
    let client = ApiClient::with_base_url("token".into(), api_base_url(&server));
    assert!(client.list_media_items("empty").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unauthorized_listing_is_auth_error() {
    let server = photos_server();
    expect_album_listing_status(&server, 401);
    let client = ApiClient::with_base_url("expired".into(), api_base_url(&server));
    let err = client.list_albums().await.unwrap_err();
    assert!(err.is_auth(), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let server = photos_server();
    expect_media_search_status(&server, "album", 500);
    let client = ApiClient::with_base_url("token".into(), api_base_url(&server));
    match client.list_media_items("album").await {
        Err(ApiClientError::Api { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_bytes() {
    let server = photos_server();
    expect_bytes(&server, "/media/a=d", b"jpeg-bytes");
    expect_bytes_status(&server, "/media/missing=d", 404);

    let client = ApiClient::with_base_url("token".into(), api_base_url(&server));
    let bytes = client
        .fetch_bytes(&server.url_str("/media/a=d"))
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"jpeg-bytes");

    let err = client
        .fetch_bytes(&server.url_str("/media/missing=d"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiClientError::Network(msg) if msg.contains("404")));
}

#[tokio::test]
async fn test_fetch_stream() {
    let server = photos_server();
    expect_bytes(&server, "/media/clip=dv", b"video-bytes");
    expect_bytes_status(&server, "/media/gone=dv", 410);

    let client = ApiClient::with_base_url("token".into(), api_base_url(&server));
    let chunks: Vec<_> = client
        .fetch_stream(&server.url_str("/media/clip=dv"))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(chunks.concat(), b"video-bytes");

    match client.fetch_stream(&server.url_str("/media/gone=dv")).await {
        Err(ApiClientError::Network(msg)) => assert!(msg.contains("410")),
        Err(other) => panic!("expected network error, got {:?}", other),
        Ok(_) => panic!("expected network error"),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::with_base_url("token".into(), format!("http://{}", addr));
    let err = client.list_albums().await.unwrap_err();
    assert!(matches!(err, ApiClientError::Network(_)));
}
