//! Integration tests for HttpAssetFetcher against a wiremock server

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pagemirror_core::ports::IAssetFetcher;
use pagemirror_fetch::{FetchError, HttpAssetFetcher};

fn fetcher(server: &MockServer, key: Option<&str>) -> HttpAssetFetcher {
    HttpAssetFetcher::new(
        Duration::from_secs(5),
        server.uri(),
        key.map(str::to_string),
    )
    .unwrap()
}

#[tokio::test]
async fn test_download_streams_body_and_creates_parents() {
    let server = MockServer::start().await;
    let body = vec![7u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/files/pic.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("doc-a").join("image").join("b1.png");
    let written = fetcher(&server, None)
        .download_to_path(&format!("{}/files/pic.png", server.uri()), &target)
        .await
        .unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), body);
    assert!(!target.with_file_name("b1.png.part").exists());
}

#[tokio::test]
async fn test_download_failure_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("b1.png");
    let err = fetcher(&server, None)
        .download(&format!("{}/missing.png", server.uri()), &target)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert!(!target.exists());
}

#[tokio::test]
async fn test_link_preview_reads_open_graph_tags() {
    let server = MockServer::start().await;
    let html = r#"<html><head>
        <meta property="og:title" content="Rust">
        <meta property="og:description" content="Reliable and efficient software">
        <meta property="og:image" content="/static/social.jpg">
        <link rel="icon" href="/favicon.ico">
    </head></html>"#;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/article", server.uri());
    let preview = fetcher(&server, None)
        .fetch_link_preview(&url)
        .await
        .unwrap()
        .unwrap();

    assert!(preview.success);
    assert_eq!(preview.og_title.as_deref(), Some("Rust"));
    assert_eq!(
        preview.og_description.as_deref(),
        Some("Reliable and efficient software")
    );
    assert_eq!(
        preview.first_image_url(),
        Some(format!("{}/static/social.jpg", server.uri()).as_str())
    );
    assert_eq!(preview.favicon.as_deref(), Some("/favicon.ico"));
    assert_eq!(preview.request_url.as_deref(), Some(url.as_str()));
}

#[tokio::test]
async fn test_link_preview_of_non_html_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.7".to_vec()),
        )
        .mount(&server)
        .await;

    let preview = fetcher(&server, None)
        .fetch_link_preview(&format!("{}/report.pdf", server.uri()))
        .await
        .unwrap();
    assert!(preview.is_none());
}

#[tokio::test]
async fn test_embed_snapshot_sends_key_and_keeps_title_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/oembed"))
        .and(query_param("url", "https://youtu.be/abc"))
        .and(query_param("api_key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "video",
            "title": "A talk",
            "html": "<iframe src=\"https://www.youtube.com/embed/abc\"></iframe>",
            "thumbnail_url": "https://i.ytimg.com/abc.jpg"
        })))
        .mount(&server)
        .await;

    let snapshot = fetcher(&server, Some("secret"))
        .fetch_embed_snapshot("https://youtu.be/abc")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(snapshot.title.as_deref(), Some("A talk"));
    assert!(snapshot.html.unwrap().starts_with("<iframe"));
}

#[tokio::test]
async fn test_embed_snapshot_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/oembed"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = fetcher(&server, Some("secret"))
        .fetch_embed_snapshot("https://example.com/embed")
        .await;
    assert!(result.is_err());
}
