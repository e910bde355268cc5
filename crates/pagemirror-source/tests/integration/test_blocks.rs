//! Integration tests for block tree traversal and page chrome

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use pagemirror_core::domain::{BlockKind, ChromeImage, DocumentId};
use pagemirror_core::ports::IContentSource;

use crate::common;

fn doc(id: &str) -> DocumentId {
    DocumentId::new(id.to_string()).unwrap()
}

#[tokio::test]
async fn test_block_tree_recurses_into_children() {
    let (server, source) = common::setup_source().await;
    common::mount_children(
        &server,
        "doc-1",
        json!([
            common::paragraph_json("p-1", "first", true),
            {
                "object": "block",
                "id": "page-1",
                "type": "child_page",
                "has_children": true,
                "child_page": { "title": "Appendix" }
            },
            {
                "object": "block",
                "id": "img-1",
                "type": "image",
                "has_children": false,
                "image": { "type": "external", "caption": [], "external": { "url": "https://cdn.example/a.gif" } }
            }
        ]),
    )
    .await;
    common::mount_children(&server, "p-1", json!([common::paragraph_json("p-1-a", "nested", false)])).await;
    common::mount_children(&server, "page-1", json!([common::paragraph_json("inner", "inside", false)])).await;

    let tree = source.fetch_block_tree(&doc("doc-1")).await.unwrap();

    assert_eq!(tree.len(), 3);
    assert_eq!(tree[0].content, "first");
    assert_eq!(tree[0].children[0].content, "nested");
    assert_eq!(tree[1].kind, BlockKind::ChildPage);
    assert_eq!(tree[1].content, "Appendix");
    assert_eq!(tree[1].children[0].id.as_str(), "inner");
    assert_eq!(tree[2].content, "![a.gif](https://cdn.example/a.gif)");
    assert!(tree[2].children.is_empty());
}

#[tokio::test]
async fn test_block_children_pagination() {
    let (server, source) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/blocks/doc-1/children"))
        .and(query_param("start_cursor", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::list_json(
            json!([common::paragraph_json("b-2", "second", false)]),
            None,
        )))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blocks/doc-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::list_json(
            json!([common::paragraph_json("b-1", "first", false)]),
            Some("next"),
        )))
        .mount(&server)
        .await;

    let tree = source.fetch_block_tree(&doc("doc-1")).await.unwrap();
    let ids: Vec<&str> = tree.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["b-1", "b-2"]);
}

#[tokio::test]
async fn test_page_chrome_parses_icon_and_cover() {
    let (server, source) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/pages/page-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "page",
            "id": "page-1",
            "last_edited_time": "2024-05-01T10:00:00.000Z",
            "properties": {},
            "icon": { "type": "emoji", "emoji": "📘" },
            "cover": { "type": "file", "file": { "url": "https://files.example/c.jpg?sig=1", "expiry_time": "2024-05-01T11:00:00.000Z" } }
        })))
        .mount(&server)
        .await;

    let chrome = source.fetch_page_chrome(&doc("page-1")).await.unwrap();
    assert!(matches!(chrome.icon, Some(ChromeImage::Emoji { .. })));
    assert_eq!(
        chrome.cover.as_ref().and_then(ChromeImage::hosted_url),
        Some("https://files.example/c.jpg?sig=1")
    );
}

#[tokio::test]
async fn test_page_chrome_absent_fields_are_none() {
    let (server, source) = common::setup_source().await;
    Mock::given(method("GET"))
        .and(path("/pages/page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "page",
            "id": "page-2",
            "last_edited_time": "2024-05-01T10:00:00.000Z",
            "properties": {},
            "icon": null,
            "cover": null
        })))
        .mount(&server)
        .await;

    let chrome = source.fetch_page_chrome(&doc("page-2")).await.unwrap();
    assert_eq!(chrome, Default::default());
}
