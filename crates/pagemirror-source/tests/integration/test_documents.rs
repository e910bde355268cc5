//! Integration tests for document and category listing

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use pagemirror_core::ports::IContentSource;
use pagemirror_source::SourceError;

use crate::common::{self, CATEGORIES_DB, DOCS_DB};

#[tokio::test]
async fn test_list_documents_follows_pagination() {
    let (server, source) = common::setup_source().await;
    common::mount_query_paginated(
        &server,
        DOCS_DB,
        json!([common::page_json("doc-1", "Ownership", "2024-05-01T10:00:00.000Z")]),
        json!([common::page_json("doc-2", "Borrowing", "2024-05-02T10:00:00.000Z")]),
        "cursor-2",
    )
    .await;

    let documents = source.list_documents().await.unwrap();
    let titles: Vec<&str> = documents.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Ownership", "Borrowing"]);
    assert_eq!(documents[1].id.as_str(), "doc-2");
    assert!(documents.iter().all(|d| d.published));
}

#[tokio::test]
async fn test_requests_carry_auth_and_version_headers() {
    let (server, source) = common::setup_source().await;
    Mock::given(method("POST"))
        .and(path(format!("/databases/{DOCS_DB}/query")))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Notion-Version", "2022-06-28"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::list_json(json!([]), None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert!(source.list_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_categories_from_second_database() {
    let (server, source) = common::setup_source().await;
    common::mount_query(
        &server,
        CATEGORIES_DB,
        json!([common::page_json("cat-1", "Basics", "2024-05-01T10:00:00.000Z")]),
    )
    .await;

    let categories = source.list_categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id.as_str(), "cat-1");
    assert_eq!(categories[0].title, "Basics");
}

#[tokio::test]
async fn test_find_document_by_title_sends_title_filter() {
    let (server, source) = common::setup_source().await;
    common::mount_database(&server, DOCS_DB, "title").await;
    Mock::given(method("POST"))
        .and(path(format!("/databases/{DOCS_DB}/query")))
        .and(body_partial_json(json!({
            "filter": { "property": "title", "title": { "equals": "Ownership" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::list_json(
            json!([common::page_json("doc-1", "Ownership", "2024-05-01T10:00:00.000Z")]),
            None,
        )))
        .mount(&server)
        .await;

    let found = source.find_document_by_title("Ownership").await.unwrap();
    assert_eq!(found.map(|d| d.id.as_str().to_string()), Some("doc-1".to_string()));
}

#[tokio::test]
async fn test_find_document_by_title_missing_is_none() {
    let (server, source) = common::setup_source().await;
    common::mount_database(&server, DOCS_DB, "title").await;
    common::mount_query(&server, DOCS_DB, json!([])).await;

    assert!(source.find_document_by_title("Nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_document_by_title_uses_renamed_title_property() {
    let (server, source) = common::setup_source().await;
    common::mount_database(&server, DOCS_DB, "Name").await;
    let mut page = common::page_json("doc-1", "Ownership", "2024-05-01T10:00:00.000Z");
    let title = page["properties"]
        .as_object_mut()
        .unwrap()
        .remove("title")
        .unwrap();
    page["properties"]["Name"] = title;
    Mock::given(method("POST"))
        .and(path(format!("/databases/{DOCS_DB}/query")))
        .and(body_partial_json(json!({
            "filter": { "property": "Name", "title": { "equals": "Ownership" } }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::list_json(json!([page]), None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let found = source.find_document_by_title("Ownership").await.unwrap().unwrap();
    assert_eq!(found.id.as_str(), "doc-1");
    assert_eq!(found.title, "Ownership");
}

#[tokio::test]
async fn test_unauthorized_maps_to_source_error() {
    let (server, source) = common::setup_source().await;
    Mock::given(method("POST"))
        .and(path(format!("/databases/{DOCS_DB}/query")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "object": "error", "code": "unauthorized", "message": "API token is invalid."
        })))
        .mount(&server)
        .await;

    let err = source.list_documents().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SourceError>(),
        Some(SourceError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let (server, source) = common::setup_source().await;
    Mock::given(method("POST"))
        .and(path(format!("/databases/{DOCS_DB}/query")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    common::mount_query(
        &server,
        DOCS_DB,
        json!([common::page_json("doc-1", "Ownership", "2024-05-01T10:00:00.000Z")]),
    )
    .await;

    let documents = source.list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);
}
