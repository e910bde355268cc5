//! Shared test helpers for Notion API integration tests

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pagemirror_source::{NotionClient, NotionContentSource};

pub const DOCS_DB: &str = "docs-db";
pub const CATEGORIES_DB: &str = "cats-db";

/// Starts a mock server and returns a source pointing at it
pub async fn setup_source() -> (MockServer, NotionContentSource) {
    let server = MockServer::start().await;
    let client = NotionClient::with_base_url("test-token", "2022-06-28", server.uri());
    let source = NotionContentSource::new(client, DOCS_DB).with_categories_database(CATEGORIES_DB);
    (server, source)
}

/// A page object as returned by database queries
pub fn page_json(id: &str, title: &str, edited: &str) -> Value {
    json!({
        "object": "page",
        "id": id,
        "last_edited_time": edited,
        "properties": {
            "title": { "id": "title", "type": "title", "title": [{ "plain_text": title }] },
            "published": { "type": "checkbox", "checkbox": true }
        }
    })
}

/// A paragraph block object
pub fn paragraph_json(id: &str, text: &str, has_children: bool) -> Value {
    json!({
        "object": "block",
        "id": id,
        "type": "paragraph",
        "has_children": has_children,
        "paragraph": { "rich_text": [{ "plain_text": text, "annotations": {}, "href": null }] }
    })
}

pub fn list_json(results: Value, next_cursor: Option<&str>) -> Value {
    json!({
        "object": "list",
        "results": results,
        "has_more": next_cursor.is_some(),
        "next_cursor": next_cursor,
    })
}

/// Mounts a single-page database query response
pub async fn mount_query(server: &MockServer, database_id: &str, results: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/databases/{database_id}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(results, None)))
        .mount(server)
        .await;
}

/// Mounts a database query split over two pages joined by `cursor`
pub async fn mount_query_paginated(
    server: &MockServer,
    database_id: &str,
    page1: Value,
    page2: Value,
    cursor: &str,
) {
    Mock::given(method("POST"))
        .and(path(format!("/databases/{database_id}/query")))
        .and(body_partial_json(json!({ "start_cursor": cursor })))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(page2, None)))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/databases/{database_id}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(page1, Some(cursor))))
        .mount(server)
        .await;
}

/// Mounts the children listing of one block
pub async fn mount_children(server: &MockServer, block_id: &str, results: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/blocks/{block_id}/children")))
        .and(query_param("page_size", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(results, None)))
        .mount(server)
        .await;
}

/// Mounts a database's schema with its title property called `title_property`
pub async fn mount_database(server: &MockServer, database_id: &str, title_property: &str) {
    let mut properties = serde_json::Map::new();
    properties.insert(
        title_property.to_string(),
        json!({ "id": "title", "name": title_property, "type": "title", "title": {} }),
    );
    properties.insert(
        "published".to_string(),
        json!({ "id": "p1", "name": "published", "type": "checkbox", "checkbox": {} }),
    );
    Mock::given(method("GET"))
        .and(path(format!("/databases/{database_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "database",
            "id": database_id,
            "properties": properties,
        })))
        .mount(server)
        .await;
}
