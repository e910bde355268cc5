//! Integration tests for pagemirror-source
//!
//! Uses wiremock to simulate the Notion API and verifies pagination,
//! block tree traversal, page chrome retrieval and error mapping.

mod common;

mod test_blocks;
mod test_documents;
