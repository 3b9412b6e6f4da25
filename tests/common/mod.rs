//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestClient, TestServer};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_subscribe() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.create_subscriber("new@example.com").await;
//!     assert_eq!(response.status(), StatusCode::CREATED);
//! }
//! ```
#![allow(dead_code)]

mod client;
mod github;
mod server;

// Public API - this is what tests import
pub use client::TestClient;
pub use github::{GitHubState, MockGitHub};
pub use server::{TestServer, TEST_BRANCH, TEST_COMMIT_MESSAGE, TEST_OWNER, TEST_REPO};
