//! GitHub integration: repository snapshot sync over the REST + Git Data API.
//!
//! The flow is strictly sequential: resolve a base commit, upload one blob per
//! file, build a tree, create a commit, move the branch ref. See [`sync`].

mod client;
mod models;
mod snapshot;
mod sync;
mod token;

pub use client::GitHubClient;
pub use models::{BlobEncoding, GitCommit, RepoInfo, TreeEntry};
pub use snapshot::{
    collect_files, is_binary_path, is_excluded, read_file_content, FileContent, SnapshotError,
};
pub use sync::{sync_repository, SyncOptions, SyncReport};
pub use token::{AccessTokenSource, TokenCache};

use thiserror::Error;

/// Errors from the GitHub API layer.
///
/// Only `RefNotFound` and `EmptyRepository` are recovered during a sync;
/// everything else aborts the run and is surfaced to the caller.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub connection error: {0}")]
    Connection(String),

    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    #[error("Reference '{0}' not found")]
    RefNotFound(String),

    #[error("Repository is empty")]
    EmptyRepository,

    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid GitHub API response: {0}")]
    InvalidResponse(String),

    #[error("Access token error: {0}")]
    Token(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}
