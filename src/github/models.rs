//! Wire types for the GitHub REST + Git Data API.

use serde::{Deserialize, Serialize};

/// Encoding of a blob payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "base64")]
    Base64,
}

#[derive(Debug, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRepoRequest {
    pub name: String,
    pub description: String,
    pub private: bool,
    pub auto_init: bool,
}

#[derive(Debug, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub full_ref: String,
    pub object: GitRefObject,
}

#[derive(Debug, Deserialize)]
pub struct GitRefObject {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRefRequest {
    #[serde(rename = "ref")]
    pub full_ref: String,
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateRefRequest {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub tree: TreeRef,
}

#[derive(Debug, Deserialize)]
pub struct TreeRef {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct CreateBlobRequest {
    pub content: String,
    pub encoding: BlobEncoding,
}

#[derive(Debug, Deserialize)]
pub struct BlobCreated {
    pub sha: String,
}

/// One entry of a tree about to be created. Always a regular-file blob.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub entry_type: &'static str,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: String, sha: String) -> Self {
        Self {
            path,
            mode: "100644",
            entry_type: "blob",
            sha,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTreeRequest {
    pub tree: Vec<TreeEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_tree: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TreeCreated {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCommitRequest {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommitCreated {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct CreateFileRequest {
    pub message: String,
    /// Base64-encoded file content, as the Contents API requires.
    pub content: String,
    pub branch: String,
}

#[derive(Debug, Deserialize)]
pub struct FileCommitted {
    pub commit: CommitCreated,
}
