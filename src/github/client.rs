//! HTTP client for the GitHub REST + Git Data API.

use super::models::{
    BlobCreated, BlobEncoding, CommitCreated, CreateBlobRequest, CreateCommitRequest,
    CreateFileRequest, CreateRefRequest, CreateRepoRequest, CreateTreeRequest, FileCommitted,
    GitCommit, GitRef, RepoInfo, TreeCreated, TreeEntry, UpdateRefRequest,
};
use super::token::TokenCache;
use super::GitHubError;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("waitlist-server/", env!("CARGO_PKG_VERSION"));

/// Client for one GitHub API host.
///
/// Owns the access-token cache; owner/repo are passed per call so one client
/// can serve any repository the token can reach.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    token: TokenCache,
}

impl GitHubClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `api_base` - Base URL of the API (e.g., "https://api.github.com")
    /// * `timeout_sec` - Per-request timeout in seconds
    /// * `token` - Access-token cache to authenticate with
    pub fn new(api_base: String, timeout_sec: u64, token: TokenCache) -> Result<Self, GitHubError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .map_err(|e| GitHubError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        let api_base = api_base.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            api_base,
            token,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GitHubError> {
        let token = self.token.access_token(&self.client).await?;
        builder
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| GitHubError::Connection(e.to_string()))
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        what: &str,
    ) -> Result<T, GitHubError> {
        response
            .json()
            .await
            .map_err(|e| GitHubError::InvalidResponse(format!("{}: {}", what, e)))
    }

    async fn api_error(response: Response) -> GitHubError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        GitHubError::Api { status, message }
    }

    /// Look up a repository. 404 maps to [`GitHubError::NotFound`].
    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<RepoInfo, GitHubError> {
        let url = format!("{}/repos/{}/{}", self.api_base, owner, repo);
        let response = self.send(self.client.get(&url)).await?;

        match response.status() {
            status if status.is_success() => Self::read_json(response, "repository").await,
            StatusCode::NOT_FOUND => {
                Err(GitHubError::NotFound(format!("{}/{}", owner, repo)))
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Create a repository for the authenticated user.
    pub async fn create_user_repo(
        &self,
        name: &str,
        description: &str,
    ) -> Result<RepoInfo, GitHubError> {
        let url = format!("{}/user/repos", self.api_base);
        let body = CreateRepoRequest {
            name: name.to_string(),
            description: description.to_string(),
            private: false,
            auto_init: false,
        };
        let response = self.send(self.client.post(&url).json(&body)).await?;

        if response.status().is_success() {
            Self::read_json(response, "created repository").await
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Resolve a ref (e.g. "heads/main") to its commit sha.
    ///
    /// 404 maps to [`GitHubError::RefNotFound`], 409 (GitHub's signal for an
    /// empty repository) to [`GitHubError::EmptyRepository`].
    pub async fn get_ref(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<String, GitHubError> {
        let url = format!("{}/repos/{}/{}/git/ref/{}", self.api_base, owner, repo, git_ref);
        let response = self.send(self.client.get(&url)).await?;

        match response.status() {
            status if status.is_success() => {
                let git_ref: GitRef = Self::read_json(response, "ref").await?;
                Ok(git_ref.object.sha)
            }
            StatusCode::NOT_FOUND => Err(GitHubError::RefNotFound(git_ref.to_string())),
            StatusCode::CONFLICT => Err(GitHubError::EmptyRepository),
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Create a ref pointing at an existing commit.
    pub async fn create_ref(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        sha: &str,
    ) -> Result<(), GitHubError> {
        let url = format!("{}/repos/{}/{}/git/refs", self.api_base, owner, repo);
        let body = CreateRefRequest {
            full_ref: format!("refs/{}", git_ref),
            sha: sha.to_string(),
        };
        let response = self.send(self.client.post(&url).json(&body)).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Fast-forward a ref to a new commit.
    ///
    /// GitHub reports a missing ref as 422 on update (404 from some
    /// compatible hosts); both map to [`GitHubError::RefNotFound`].
    pub async fn update_ref(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        sha: &str,
    ) -> Result<(), GitHubError> {
        let url = format!("{}/repos/{}/{}/git/refs/{}", self.api_base, owner, repo, git_ref);
        let body = UpdateRefRequest {
            sha: sha.to_string(),
        };
        let response = self.send(self.client.patch(&url).json(&body)).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(GitHubError::RefNotFound(git_ref.to_string()))
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Fetch a commit object (for its tree sha).
    pub async fn get_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<GitCommit, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/git/commits/{}",
            self.api_base, owner, repo, sha
        );
        let response = self.send(self.client.get(&url)).await?;

        match response.status() {
            status if status.is_success() => Self::read_json(response, "commit").await,
            StatusCode::NOT_FOUND => Err(GitHubError::NotFound(format!("commit {}", sha))),
            StatusCode::CONFLICT => Err(GitHubError::EmptyRepository),
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Upload one content blob, returning its sha.
    pub async fn create_blob(
        &self,
        owner: &str,
        repo: &str,
        content: String,
        encoding: BlobEncoding,
    ) -> Result<String, GitHubError> {
        let url = format!("{}/repos/{}/{}/git/blobs", self.api_base, owner, repo);
        let body = CreateBlobRequest { content, encoding };
        let response = self.send(self.client.post(&url).json(&body)).await?;

        if response.status().is_success() {
            let blob: BlobCreated = Self::read_json(response, "blob").await?;
            Ok(blob.sha)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Create a tree from blob entries, optionally layered on a base tree.
    pub async fn create_tree(
        &self,
        owner: &str,
        repo: &str,
        entries: Vec<TreeEntry>,
        base_tree: Option<String>,
    ) -> Result<String, GitHubError> {
        let url = format!("{}/repos/{}/{}/git/trees", self.api_base, owner, repo);
        let body = CreateTreeRequest {
            tree: entries,
            base_tree,
        };
        let response = self.send(self.client.post(&url).json(&body)).await?;

        if response.status().is_success() {
            let tree: TreeCreated = Self::read_json(response, "tree").await?;
            Ok(tree.sha)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Create a commit pointing at a tree.
    pub async fn create_commit(
        &self,
        owner: &str,
        repo: &str,
        message: &str,
        tree: &str,
        parents: Vec<String>,
    ) -> Result<String, GitHubError> {
        let url = format!("{}/repos/{}/{}/git/commits", self.api_base, owner, repo);
        let body = CreateCommitRequest {
            message: message.to_string(),
            tree: tree.to_string(),
            parents,
        };
        let response = self.send(self.client.post(&url).json(&body)).await?;

        if response.status().is_success() {
            let commit: CommitCreated = Self::read_json(response, "created commit").await?;
            Ok(commit.sha)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Create a single file through the Contents API.
    ///
    /// This is the only write path that works on a completely empty
    /// repository, so the sync routine uses it to seed an initial commit.
    /// Returns the sha of the commit that added the file.
    pub async fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        message: &str,
        content: &[u8],
        branch: &str,
    ) -> Result<String, GitHubError> {
        use base64::Engine;

        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, owner, repo, path
        );
        let body = CreateFileRequest {
            message: message.to_string(),
            content: base64::engine::general_purpose::STANDARD.encode(content),
            branch: branch.to_string(),
        };
        debug!("Creating file {} on branch {}", path, branch);
        let response = self.send(self.client.put(&url).json(&body)).await?;

        if response.status().is_success() {
            let committed: FileCommitted = Self::read_json(response, "file commit").await?;
            Ok(committed.commit.sha)
        } else {
            Err(Self::api_error(response).await)
        }
    }
}
