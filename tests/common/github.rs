//! In-memory mock of the GitHub REST + Git Data API.
//!
//! Backs the end-to-end sync tests: tracks repositories, refs, commits,
//! trees, and blobs so tests can assert on the exact object graph a sync
//! run produces.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::Engine;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct MockCommit {
    pub message: String,
    pub tree_sha: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockTreeEntry {
    pub path: String,
    pub mode: String,
    pub sha: String,
}

#[derive(Debug, Clone)]
pub struct MockTree {
    pub entries: Vec<MockTreeEntry>,
    pub base_tree: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MockBlob {
    pub content: String,
    pub encoding: String,
}

#[derive(Default)]
pub struct GitHubState {
    pub repo_exists: bool,
    pub repo_empty: bool,
    /// Force GET /repos to fail with a 500, for error-path tests.
    pub fail_repo_lookup: bool,
    /// "heads/main" -> commit sha
    pub refs: HashMap<String, String>,
    pub commits: HashMap<String, MockCommit>,
    pub trees: HashMap<String, MockTree>,
    pub blobs: HashMap<String, MockBlob>,
    pub created_repos: Vec<String>,
    next_object_id: u64,
}

impl GitHubState {
    fn next_sha(&mut self) -> String {
        self.next_object_id += 1;
        format!("{:040x}", self.next_object_id)
    }

    /// Seed the repository with one commit on the given branch, as if it had
    /// pre-existing history.
    pub fn seed_commit(&mut self, branch: &str, files: &[(&str, &str)]) -> String {
        let mut entries = Vec::new();
        for (path, content) in files {
            let blob_sha = self.next_sha();
            self.blobs.insert(
                blob_sha.clone(),
                MockBlob {
                    content: content.to_string(),
                    encoding: "utf-8".to_string(),
                },
            );
            entries.push(MockTreeEntry {
                path: path.to_string(),
                mode: "100644".to_string(),
                sha: blob_sha,
            });
        }

        let tree_sha = self.next_sha();
        self.trees.insert(
            tree_sha.clone(),
            MockTree {
                entries,
                base_tree: None,
            },
        );

        let commit_sha = self.next_sha();
        self.commits.insert(
            commit_sha.clone(),
            MockCommit {
                message: "Seeded history".to_string(),
                tree_sha,
                parents: Vec::new(),
            },
        );

        self.refs
            .insert(format!("heads/{}", branch), commit_sha.clone());
        self.repo_exists = true;
        self.repo_empty = false;
        commit_sha
    }

    /// Resolve a tree (following base_tree layering) to path -> blob sha.
    pub fn resolve_tree(&self, tree_sha: &str) -> BTreeMap<String, String> {
        let mut resolved = match self.trees.get(tree_sha).and_then(|t| t.base_tree.as_deref()) {
            Some(base) => self.resolve_tree(base),
            None => BTreeMap::new(),
        };
        if let Some(tree) = self.trees.get(tree_sha) {
            for entry in &tree.entries {
                resolved.insert(entry.path.clone(), entry.sha.clone());
            }
        }
        resolved
    }

    /// Commit the given ref points at, if any.
    pub fn tip_commit(&self, git_ref: &str) -> Option<MockCommit> {
        let sha = self.refs.get(git_ref)?;
        self.commits.get(sha).cloned()
    }

    /// The blob a path resolves to in the tree of the given commit.
    pub fn blob_at(&self, commit_sha: &str, path: &str) -> Option<MockBlob> {
        let commit = self.commits.get(commit_sha)?;
        let tree = self.resolve_tree(&commit.tree_sha);
        let blob_sha = tree.get(path)?;
        self.blobs.get(blob_sha).cloned()
    }
}

type SharedState = Arc<Mutex<GitHubState>>;

/// A running mock GitHub API server.
pub struct MockGitHub {
    pub base_url: String,
    pub state: SharedState,
}

impl MockGitHub {
    pub async fn spawn() -> Self {
        let state: SharedState = Arc::new(Mutex::new(GitHubState::default()));

        let app = Router::new()
            .route("/repos/{owner}/{repo}", get(get_repo))
            .route("/user/repos", post(create_user_repo))
            .route("/repos/{owner}/{repo}/git/ref/{*git_ref}", get(get_ref))
            .route("/repos/{owner}/{repo}/git/refs", post(create_ref))
            .route(
                "/repos/{owner}/{repo}/git/refs/{*git_ref}",
                axum::routing::patch(update_ref),
            )
            .route("/repos/{owner}/{repo}/git/commits/{sha}", get(get_commit))
            .route("/repos/{owner}/{repo}/git/blobs", post(create_blob))
            .route("/repos/{owner}/{repo}/git/trees", post(create_tree))
            .route("/repos/{owner}/{repo}/git/commits", post(create_commit))
            .route("/repos/{owner}/{repo}/contents/{*path}", put(put_contents))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock GitHub server");
        let port = listener.local_addr().expect("no local addr").port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock GitHub failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    /// Lock the state for setup or assertions.
    pub fn state(&self) -> std::sync::MutexGuard<'_, GitHubState> {
        self.state.lock().unwrap()
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response()
}

fn empty_repository() -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({ "message": "Git Repository is empty." })),
    )
        .into_response()
}

fn unprocessable(message: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "message": message })),
    )
        .into_response()
}

async fn get_repo(
    State(state): State<SharedState>,
    Path((owner, repo)): Path<(String, String)>,
) -> Response {
    let state = state.lock().unwrap();
    if state.fail_repo_lookup {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "mock failure" })),
        )
            .into_response();
    }
    if !state.repo_exists {
        return not_found();
    }
    Json(json!({
        "name": repo,
        "full_name": format!("{}/{}", owner, repo),
    }))
    .into_response()
}

async fn create_user_repo(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let mut state = state.lock().unwrap();
    state.repo_exists = true;
    state.repo_empty = true;
    state.created_repos.push(name.clone());
    (
        StatusCode::CREATED,
        Json(json!({
            "name": name,
            "full_name": format!("mock/{}", name),
        })),
    )
        .into_response()
}

async fn get_ref(
    State(state): State<SharedState>,
    Path((_owner, _repo, git_ref)): Path<(String, String, String)>,
) -> Response {
    let state = state.lock().unwrap();
    if state.repo_empty {
        return empty_repository();
    }
    match state.refs.get(&git_ref) {
        Some(sha) => Json(json!({
            "ref": format!("refs/{}", git_ref),
            "object": { "sha": sha, "type": "commit" },
        }))
        .into_response(),
        None => not_found(),
    }
}

async fn create_ref(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let full_ref = body["ref"].as_str().unwrap_or_default();
    let sha = body["sha"].as_str().unwrap_or_default().to_string();
    let git_ref = full_ref.trim_start_matches("refs/").to_string();

    let mut state = state.lock().unwrap();
    if !state.commits.contains_key(&sha) {
        return unprocessable("Object does not exist");
    }
    if state.refs.contains_key(&git_ref) {
        return unprocessable("Reference already exists");
    }
    state.refs.insert(git_ref.clone(), sha.clone());
    (
        StatusCode::CREATED,
        Json(json!({
            "ref": format!("refs/{}", git_ref),
            "object": { "sha": sha, "type": "commit" },
        })),
    )
        .into_response()
}

async fn update_ref(
    State(state): State<SharedState>,
    Path((_owner, _repo, git_ref)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let sha = body["sha"].as_str().unwrap_or_default().to_string();
    let mut state = state.lock().unwrap();
    if !state.refs.contains_key(&git_ref) {
        return unprocessable("Reference does not exist");
    }
    if !state.commits.contains_key(&sha) {
        return unprocessable("Object does not exist");
    }
    state.refs.insert(git_ref.clone(), sha.clone());
    Json(json!({
        "ref": format!("refs/{}", git_ref),
        "object": { "sha": sha, "type": "commit" },
    }))
    .into_response()
}

async fn get_commit(
    State(state): State<SharedState>,
    Path((_owner, _repo, sha)): Path<(String, String, String)>,
) -> Response {
    let state = state.lock().unwrap();
    match state.commits.get(&sha) {
        Some(commit) => Json(json!({
            "sha": sha,
            "message": commit.message,
            "tree": { "sha": commit.tree_sha },
            "parents": commit
                .parents
                .iter()
                .map(|p| json!({ "sha": p }))
                .collect::<Vec<_>>(),
        }))
        .into_response(),
        None => not_found(),
    }
}

async fn create_blob(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let content = body["content"].as_str().unwrap_or_default().to_string();
    let encoding = body["encoding"].as_str().unwrap_or("utf-8").to_string();
    if encoding != "utf-8" && encoding != "base64" {
        return unprocessable("Unknown encoding");
    }

    let mut state = state.lock().unwrap();
    let sha = state.next_sha();
    state.blobs.insert(sha.clone(), MockBlob { content, encoding });
    (StatusCode::CREATED, Json(json!({ "sha": sha }))).into_response()
}

async fn create_tree(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();

    let base_tree = body["base_tree"].as_str().map(|s| s.to_string());
    if let Some(base) = &base_tree {
        if !state.trees.contains_key(base) {
            return unprocessable("Base tree does not exist");
        }
    }

    let mut entries = Vec::new();
    for raw_entry in body["tree"].as_array().cloned().unwrap_or_default() {
        let sha = raw_entry["sha"].as_str().unwrap_or_default().to_string();
        if !state.blobs.contains_key(&sha) {
            return unprocessable("Tree entry blob does not exist");
        }
        entries.push(MockTreeEntry {
            path: raw_entry["path"].as_str().unwrap_or_default().to_string(),
            mode: raw_entry["mode"].as_str().unwrap_or_default().to_string(),
            sha,
        });
    }

    let sha = state.next_sha();
    state.trees.insert(sha.clone(), MockTree { entries, base_tree });
    (StatusCode::CREATED, Json(json!({ "sha": sha }))).into_response()
}

async fn create_commit(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();

    let tree_sha = body["tree"].as_str().unwrap_or_default().to_string();
    if !state.trees.contains_key(&tree_sha) {
        return unprocessable("Tree does not exist");
    }

    let parents: Vec<String> = body["parents"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|p| p.as_str().map(|s| s.to_string()))
        .collect();
    for parent in &parents {
        if !state.commits.contains_key(parent) {
            return unprocessable("Parent commit does not exist");
        }
    }

    let sha = state.next_sha();
    state.commits.insert(
        sha.clone(),
        MockCommit {
            message: body["message"].as_str().unwrap_or_default().to_string(),
            tree_sha,
            parents,
        },
    );
    (StatusCode::CREATED, Json(json!({ "sha": sha }))).into_response()
}

/// Contents API: the only write path that works on an empty repository.
/// Creates a blob, a single-entry tree layered on the current tip (if any),
/// a commit, and moves (or creates) the branch ref.
async fn put_contents(
    State(state): State<SharedState>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let encoded = body["content"].as_str().unwrap_or_default();
    let decoded = match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(_) => return unprocessable("content is not valid base64"),
    };
    let content = String::from_utf8_lossy(&decoded).to_string();
    let message = body["message"].as_str().unwrap_or_default().to_string();
    let branch = body["branch"].as_str().unwrap_or("main").to_string();

    let mut state = state.lock().unwrap();

    let blob_sha = state.next_sha();
    state.blobs.insert(
        blob_sha.clone(),
        MockBlob {
            content,
            encoding: "utf-8".to_string(),
        },
    );

    let branch_ref = format!("heads/{}", branch);
    let tip = state.refs.get(&branch_ref).cloned();
    let base_tree = tip
        .as_ref()
        .and_then(|sha| state.commits.get(sha))
        .map(|commit| commit.tree_sha.clone());

    let tree_sha = state.next_sha();
    state.trees.insert(
        tree_sha.clone(),
        MockTree {
            entries: vec![MockTreeEntry {
                path,
                mode: "100644".to_string(),
                sha: blob_sha,
            }],
            base_tree,
        },
    );

    let commit_sha = state.next_sha();
    state.commits.insert(
        commit_sha.clone(),
        MockCommit {
            message,
            tree_sha,
            parents: tip.into_iter().collect(),
        },
    );

    state.refs.insert(branch_ref, commit_sha.clone());
    state.repo_empty = false;

    (
        StatusCode::CREATED,
        Json(json!({
            "content": { "sha": commit_sha },
            "commit": { "sha": commit_sha },
        })),
    )
        .into_response()
}
