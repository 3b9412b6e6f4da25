//! Test server lifecycle management
//!
//! Each test gets an isolated server on a random port with its own
//! subscriber database in a temp directory.

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use waitlist_server::github::{AccessTokenSource, GitHubClient, SyncOptions, TokenCache};
use waitlist_server::server::{make_app, ServerConfig};
use waitlist_server::subscriber_store::{SqliteSubscriberStore, SubscriberStore};

pub const TEST_OWNER: &str = "mock-owner";
pub const TEST_REPO: &str = "landing";
pub const TEST_BRANCH: &str = "main";
pub const TEST_COMMIT_MESSAGE: &str = "Deploy site snapshot";

/// Test server instance with an isolated subscriber database.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Subscriber store for direct database access in tests
    pub subscriber_store: Arc<dyn SubscriberStore>,

    // Keep the temp database directory alive until drop
    _temp_db_dir: TempDir,
}

impl TestServer {
    /// Spawns a test server with no GitHub sync configured.
    pub async fn spawn() -> Self {
        Self::spawn_inner(None).await
    }

    /// Spawns a test server whose sync endpoint pushes `workspace_dir`
    /// to the given (mock) GitHub API host.
    pub async fn spawn_with_github(api_base: &str, workspace_dir: &Path) -> Self {
        let client = GitHubClient::new(
            api_base.to_string(),
            30,
            TokenCache::new(AccessTokenSource::Static("test-token".to_string())),
        )
        .expect("Failed to create GitHub client");

        let options = SyncOptions {
            owner: TEST_OWNER.to_string(),
            repo: TEST_REPO.to_string(),
            branch: TEST_BRANCH.to_string(),
            commit_message: TEST_COMMIT_MESSAGE.to_string(),
            workspace_dir: workspace_dir.to_path_buf(),
        };

        Self::spawn_inner(Some((Arc::new(client), options))).await
    }

    async fn spawn_inner(github: Option<(Arc<GitHubClient>, SyncOptions)>) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp db dir");
        let subscriber_store: Arc<dyn SubscriberStore> = Arc::new(
            SqliteSubscriberStore::new(temp_db_dir.path().join("subscribers.db"))
                .expect("Failed to open subscriber store"),
        );

        let (github_client, sync_options) = match github {
            Some((client, options)) => (Some(client), Some(options)),
            None => (None, None),
        };

        let app = make_app(
            ServerConfig::default(),
            subscriber_store.clone(),
            github_client,
            sync_options,
        )
        .expect("Failed to build app");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to read local addr")
            .port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            port,
            subscriber_store,
            _temp_db_dir: temp_db_dir,
        }
    }
}
