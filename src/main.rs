use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use waitlist_server::config::{AppConfig, CliConfig, FileConfig};
use waitlist_server::github::{AccessTokenSource, GitHubClient, SyncOptions, TokenCache};
use waitlist_server::server::{self, metrics, RequestsLoggingLevel};
use waitlist_server::subscriber_store::{SqliteSubscriberStore, SubscriberStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the subscriber database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML config file. Values there override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Owner of the GitHub repository to sync snapshots to.
    #[clap(long)]
    pub github_owner: Option<String>,

    /// Name of the GitHub repository to sync snapshots to.
    #[clap(long)]
    pub github_repo: Option<String>,

    /// Branch to push snapshots to.
    #[clap(long)]
    pub github_branch: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        logging_level: cli_args.logging_level,
        frontend_dir_path: cli_args.frontend_dir_path,
        github_owner: cli_args.github_owner,
        github_repo: cli_args.github_repo,
        github_branch: cli_args.github_branch,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!(
        "Opening subscriber database at {:?}...",
        config.subscriber_db_path()
    );
    let subscriber_store = Arc::new(SqliteSubscriberStore::new(config.subscriber_db_path())?);

    info!("Initializing metrics...");
    metrics::init_metrics();
    metrics::init_subscriber_metrics(subscriber_store.count_subscribers().unwrap_or(0));

    // Wire up the GitHub sync client if a target repository is configured
    // and credentials are available in the environment.
    let (github, sync_options) = match (&config.github, AccessTokenSource::from_env()) {
        (Some(settings), Some(token_source)) => {
            info!(
                "GitHub sync configured for {}/{}@{}",
                settings.owner, settings.repo, settings.branch
            );
            let client = GitHubClient::new(
                settings.api_base.clone(),
                settings.request_timeout_sec,
                TokenCache::new(token_source),
            )
            .map_err(|e| anyhow::anyhow!("Failed to create GitHub client: {}", e))?;
            let options = SyncOptions {
                owner: settings.owner.clone(),
                repo: settings.repo.clone(),
                branch: settings.branch.clone(),
                commit_message: settings.commit_message.clone(),
                workspace_dir: settings.workspace_dir.clone(),
            };
            (Some(Arc::new(client)), Some(options))
        }
        (Some(_), None) => {
            warn!(
                "GitHub sync is configured but no credentials were found in the \
                 environment; sync requests will be rejected"
            );
            (None, None)
        }
        (None, _) => (None, None),
    };

    let subscriber_store: Arc<dyn SubscriberStore> = subscriber_store;
    server::run_server(
        subscriber_store,
        github,
        sync_options,
        config.logging_level,
        config.port,
        config.metrics_port,
        config.frontend_dir_path,
    )
    .await
}
