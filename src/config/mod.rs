mod file_config;

pub use file_config::{FileConfig, GithubFileConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_COMMIT_MESSAGE: &str = "Deploy site snapshot";
const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 120;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,

    /// Present only when a sync target (owner + repo) is configured.
    pub github: Option<GithubSettings>,
}

#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub commit_message: String,
    pub api_base: String,
    pub workspace_dir: PathBuf,
    pub request_timeout_sec: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let gh_file = file.github.unwrap_or_default();
        let owner = gh_file.owner.or_else(|| cli.github_owner.clone());
        let repo = gh_file.repo.or_else(|| cli.github_repo.clone());

        let github = match (owner, repo) {
            (Some(owner), Some(repo)) => {
                let workspace_dir = match gh_file.workspace_dir {
                    Some(dir) => {
                        let path = PathBuf::from(dir);
                        if !path.is_dir() {
                            bail!("GitHub workspace_dir is not a directory: {:?}", path);
                        }
                        path
                    }
                    None => std::env::current_dir()?,
                };

                Some(GithubSettings {
                    owner,
                    repo,
                    branch: gh_file
                        .branch
                        .or_else(|| cli.github_branch.clone())
                        .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                    commit_message: gh_file
                        .commit_message
                        .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
                    api_base: gh_file
                        .api_base
                        .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                    workspace_dir,
                    request_timeout_sec: gh_file
                        .request_timeout_sec
                        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SEC),
                })
            }
            (None, None) => None,
            _ => bail!("GitHub sync requires both owner and repo to be configured"),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            github,
        })
    }

    pub fn subscriber_db_path(&self) -> PathBuf {
        self.db_dir.join("subscribers.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
