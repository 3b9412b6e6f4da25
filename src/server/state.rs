use axum::extract::FromRef;

use crate::github::{GitHubClient, SyncOptions};
use crate::subscriber_store::SubscriberStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSubscriberStore = Arc<dyn SubscriberStore>;
pub type OptionalGitHub = Option<Arc<GitHubClient>>;
pub type OptionalSyncOptions = Option<Arc<SyncOptions>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub subscriber_store: GuardedSubscriberStore,
    pub github: OptionalGitHub,
    pub sync_options: OptionalSyncOptions,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedSubscriberStore {
    fn from_ref(input: &ServerState) -> Self {
        input.subscriber_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for OptionalGitHub {
    fn from_ref(input: &ServerState) -> Self {
        input.github.clone()
    }
}

impl FromRef<ServerState> for OptionalSyncOptions {
    fn from_ref(input: &ServerState) -> Self {
        input.sync_options.clone()
    }
}
