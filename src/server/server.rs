use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::github::{sync_repository, GitHubClient, SyncOptions};
use crate::subscriber_store::{EmailAddress, NewSubscriber, SubscriberStore};
use tower_http::services::ServeDir;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::metrics::{
    metrics_handler, record_signup, record_sync_run, set_subscribers_total,
};
use super::{log_requests, state::*, RequestsLoggingLevel, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub subscribers: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct CreateSubscriberBody {
    pub email: String,
}

#[derive(Serialize)]
struct CreateSubscriberResponse {
    success: bool,
    message: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Deserialize, Debug)]
struct ListSubscribersQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
struct ListSubscribersResponse {
    count: usize,
    subscribers: Vec<crate::subscriber_store::Subscriber>,
}

#[derive(Serialize)]
struct SyncSuccessResponse {
    success: bool,
    #[serde(rename = "commitSha")]
    commit_sha: String,
}

#[derive(Serialize)]
struct SyncErrorResponse {
    success: bool,
    error: String,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        subscribers: state.subscriber_store.count_subscribers().unwrap_or(0),
    };
    Json(stats)
}

async fn post_subscriber(
    State(store): State<GuardedSubscriberStore>,
    Json(body): Json<CreateSubscriberBody>,
) -> Response {
    let email = match EmailAddress::parse(&body.email) {
        Ok(email) => email,
        Err(err) => {
            record_signup("invalid");
            return (
                StatusCode::BAD_REQUEST,
                Json(MessageResponse {
                    message: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    match store.get_subscriber_by_email(&email) {
        Ok(Some(_)) => {
            record_signup("duplicate");
            return (
                StatusCode::CONFLICT,
                Json(MessageResponse {
                    message: "Email already subscribed".to_string(),
                }),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(err) => {
            error!("Failed to look up subscriber: {}", err);
            record_signup("error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    message: err.to_string(),
                }),
            )
                .into_response();
        }
    }

    match store.create_subscriber(&NewSubscriber { email }) {
        Ok(subscriber) => {
            info!("New subscriber: {}", subscriber.email);
            record_signup("created");
            if let Ok(count) = store.count_subscribers() {
                set_subscribers_total(count);
            }
            (
                StatusCode::CREATED,
                Json(CreateSubscriberResponse {
                    success: true,
                    message: "Successfully subscribed!".to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Failed to create subscriber: {}", err);
            record_signup("error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn get_subscribers(
    State(store): State<GuardedSubscriberStore>,
    Query(query): Query<ListSubscribersQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(100);
    let offset = query.offset.unwrap_or(0);

    match store.list_subscribers(limit, offset) {
        Ok(subscribers) => Json(ListSubscribersResponse {
            count: subscribers.len(),
            subscribers,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to list subscribers: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn post_sync_github(State(state): State<ServerState>) -> Response {
    let (client, options) = match (&state.github, &state.sync_options) {
        (Some(client), Some(options)) => (client.clone(), options.clone()),
        _ => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncErrorResponse {
                    success: false,
                    error: "GitHub sync is not configured".to_string(),
                }),
            )
                .into_response();
        }
    };

    let start = Instant::now();
    match sync_repository(&client, &options).await {
        Ok(report) => {
            record_sync_run("success", start.elapsed());
            info!(
                "GitHub sync completed: {} ({} files)",
                report.commit_sha, report.files_synced
            );
            Json(SyncSuccessResponse {
                success: true,
                commit_sha: report.commit_sha,
            })
            .into_response()
        }
        Err(err) => {
            record_sync_run("failure", start.elapsed());
            error!("GitHub sync error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncErrorResponse {
                    success: false,
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

impl ServerState {
    fn new(
        config: ServerConfig,
        subscriber_store: Arc<dyn SubscriberStore>,
        github: Option<Arc<GitHubClient>>,
        sync_options: Option<SyncOptions>,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            subscriber_store,
            github,
            sync_options: sync_options.map(Arc::new),
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    subscriber_store: Arc<dyn SubscriberStore>,
    github: Option<Arc<GitHubClient>>,
    sync_options: Option<SyncOptions>,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), subscriber_store, github, sync_options);

    let api_routes: Router = Router::new()
        .route("/subscribers", post(post_subscriber).get(get_subscribers))
        .route("/sync-github", post(post_sync_github))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .route("/healthz", get(home).with_state(state.clone()))
        .nest("/api", api_routes);

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    subscriber_store: Arc<dyn SubscriberStore>,
    github: Option<Arc<GitHubClient>>,
    sync_options: Option<SyncOptions>,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    metrics_port: u16,
    frontend_dir_path: Option<String>,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
        frontend_dir_path,
    };
    let app = make_app(config, subscriber_store, github, sync_options)?;

    let metrics_app: Router = Router::new().route("/metrics", get(metrics_handler));
    let metrics_listener =
        tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port)).await?;
    info!("Metrics server listening on port {}", metrics_port);
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            error!("Metrics server error: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Server listening on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
