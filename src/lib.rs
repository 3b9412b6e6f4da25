//! Waitlist Landing-Page Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod github;
pub mod server;
pub mod subscriber_store;

// Re-export commonly used types for convenience
pub use github::{GitHubClient, SyncOptions};
pub use server::{make_app, run_server, RequestsLoggingLevel};
pub use subscriber_store::{SqliteSubscriberStore, SubscriberStore};
