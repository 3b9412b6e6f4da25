mod models;
mod schema;
mod sqlite_subscriber_store;

pub use models::*;
pub use schema::SCHEMA_VERSION;
pub use sqlite_subscriber_store::SqliteSubscriberStore;

use anyhow::Result;

/// Storage interface for waitlist subscribers.
///
/// The only lifecycle is creation: subscribers are never updated or deleted.
/// Invariant: at most one record per email address.
pub trait SubscriberStore: Send + Sync {
    fn create_subscriber(&self, subscriber: &NewSubscriber) -> Result<Subscriber>;
    fn get_subscriber_by_email(&self, email: &EmailAddress) -> Result<Option<Subscriber>>;
    fn list_subscribers(&self, limit: usize, offset: usize) -> Result<Vec<Subscriber>>;
    fn count_subscribers(&self) -> Result<usize>;
}
