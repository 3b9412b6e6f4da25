use super::models::{EmailAddress, NewSubscriber, Subscriber};
use super::schema::{create_schema, validate_schema, MIGRATIONS, SCHEMA_VERSION};
use super::SubscriberStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteSubscriberStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSubscriberStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open subscriber database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new subscriber database at {:?}", path);
            create_schema(&conn)?;
        } else {
            let db_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            if db_version < 1 || db_version > SCHEMA_VERSION {
                anyhow::bail!(
                    "Subscriber database version {} is not supported (expected 1..={})",
                    db_version,
                    SCHEMA_VERSION
                );
            }

            if db_version < SCHEMA_VERSION {
                info!(
                    "Migrating subscriber database from version {} to {}",
                    db_version, SCHEMA_VERSION
                );
                Self::migrate(&mut conn, db_version)?;
            }

            validate_schema(&conn).context("Subscriber database schema validation failed")?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &mut Connection, from_version: i64) -> Result<()> {
        let tx = conn.transaction()?;
        for (version, migration) in MIGRATIONS.iter() {
            if *version > from_version {
                migration(&tx)
                    .with_context(|| format!("Failed to run migration to version {}", version))?;
            }
        }
        tx.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        tx.commit()?;
        Ok(())
    }

    fn row_to_subscriber(row: &rusqlite::Row) -> rusqlite::Result<Subscriber> {
        let created_at_str: String = row.get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Subscriber {
            id: row.get("id")?,
            email: row.get("email")?,
            created_at,
        })
    }
}

impl SubscriberStore for SqliteSubscriberStore {
    fn create_subscriber(&self, subscriber: &NewSubscriber) -> Result<Subscriber> {
        let conn = self.conn.lock().unwrap();
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO subscribers (email, created_at) VALUES (?1, ?2)",
            params![subscriber.email.as_str(), created_at.to_rfc3339()],
        )
        .context("Failed to insert subscriber")?;

        Ok(Subscriber {
            id: conn.last_insert_rowid(),
            email: subscriber.email.as_str().to_string(),
            created_at,
        })
    }

    fn get_subscriber_by_email(&self, email: &EmailAddress) -> Result<Option<Subscriber>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, email, created_at FROM subscribers WHERE email = ?1",
            params![email.as_str()],
            Self::row_to_subscriber,
        )
        .optional()
        .context("Failed to query subscriber by email")
    }

    fn list_subscribers(&self, limit: usize, offset: usize) -> Result<Vec<Subscriber>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, created_at FROM subscribers
             ORDER BY created_at DESC, id DESC
             LIMIT ?1 OFFSET ?2",
        )?;

        let subscribers = stmt
            .query_map(params![limit as i64, offset as i64], Self::row_to_subscriber)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list subscribers")?;

        Ok(subscribers)
    }

    fn count_subscribers(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
