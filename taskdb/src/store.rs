//! Connection pool and schema for the task table.
//!
//! A [`TaskStore`] is created once at startup via [`TaskStoreBuilder::build()`]
//! and shared by every request handler. Cloning it clones the pool handle, not
//! the pool; connections are checked out per statement and returned by the
//! pool on every exit path.

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, ExecResult};

/// Create the `tasks` table if it does not already exist.
///
/// `AUTOINCREMENT` keeps SQLite from handing out the id of a deleted row again.
pub async fn create_tasks_table(db: &impl ConnectionTrait) -> Result<ExecResult, DbErr> {
    db.execute_unprepared(
        "CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            completed BOOLEAN NOT NULL DEFAULT 0
        )",
    )
    .await
}

/// Shared handle to the task database.
#[derive(Debug, Clone)]
pub struct TaskStore {
    conn: DatabaseConnection,
}

impl TaskStore {
    /// Wrap an already-open connection. The schema is not touched.
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get a reference to the underlying SeaORM connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(self) -> Result<(), DbErr> {
        self.conn.close().await
    }
}

/// Builder for [`TaskStore`].
pub struct TaskStoreBuilder {
    database_url: String,
    max_connections: u32,
    min_connections: Option<u32>,
    acquire_timeout: Duration,
    sqlx_logging: bool,
}

impl TaskStoreBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            database_url: url.to_string(),
            max_connections: 10,
            min_connections: None,
            acquire_timeout: Duration::from_secs(3),
            sqlx_logging: false,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = Some(min);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Log every SQL statement through the `log` facade.
    pub fn with_sqlx_logging(mut self, enabled: bool) -> Self {
        self.sqlx_logging = enabled;
        self
    }

    /// Open the pool and make sure the `tasks` table exists.
    pub async fn build(self) -> Result<TaskStore, DbErr> {
        let opts = self.connect_options();
        let conn = Database::connect(opts).await?;
        create_tasks_table(&conn).await?;

        log::info!(
            "Task store ready at {} (max {} connections)",
            self.database_url,
            self.effective_max_connections()
        );

        Ok(TaskStore { conn })
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut opts = ConnectOptions::new(self.database_url.clone());
        opts.max_connections(self.effective_max_connections())
            .acquire_timeout(self.acquire_timeout)
            .sqlx_logging(self.sqlx_logging);

        // Each in-memory SQLite connection is its own database. The pool holds
        // exactly one connection and must never reap or recycle it.
        if is_memory_url(&self.database_url) {
            opts.min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        } else if let Some(min) = self.min_connections {
            opts.min_connections(min.min(self.max_connections));
        }
        opts
    }

    fn effective_max_connections(&self) -> u32 {
        if is_memory_url(&self.database_url) {
            1
        } else {
            self.max_connections
        }
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
