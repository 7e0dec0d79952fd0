use std::{sync::Arc, time::Duration};

use migration::Migrator;
use sea_orm::{
    ConnectOptions, Database as Connector, DatabaseConnection,
    sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous},
};
use sea_orm_migration::MigratorTrait;
use tokio::sync::watch;
use tracing::debug;

use crate::error::AppResult;

/// Pooled connections to an in-memory database must never be recycled, the
/// data lives and dies with the connection.
const MEMORY_CONNECTION_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

/// The migrated database plus the change feed shared by every store built on
/// it. Clones share both.
#[derive(Clone)]
pub struct Database {
    conn: DatabaseConnection,
    favorites_revision: Arc<watch::Sender<u64>>,
}

impl Database {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let conn = connect_and_migrate(database_url).await?;
        let (favorites_revision, _) = watch::channel(0);
        Ok(Self { conn, favorites_revision: Arc::new(favorites_revision) })
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub(crate) fn favorites_revision(&self) -> Arc<watch::Sender<u64>> {
        self.favorites_revision.clone()
    }
}

async fn connect_and_migrate(database_url: &str) -> AppResult<DatabaseConnection> {
    let in_memory = database_url.contains(":memory:");

    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);
    // Applied by sqlx on every pooled connection as it is opened.
    options.map_sqlx_sqlite_opts(move |opts| {
        let opts = opts
            .synchronous(SqliteSynchronous::Normal)
            .pragma("cache_size", "-16000");
        if in_memory { opts } else { opts.journal_mode(SqliteJournalMode::Wal) }
    });
    if in_memory {
        // Every pooled connection would otherwise get its own empty database.
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(MEMORY_CONNECTION_LIFETIME)
            .max_lifetime(MEMORY_CONNECTION_LIFETIME);
    }

    let db = Connector::connect(options).await?;

    Migrator::up(&db, None).await?;
    debug!(database_url, "database ready");
    Ok(db)
}

#[cfg(test)]
pub(crate) async fn memory() -> Database {
    Database::connect("sqlite::memory:").await.expect("in-memory database")
}
