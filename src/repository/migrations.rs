//! Applies the `cetane` migration registry (spec ambient stack, `crate::migrations`)
//! against a SQLite database file. Grounded on the teacher's own
//! `repository/migrations.rs`, trimmed to the SQLite path this crate's
//! default backend and test harness both use — Postgres deployments run
//! migrations out of band with whatever tooling manages that database, since
//! this crate's `postgres` feature only pulls in `diesel-async`'s connection
//! types, not a standalone client to drive `cetane`'s migrator.

use cetane::backend::Sqlite;
use cetane::migrator::{MigrationStateStore, Migrator};
use tracing::info;

fn migration_error(msg: impl std::fmt::Display) -> diesel::result::Error {
    diesel::result::Error::QueryBuilderError(msg.to_string().into())
}

/// Runs pending migrations against the SQLite file at `database_url`
/// (an optional `sqlite:` prefix is stripped). Safe to call on every
/// startup; already-applied migrations are skipped.
pub async fn run_sqlite_migrations(database_url: &str) -> Result<(), diesel::result::Error> {
    let url = database_url
        .strip_prefix("sqlite:")
        .unwrap_or(database_url)
        .to_string();

    tokio::task::spawn_blocking(move || {
        let conn = rusqlite::Connection::open(&url).map_err(migration_error)?;
        let backend = Sqlite;
        let registry = crate::migrations::registry();
        let state = SqliteState::new(&conn)?;

        let mut migrator = Migrator::new(&registry, &backend, state);
        let applied = migrator
            .migrate_forward(|sql| conn.execute_batch(sql).map_err(|e| e.to_string()))
            .map_err(migration_error)?;

        for name in &applied {
            info!(migration = %name, "applied migration");
        }
        if applied.is_empty() {
            info!("no pending migrations");
        }

        Ok(())
    })
    .await
    .map_err(migration_error)?
}

struct SqliteState<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> SqliteState<'a> {
    fn new(conn: &'a rusqlite::Connection) -> Result<Self, diesel::result::Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS __cetane_migrations (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .map_err(migration_error)?;
        Ok(Self { conn })
    }
}

impl MigrationStateStore for SqliteState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM __cetane_migrations ORDER BY name")
            .map_err(|e| e.to_string())?;

        stmt.query_map([], |row| row.get(0))
            .map_err(|e| e.to_string())?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| e.to_string())
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute("INSERT OR IGNORE INTO __cetane_migrations (name) VALUES (?1)", [name])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute("DELETE FROM __cetane_migrations WHERE name = ?1", [name])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}
