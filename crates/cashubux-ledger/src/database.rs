/*!
# Ledger Database

1. **Open** an existing ledger with `open_ledger_db()` (file path) or
   `connect_ledger_db()` (any sqlite URL).
2. **Migrate** it with `migrate_ledger_db()`.
3. Tests and tooling use `new_ephemeral_ledger_db()`, a migrated database
   backed by a temporary file.

Connections are opened with a single pooled connection. Every ledger operation
runs inside one database transaction, so a single connection serializes them.
*/

use cashubux_migrations::MigratorTrait as _;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    SeaOrm(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

fn sqlite_url(path: &Path, mode: &str) -> DatabaseResult<Url> {
    let mut url = Url::parse("sqlite:///")?;
    url.set_path(&path.to_string_lossy());
    url.set_query(Some(&format!("mode={mode}")));
    Ok(url)
}

/// Connect to a ledger database by URL with a single pooled connection.
pub async fn connect_ledger_db(url: &str) -> DatabaseResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Open a ledger database file, creating it when missing.
pub async fn open_ledger_db<P: AsRef<Path>>(path: P) -> DatabaseResult<DatabaseConnection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let url = sqlite_url(path, "rwc")?;
    connect_ledger_db(url.as_str()).await
}

/// Apply all pending migrations.
pub async fn migrate_ledger_db(conn: &DatabaseConnection) -> DatabaseResult<()> {
    cashubux_migrations::Migrator::up(conn, None).await?;
    Ok(())
}

/// Create a fresh, migrated ledger database backed by a temporary file.
pub async fn new_ephemeral_ledger_db() -> DatabaseResult<DatabaseConnection> {
    let temp = tempfile::NamedTempFile::new()?;
    let url = sqlite_url(temp.path(), "rw")?;

    let conn = connect_ledger_db(url.as_str()).await?;
    migrate_ledger_db(&conn).await?;

    // Keep the temp file alive by forgetting it (cleaned up when process exits)
    std::mem::forget(temp);

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait as _, DbBackend, Statement};
    use tempfile::TempDir;

    async fn table_exists(conn: &DatabaseConnection, table: &str) -> bool {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type='table' AND name=?",
            [table.into()],
        );
        conn.query_one(stmt).await.unwrap().is_some()
    }

    #[tokio::test]
    async fn test_new_ephemeral_ledger_db() {
        let conn = new_ephemeral_ledger_db().await.unwrap();
        assert!(conn.get_database_backend() == DbBackend::Sqlite);

        for table in ["accounts", "transactions", "campaigns", "spin_history"] {
            assert!(table_exists(&conn, table).await, "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_open_creates_file_and_migrates() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("ledger.db");

        let conn = open_ledger_db(&db_path).await.unwrap();
        assert!(db_path.exists());
        assert!(!table_exists(&conn, "accounts").await);

        migrate_ledger_db(&conn).await.unwrap();
        assert!(table_exists(&conn, "accounts").await);

        // Idempotent
        migrate_ledger_db(&conn).await.unwrap();
    }
}
