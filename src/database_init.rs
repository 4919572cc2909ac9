use crate::database_migrate_refinery;
use crate::error::ErrorContext;
use crate::error::Result;
use log::info;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::fs::create_dir_all;
use std::path::Path;
use std::time::Duration;

pub type SqlitePool = Pool<SqliteConnectionManager>;

/// How long a writer waits for a concurrent transaction before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) the SQLite database at `database_path`,
/// run the embedded migrations and return a connection pool for request handlers.
pub fn init(database_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }
    info!("Using database {}", database_path.display());
    let manager = SqliteConnectionManager::file(database_path).with_init(|c| {
        c.busy_timeout(BUSY_TIMEOUT)?;
        c.execute_batch("PRAGMA foreign_keys = ON;")
    });

    let pool = r2d2::Pool::new(manager)?;
    let mut conn = pool.get()?;
    database_migrate_refinery::migrate(&mut conn)
        .context_str("Failed to run database migrations")?;
    Ok(pool)
}

/// Remove the database file so that the next `init` starts from an empty schema.
pub fn reset(database_path: &Path) -> Result<()> {
    if database_path.exists() {
        std::fs::remove_file(database_path).context(|| {
            format!("Failed to delete database {}", database_path.display())
        })?;
        info!("Old database {} deleted", database_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_init_is_repeatable_and_reset_empties() -> Result<()> {
        let dir = std::env::temp_dir().join(format!(
            "lostfound-init-{}",
            rand::thread_rng().gen::<u64>()
        ));
        let db = dir.join("nested").join("items.db");

        let pool = init(&db)?;
        pool.get()?.execute_batch(
            "INSERT INTO items (title, description, category, location, contact, deletion_code, date_posted) \
             VALUES ('Umbrella', 'Blue', 'Other', 'Gym', 'x@y.z', 'ABC123', 1);",
        )?;
        drop(pool);

        // Migrations are not re-applied on an already migrated file
        let pool = init(&db)?;
        let count: i64 = pool
            .get()?
            .query_row("SELECT COUNT(*) FROM items;", [], |r| r.get(0))?;
        assert_eq!(count, 1);
        drop(pool);

        reset(&db)?;
        assert!(!db.exists());
        let pool = init(&db)?;
        let count: i64 = pool
            .get()?
            .query_row("SELECT COUNT(*) FROM items;", [], |r| r.get(0))?;
        assert_eq!(count, 0);

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
