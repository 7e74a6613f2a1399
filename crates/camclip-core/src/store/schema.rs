use crate::StoreError;

use std::panic::Location;

use error_location::ErrorLocation;
use rusqlite::Connection;
use tracing::info;

pub(crate) const SCHEMA_VERSION: i64 = 1;

const VIDEOS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        blob_data BLOB NOT NULL,
        timestamp INTEGER NOT NULL,
        duration INTEGER NOT NULL,
        quality TEXT NOT NULL
    );
";

/// Bring `conn` to [`SCHEMA_VERSION`]. Refuses databases written by a newer build.
#[track_caller]
pub(crate) fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let location = Location::caller();
    let schema_error = |reason: String| StoreError::SchemaUpgradeFailed {
        reason,
        location: ErrorLocation::from(location),
    };

    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| schema_error(format!("read user_version: {}", e)))?;

    if version > SCHEMA_VERSION {
        return Err(schema_error(format!(
            "database schema version {} is newer than supported {}",
            version, SCHEMA_VERSION
        )));
    }

    if version < SCHEMA_VERSION {
        conn.execute_batch(VIDEOS_TABLE_SQL)
            .map_err(|e| schema_error(format!("create videos table: {}", e)))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| schema_error(format!("set user_version: {}", e)))?;

        info!(from = version, to = SCHEMA_VERSION, "Video store schema upgraded");
    }

    Ok(())
}
