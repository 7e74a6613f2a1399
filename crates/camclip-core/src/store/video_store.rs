use crate::{
    StoreError,
    quality::QualityTier,
    store::{SavedVideo, schema},
};

use std::{
    panic::Location,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use error_location::ErrorLocation;
use rusqlite::{Connection, params, types::Type};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

type SharedConnection = Arc<Mutex<Connection>>;

#[derive(Debug, Clone)]
enum StoreTarget {
    File(PathBuf),
    Memory,
}

struct StoreInner {
    target: StoreTarget,
    conn: OnceCell<SharedConnection>,
}

/// Durable key-value store of [`SavedVideo`] records backed by SQLite.
///
/// The database is opened on first use and the handle kept for the life of
/// the store. Concurrent first callers share one open. Every operation runs
/// in its own transaction on the blocking pool; nothing is retried.
#[derive(Clone)]
pub struct VideoStore {
    inner: Arc<StoreInner>,
}

impl VideoStore {
    /// Store backed by the database file at `path`. Nothing is opened yet.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_target(StoreTarget::File(path.into()))
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory() -> Self {
        Self::with_target(StoreTarget::Memory)
    }

    fn with_target(target: StoreTarget) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                target,
                conn: OnceCell::new(),
            }),
        }
    }

    /// Insert or replace `video`. A replaced id moves to the end of [`Self::get_all`].
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidRecord`] for an empty payload; otherwise any
    /// open or transaction failure.
    #[instrument(skip(self, video), fields(video_id = %video.id))]
    pub async fn put(&self, video: &SavedVideo) -> Result<(), StoreError> {
        if video.blob_data.is_empty() {
            return Err(StoreError::InvalidRecord {
                reason: format!("video {} has no media data", video.id),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let video = video.clone();
        let bytes = video.blob_data.len();
        self.with_transaction("put", move |tx| {
            tx.execute(
                "INSERT OR REPLACE INTO videos (id, blob_data, timestamp, duration, quality)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    video.id,
                    video.blob_data,
                    video.timestamp,
                    video.duration,
                    video.quality.as_str()
                ],
            )?;
            Ok(())
        })
        .await?;

        info!(bytes, "Video stored");

        Ok(())
    }

    /// Every stored record in insertion order.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<SavedVideo>, StoreError> {
        let videos = self
            .with_transaction("get_all", |tx| {
                let mut stmt = tx.prepare(
                    "SELECT id, blob_data, timestamp, duration, quality
                     FROM videos ORDER BY rowid",
                )?;
                let rows = stmt.query_map([], |row| {
                    let quality: String = row.get(4)?;
                    let quality = quality.parse::<QualityTier>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                    })?;

                    Ok(SavedVideo {
                        id: row.get(0)?,
                        blob_data: row.get(1)?,
                        timestamp: row.get(2)?,
                        duration: row.get(3)?,
                        quality,
                    })
                })?;
                let videos = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(videos)
            })
            .await?;

        debug!(count = videos.len(), "Videos loaded");

        Ok(videos)
    }

    /// Remove the record with `id`. Missing ids are not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        let removed = self
            .with_transaction("delete", move |tx| {
                tx.execute("DELETE FROM videos WHERE id = ?1", params![id])
            })
            .await?;

        debug!(removed, "Video deleted");

        Ok(())
    }

    /// Remove every record.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StoreError> {
        let removed = self
            .with_transaction("clear", |tx| tx.execute("DELETE FROM videos", []))
            .await?;

        info!(removed, "Video store cleared");

        Ok(())
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .with_transaction("count", |tx| {
                tx.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))
            })
            .await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn connection(&self) -> Result<SharedConnection, StoreError> {
        self.inner
            .conn
            .get_or_try_init(|| async {
                let target = self.inner.target.clone();
                tokio::task::spawn_blocking(move || open_connection(&target))
                    .await
                    .map_err(|e| StoreError::StoreUnavailable {
                        reason: format!("open task failed: {}", e),
                        location: ErrorLocation::from(Location::caller()),
                    })?
                    .map(|conn| Arc::new(Mutex::new(conn)))
            })
            .await
            .cloned()
    }

    async fn with_transaction<T, F>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Transaction<'_>) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.connection().await?;

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::TransactionFailed {
                reason: format!("{}: connection lock poisoned", op),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let tx = conn.transaction().map_err(|e| transaction_error(op, e))?;
            let value = f(&tx).map_err(|e| transaction_error(op, e))?;
            tx.commit().map_err(|e| transaction_error(op, e))?;

            Ok(value)
        })
        .await
        .map_err(|e| StoreError::TransactionFailed {
            reason: format!("{}: task failed: {}", op, e),
            location: ErrorLocation::from(Location::caller()),
        })?
    }
}

fn open_connection(target: &StoreTarget) -> Result<Connection, StoreError> {
    let unavailable = |reason: String| StoreError::StoreUnavailable {
        reason,
        location: ErrorLocation::from(Location::caller()),
    };

    let conn = match target {
        StoreTarget::File(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .map_err(|e| unavailable(format!("{}: {}", parent.display(), e)))?;
            }
            Connection::open(path).map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?
        }
        StoreTarget::Memory => {
            Connection::open_in_memory().map_err(|e| unavailable(e.to_string()))?
        }
    };

    schema::migrate(&conn)?;

    info!(target = ?target, "Video store opened");

    Ok(conn)
}

#[track_caller]
fn transaction_error(op: &str, e: rusqlite::Error) -> StoreError {
    StoreError::TransactionFailed {
        reason: format!("{}: {}", op, e),
        location: ErrorLocation::from(Location::caller()),
    }
}
