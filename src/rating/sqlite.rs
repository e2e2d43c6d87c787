//! SQLite-backed rating store
//!
//! Durable storage for items and ratings. Writes share one connection
//! behind a mutex; each vote runs in an `IMMEDIATE` transaction so that a
//! second process writing to the same file cannot interleave with it.
//! File-backed stores also keep a read-only connection for sampling and
//! listing, which WAL lets proceed while a vote is being written.

use crate::error::{ArenaError, Result};
use crate::rating::elo::{EloCalculator, RatingUpdate, DEFAULT_RATING};
use crate::rating::storage::{validate_rating, validate_vote, RatingStore};
use crate::types::{Item, ItemId};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ITEM_COLUMNS: &str = "id, reference, label, rating, matches_played";

/// Rating store persisted in an SQLite database
#[derive(Debug)]
pub struct SqliteRatingStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
    /// `None` for in-memory databases, which cannot be shared
    reader: Option<Mutex<Connection>>,
}

impl SqliteRatingStore {
    /// Open (or create) the database file at `path`.
    ///
    /// The schema is not touched until [`RatingStore::initialize`] runs.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path).map_err(ArenaError::from)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(ArenaError::from)?;
        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(ArenaError::from)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(ArenaError::from)?;

        let reader = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(ArenaError::from)?;
        reader.busy_timeout(BUSY_TIMEOUT).map_err(ArenaError::from)?;

        info!(
            "Opened rating database at {} (journal_mode={})",
            path.display(),
            journal_mode
        );

        Ok(Self {
            path: Some(path),
            conn: Mutex::new(conn),
            reader: Some(Mutex::new(reader)),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(ArenaError::from)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
            reader: None,
        })
    }

    /// Location of the database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            ArenaError::Storage {
                message: "Failed to acquire database connection lock".to_string(),
            }
            .into()
        })
    }

    fn read_lock(&self) -> Result<MutexGuard<'_, Connection>> {
        let Some(reader) = &self.reader else {
            return self.lock();
        };

        reader.lock().map_err(|_| {
            ArenaError::Storage {
                message: "Failed to acquire database reader lock".to_string(),
            }
            .into()
        })
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let matches_played: i64 = row.get(4)?;
    Ok(Item {
        id: row.get(0)?,
        reference: row.get(1)?,
        label: row.get(2)?,
        rating: row.get(3)?,
        matches_played: matches_played.max(0) as u64,
    })
}

fn read_rating(conn: &Connection, id: ItemId) -> rusqlite::Result<Option<f64>> {
    conn.query_row("SELECT rating FROM images WHERE id = ?1", params![id], |row| {
        row.get(0)
    })
    .optional()
}

impl RatingStore for SqliteRatingStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reference TEXT NOT NULL UNIQUE,
                label TEXT NOT NULL,
                rating REAL NOT NULL DEFAULT {DEFAULT_RATING:.1},
                matches_played INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_images_rating ON images(rating DESC);
            "#
        ))
        .map_err(ArenaError::from)?;

        debug!("Rating database schema ready");
        Ok(())
    }

    fn seed(&self, reference: &str, label: &str) -> Result<bool> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO images (reference, label, rating) VALUES (?1, ?2, ?3)",
                params![reference, label, DEFAULT_RATING],
            )
            .map_err(ArenaError::from)?;

        Ok(inserted > 0)
    }

    fn find_by_reference(&self, reference: &str) -> Result<Option<ItemId>> {
        let conn = self.read_lock()?;
        let id = conn
            .query_row(
                "SELECT id FROM images WHERE reference = ?1",
                params![reference],
                |row| row.get(0),
            )
            .optional()
            .map_err(ArenaError::from)?;

        Ok(id)
    }

    fn sample_pair(&self) -> Result<Option<(Item, Item)>> {
        let conn = self.read_lock()?;
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {ITEM_COLUMNS} FROM images ORDER BY RANDOM() LIMIT 2"
            ))
            .map_err(ArenaError::from)?;
        let mut items = stmt
            .query_map([], item_from_row)
            .map_err(ArenaError::from)?
            .collect::<rusqlite::Result<Vec<Item>>>()
            .map_err(ArenaError::from)?;

        if items.len() < 2 {
            return Ok(None);
        }

        let second = items.swap_remove(1);
        let first = items.swap_remove(0);
        Ok(Some((first, second)))
    }

    fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let conn = self.read_lock()?;
        let item = conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM images WHERE id = ?1"),
                params![id],
                item_from_row,
            )
            .optional()
            .map_err(ArenaError::from)?;

        Ok(item)
    }

    fn update_rating(&self, id: ItemId, new_rating: f64) -> Result<()> {
        validate_rating(new_rating)?;
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE images SET rating = ?1 WHERE id = ?2",
                params![new_rating, id],
            )
            .map_err(ArenaError::from)?;

        if updated == 0 {
            return Err(ArenaError::NotFound { id }.into());
        }
        Ok(())
    }

    fn record_vote(
        &self,
        winner_id: ItemId,
        loser_id: ItemId,
        calculator: &EloCalculator,
    ) -> Result<RatingUpdate> {
        validate_vote(winner_id, loser_id)?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(ArenaError::from)?;

        // Returning early drops `tx`, which rolls back
        let winner_rating = read_rating(&tx, winner_id)
            .map_err(ArenaError::from)?
            .ok_or(ArenaError::NotFound { id: winner_id })?;
        let loser_rating = read_rating(&tx, loser_id)
            .map_err(ArenaError::from)?
            .ok_or(ArenaError::NotFound { id: loser_id })?;

        let update = calculator.rate_items(winner_id, winner_rating, loser_id, loser_rating);

        for change in [update.winner, update.loser] {
            tx.execute(
                "UPDATE images SET rating = ?1, matches_played = matches_played + 1 WHERE id = ?2",
                params![change.new_rating, change.id],
            )
            .map_err(ArenaError::from)?;
        }

        tx.commit().map_err(ArenaError::from)?;
        Ok(update)
    }

    fn list_by_rating_desc(&self) -> Result<Vec<Item>> {
        let conn = self.read_lock()?;
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {ITEM_COLUMNS} FROM images ORDER BY rating DESC, id ASC"
            ))
            .map_err(ArenaError::from)?;
        let items = stmt
            .query_map([], item_from_row)
            .map_err(ArenaError::from)?
            .collect::<rusqlite::Result<Vec<Item>>>()
            .map_err(ArenaError::from)?;

        Ok(items)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.read_lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .map_err(ArenaError::from)?;

        Ok(count.max(0) as usize)
    }
}
