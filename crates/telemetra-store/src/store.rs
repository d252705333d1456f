//! Main store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use time::OffsetDateTime;
use tracing::{debug, info};

use telemetra_types::{NewReading, Reading, ReadingPatch};

use crate::error::{Error, Result};
use crate::queries::ReadingQuery;
use crate::schema;

/// SQLite-based store for sensor readings.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent read performance
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        // Initialize schema
        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Insert a new reading.
    ///
    /// `reading_time` is assigned from the server clock; clients never
    /// supply it.
    pub fn insert_reading(&self, new: &NewReading) -> Result<Reading> {
        new.validate()?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.conn.execute(
            "INSERT INTO readings (device_name, reading_value, reading_time)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![new.device_name, new.reading_value, now],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_reading(id)
    }

    /// Get a reading by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadingNotFound`] when no row has this id.
    pub fn get_reading(&self, id: i64) -> Result<Reading> {
        let mut stmt = self.conn.prepare(
            "SELECT id, device_name, reading_value, reading_time
             FROM readings WHERE id = ?",
        )?;

        stmt.query_row([id], row_to_reading)
            .optional()?
            .ok_or(Error::ReadingNotFound(id))
    }

    /// List all readings in insertion order.
    pub fn list_readings(&self) -> Result<Vec<Reading>> {
        self.query_readings(&ReadingQuery::new())
    }

    /// Query readings with filters.
    pub fn query_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let readings = stmt
            .query_map(params_ref.as_slice(), row_to_reading)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Fully replace a reading's device name and value.
    ///
    /// The original `reading_time` is preserved; it is set once at
    /// creation and only deletion removes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadingNotFound`] when no row has this id.
    pub fn replace_reading(&self, id: i64, new: &NewReading) -> Result<Reading> {
        new.validate()?;

        let updated = self.conn.execute(
            "UPDATE readings SET device_name = ?2, reading_value = ?3 WHERE id = ?1",
            rusqlite::params![id, new.device_name, new.reading_value],
        )?;

        if updated == 0 {
            return Err(Error::ReadingNotFound(id));
        }
        self.get_reading(id)
    }

    /// Apply a partial update to a reading.
    ///
    /// Fields absent from the patch are left unchanged. An empty patch
    /// is a no-op that still verifies the row exists.
    pub fn update_reading(&self, id: i64, patch: &ReadingPatch) -> Result<Reading> {
        patch.validate()?;

        let current = self.get_reading(id)?;
        if patch.is_empty() {
            return Ok(current);
        }

        self.conn.execute(
            "UPDATE readings SET device_name = ?2, reading_value = ?3 WHERE id = ?1",
            rusqlite::params![
                id,
                patch.device_name.as_deref().unwrap_or(&current.device_name),
                patch.reading_value.unwrap_or(current.reading_value),
            ],
        )?;

        self.get_reading(id)
    }

    /// Delete a reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadingNotFound`] when no row has this id.
    pub fn delete_reading(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM readings WHERE id = ?", [id])?;

        if deleted == 0 {
            return Err(Error::ReadingNotFound(id));
        }
        debug!("Deleted reading {}", id);
        Ok(())
    }

    /// Count readings, optionally for one device.
    pub fn count_readings(&self, device_name: Option<&str>) -> Result<u64> {
        let count: i64 = match device_name {
            Some(name) => self.conn.query_row(
                "SELECT COUNT(*) FROM readings WHERE device_name = ?",
                [name],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?,
        };

        Ok(count as u64)
    }
}

fn row_to_reading(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reading> {
    Ok(Reading {
        id: row.get(0)?,
        device_name: row.get(1)?,
        reading_value: row.get(2)?,
        reading_time: OffsetDateTime::from_unix_timestamp(row.get(3)?)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH),
    })
}
