use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::{
    config,
    domain::library::{Item, Library, NewItem, User},
    storage::{
        db::{self, SecondsSinceUnix, system_time_to_i64},
        error::StorageError,
        schema::{columns, tables},
    },
};

use columns::*;
use rusqlite::{OptionalExtension, params};
use tables::*;

/// Record of one finished scan, kept for status display
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    pub library_id: i64,
    pub scanned_at: SecondsSinceUnix,
    pub added: i64,
}

/// Main structure that implements all storage logic
pub struct MediaStore {
    pub(crate) db: rusqlite::Connection,
}

impl MediaStore {
    /// when called, opens a data base connection
    pub fn new(db_config: &config::Database) -> Result<Self, StorageError> {
        let db: rusqlite::Connection = db::open(db_config)?;
        Ok(Self::from_existing_conn(db))
    }

    pub fn from_existing_conn(db: rusqlite::Connection) -> Self {
        Self { db }
    }

    pub fn insert_library(&mut self, name: &str, path: &Path) -> Result<Library, StorageError> {
        self.db.execute(
            &format!("INSERT INTO {LIBRARIES} ({NAME}, {PATH}) VALUES (?1, ?2)"),
            params![name, path.to_string_lossy()],
        )?;

        Ok(Library {
            id: self.db.last_insert_rowid(),
            name: name.to_string(),
            path: path.to_path_buf(),
            items: Vec::new(),
        })
    }

    pub fn find_library(&mut self, id: i64) -> Result<Option<Library>, StorageError> {
        let library = self
            .db
            .query_row(
                &format!("SELECT {ID}, {NAME}, {PATH} FROM {LIBRARIES} WHERE {ID} = ?1"),
                params![id],
                Self::library_from_row,
            )
            .optional()?;

        match library {
            Some(mut library) => {
                library.items = self.items_for_library(library.id)?;
                Ok(Some(library))
            }
            None => Ok(None),
        }
    }

    pub fn library_name_taken(&mut self, name: &str) -> Result<bool, StorageError> {
        let count: i64 = self.db.query_row(
            &format!("SELECT COUNT(*) FROM {LIBRARIES} WHERE {NAME} = ?1"),
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn list_libraries(&mut self) -> Result<Vec<Library>, StorageError> {
        let mut libraries = {
            let mut stmt = self
                .db
                .prepare(&format!("SELECT {ID}, {NAME}, {PATH} FROM {LIBRARIES}"))?;

            stmt.query_map([], Self::library_from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };

        for library in &mut libraries {
            library.items = self.items_for_library(library.id)?;
        }

        Ok(libraries)
    }

    /// removes the library row, its items and its scan history in one
    /// transaction, returning how many items went away with it
    pub fn delete_library(&mut self, id: i64) -> Result<usize, StorageError> {
        let tx = self.db.transaction()?;

        let removed_items = tx.execute(
            &format!("DELETE FROM {ITEMS} WHERE {LIBRARY_ID} = ?1"),
            params![id],
        )?;
        tx.execute(
            &format!("DELETE FROM {SCANS} WHERE {LIBRARY_ID} = ?1"),
            params![id],
        )?;
        tx.execute(
            &format!("DELETE FROM {LIBRARIES} WHERE {ID} = ?1"),
            params![id],
        )?;

        tx.commit()?;
        Ok(removed_items)
    }

    pub fn items_for_library(&mut self, library_id: i64) -> Result<Vec<Item>, StorageError> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT {ID}, {FILENAME}, {FILEPATH}, {SIZE}, {DURATION}, {LIBRARY_ID}
             FROM {ITEMS} WHERE {LIBRARY_ID} = ?1"
        ))?;

        Ok(stmt
            .query_map(params![library_id], Self::item_from_row)?
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub fn find_item(&mut self, id: i64) -> Result<Option<Item>, StorageError> {
        Ok(self
            .db
            .query_row(
                &format!(
                    "SELECT {ID}, {FILENAME}, {FILEPATH}, {SIZE}, {DURATION}, {LIBRARY_ID}
                     FROM {ITEMS} WHERE {ID} = ?1"
                ),
                params![id],
                Self::item_from_row,
            )
            .optional()?)
    }

    /// filepath lookup is global, not per library: the same file indexed
    /// once stays indexed once
    pub fn find_item_by_filepath(&mut self, filepath: &Path) -> Result<Option<Item>, StorageError> {
        Ok(self
            .db
            .query_row(
                &format!(
                    "SELECT {ID}, {FILENAME}, {FILEPATH}, {SIZE}, {DURATION}, {LIBRARY_ID}
                     FROM {ITEMS} WHERE {FILEPATH} = ?1"
                ),
                params![filepath.to_string_lossy()],
                Self::item_from_row,
            )
            .optional()?)
    }

    /// persists a whole batch of newly discovered items in one transaction
    pub fn insert_items(&mut self, items: &[NewItem]) -> Result<(), StorageError> {
        let tx = self.db.transaction()?;

        for item in items {
            tx.execute(
                &format!(
                    "INSERT INTO {ITEMS} ({FILENAME}, {FILEPATH}, {SIZE}, {DURATION}, {LIBRARY_ID})
                     VALUES (?1, ?2, ?3, ?4, ?5)"
                ),
                params![
                    item.filename,
                    item.filepath.to_string_lossy(),
                    item.size as i64,
                    item.duration,
                    item.library_id
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn insert_user(&mut self, username: &str, password_hash: &str) -> Result<User, StorageError> {
        self.db.execute(
            &format!("INSERT INTO {USERS} ({USERNAME}, {PASSWORD_HASH}) VALUES (?1, ?2)"),
            params![username, password_hash],
        )?;

        Ok(User {
            id: self.db.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    pub fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(self
            .db
            .query_row(
                &format!(
                    "SELECT {ID}, {USERNAME}, {PASSWORD_HASH} FROM {USERS} WHERE {USERNAME} = ?1"
                ),
                params![username],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn record_scan(&mut self, library_id: i64, added: usize) -> Result<(), StorageError> {
        let time_secs = system_time_to_i64(SystemTime::now()).map_err(StorageError::Internal)?;

        self.db.execute(
            &format!("INSERT INTO {SCANS} ({LIBRARY_ID}, {SCANNED_AT}, {ADDED}) VALUES (?1, ?2, ?3)"),
            params![library_id, time_secs, added as i64],
        )?;
        Ok(())
    }

    pub fn last_scan(&mut self, library_id: i64) -> Result<Option<ScanRecord>, StorageError> {
        Ok(self
            .db
            .query_row(
                &format!(
                    "SELECT {LIBRARY_ID}, {SCANNED_AT}, {ADDED} FROM {SCANS}
                     WHERE {LIBRARY_ID} = ?1 ORDER BY {SCANNED_AT} DESC LIMIT 1"
                ),
                params![library_id],
                |row| {
                    Ok(ScanRecord {
                        library_id: row.get(0)?,
                        scanned_at: row.get(1)?,
                        added: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn library_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Library> {
        Ok(Library {
            id: row.get(0)?,
            name: row.get(1)?,
            path: PathBuf::from(row.get::<_, String>(2)?),
            items: Vec::new(),
        })
    }

    fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            filename: row.get(1)?,
            filepath: PathBuf::from(row.get::<_, String>(2)?),
            size: row.get::<_, i64>(3)? as u64,
            duration: row.get(4)?,
            library_id: row.get(5)?,
        })
    }
}
