use rusqlite::Connection;

pub mod tables {
    pub const LIBRARIES: &str = "libraries";
    pub const ITEMS: &str = "items";
    pub const USERS: &str = "users";
    pub const SCANS: &str = "scans";

    pub const ALL_TABLES: &[&str] = &[LIBRARIES, ITEMS, USERS, SCANS];
}

pub mod columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const PATH: &str = "path";
    pub const FILENAME: &str = "filename";
    pub const FILEPATH: &str = "filepath";
    pub const SIZE: &str = "size";
    pub const DURATION: &str = "duration";
    pub const LIBRARY_ID: &str = "library_id";
    pub const USERNAME: &str = "username";
    pub const PASSWORD_HASH: &str = "password_hash";
    pub const SCANNED_AT: &str = "scanned_at";
    pub const ADDED: &str = "added";
}

pub use columns::*;
pub use tables::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS libraries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    path TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    filepath TEXT NOT NULL,
    size INTEGER NOT NULL,
    duration TEXT,
    library_id INTEGER NOT NULL REFERENCES libraries(id)
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scans (
    library_id INTEGER NOT NULL,
    scanned_at INTEGER NOT NULL,
    added INTEGER NOT NULL
);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
