use std::path::PathBuf;

/// A named root directory registered for indexing
#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    pub id: i64,
    pub name: String,
    pub path: PathBuf,
    pub items: Vec<Item>,
}

/// A video file indexed inside a library
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub filename: String,
    pub filepath: PathBuf,
    pub size: u64,
    /// `HH:MM:SS`, absent when probing failed
    pub duration: Option<String>,
    pub library_id: i64,
}

/// An item discovered by a scan or upload, not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub filename: String,
    pub filepath: PathBuf,
    pub size: u64,
    pub duration: Option<String>,
    pub library_id: i64,
}

/// An account allowed to call the API
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}
