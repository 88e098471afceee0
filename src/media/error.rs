use std::path::PathBuf;

use thiserror::Error;

use crate::storage::error::StorageError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("library {0} not found")]
    LibraryNotFound(i64),

    #[error("item {0} not found")]
    ItemNotFound(i64),

    #[error("directory {} does not exist", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("name {0:?} contains characters that are not allowed")]
    InvalidName(String),

    #[error("a library named {0:?} already exists")]
    DuplicateName(String),

    #[error("directory {} is not readable", .0.display())]
    DirectoryUnreadable(PathBuf),

    #[error("a scan of library {0} is already running")]
    ScanInProgress(i64),

    #[error("no existing directory on the ancestor chain of {}", .0.display())]
    NoExistingAncestor(PathBuf),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
