//! Library registration, scanning and upload ingestion

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};

use crate::{
    domain::library::{Item, Library, NewItem},
    media::{
        error::MediaError,
        paths,
        probe::{DurationProbe, duration_label},
        walk::{self, FileEntry, SubdirEntry},
    },
    storage::store::{MediaStore, ScanRecord},
};

/// One uploaded file as handed over by the HTTP layer: the client-supplied
/// relative name plus the raw bytes.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub relative_name: String,
    pub bytes: Vec<u8>,
}

/// Main structure that implements all media logic: library CRUD, directory
/// browsing, scans and upload ingestion.
pub struct MediaService {
    store: Arc<Mutex<MediaStore>>,
    base_dir: PathBuf,
    probe: Box<dyn DurationProbe>,
    /// libraries with a scan, ingest or delete currently running; guards
    /// the find-before-insert window against concurrent writers
    busy: Mutex<HashSet<i64>>,
}

impl MediaService {
    pub fn new(
        store: Arc<Mutex<MediaStore>>,
        base_dir: PathBuf,
        probe: Box<dyn DurationProbe>,
    ) -> Self {
        Self {
            store,
            base_dir,
            probe,
            busy: Mutex::new(HashSet::new()),
        }
    }

    fn store(&self) -> MutexGuard<'_, MediaStore> {
        // a poisoned lock only means another request died mid-query
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a directory as a named library. The name must already be
    /// clean and unused; the path may be absolute or relative to the base
    /// media directory and must exist.
    pub fn create_library(&self, name: &str, path: &str) -> Result<Library, MediaError> {
        let sanitized = paths::sanitize_name(name);
        if sanitized != name || sanitized.is_empty() {
            return Err(MediaError::InvalidName(name.to_string()));
        }

        let mut store = self.store();
        if store.library_name_taken(name)? {
            return Err(MediaError::DuplicateName(name.to_string()));
        }

        let resolved = paths::resolve_relative(&self.base_dir, Path::new(path));
        if !resolved.is_dir() {
            return Err(MediaError::DirectoryNotFound(resolved));
        }

        let library = store.insert_library(name, &resolved)?;
        info!(
            "registered library {:?} at {}",
            library.name,
            library.path.display()
        );
        Ok(library)
    }

    pub fn list_libraries(&self) -> Result<Vec<Library>, MediaError> {
        Ok(self.store().list_libraries()?)
    }

    pub fn delete_library(&self, id: i64) -> Result<(), MediaError> {
        let mut store = self.store();
        if store.find_library(id)?.is_none() {
            return Err(MediaError::LibraryNotFound(id));
        }
        // a delete racing a scan would leave rows for a vanished library
        let _token = self.claim(id)?;

        let removed = store.delete_library(id)?;
        info!("deleted library {id} together with {removed} items");
        Ok(())
    }

    pub fn find_item(&self, id: i64) -> Result<Item, MediaError> {
        self.store().find_item(id)?.ok_or(MediaError::ItemNotFound(id))
    }

    pub fn last_scan(&self, library_id: i64) -> Result<Option<ScanRecord>, MediaError> {
        Ok(self.store().last_scan(library_id)?)
    }

    /// Immediate subdirectories of `path`, relative to the base directory
    pub fn list_subdirectories(&self, path: &str) -> Result<Vec<SubdirEntry>, MediaError> {
        let resolved = paths::resolve_relative(&self.base_dir, Path::new(path));
        walk::list_subdirectories(&resolved, Path::new(path))
    }

    /// Regular files directly inside `path`, relative to the base directory
    pub fn list_files(&self, path: &str) -> Result<Vec<FileEntry>, MediaError> {
        let resolved = paths::resolve_relative(&self.base_dir, Path::new(path));
        walk::list_files(&resolved, Path::new(path))
    }

    /// Walks the library's tree and indexes every supported video file not
    /// seen before. Returns how many items the scan added; already indexed
    /// files are left untouched, so rescanning is additive only.
    pub fn scan_library(&self, id: i64) -> Result<usize, MediaError> {
        let library = self
            .store()
            .find_library(id)?
            .ok_or(MediaError::LibraryNotFound(id))?;
        let _token = self.claim(id)?;

        info!(
            "scanning library {:?} at {}",
            library.name,
            library.path.display()
        );

        let mut new_items = Vec::new();
        for (filepath, metadata) in walk::video_files(&library.path) {
            if self.store().find_item_by_filepath(&filepath)?.is_some() {
                continue;
            }

            // probing runs outside the store lock, one file at a time
            let duration = self.probe_label(&filepath);
            let Some(filename) = filepath.file_name().map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };

            new_items.push(NewItem {
                filename,
                size: metadata.len(),
                duration,
                library_id: library.id,
                filepath,
            });
        }

        let added = new_items.len();
        if !new_items.is_empty() {
            self.store().insert_items(&new_items)?;
        }
        self.store().record_scan(library.id, added)?;

        info!("scan of library {} finished, {added} new items", library.id);
        Ok(added)
    }

    /// Writes uploaded files under the base directory and indexes them into
    /// the library. Single files that cannot be placed or written are logged
    /// and skipped; the batch keeps going.
    pub fn ingest_uploads(&self, files: Vec<UploadFile>, id: i64) -> Result<usize, MediaError> {
        let library = self
            .store()
            .find_library(id)?
            .ok_or(MediaError::LibraryNotFound(id))?;
        let _token = self.claim(id)?;

        let mut new_items = Vec::new();
        let mut written = HashSet::new();
        for file in files {
            let stripped = paths::strip_traversal(Path::new(&file.relative_name));
            let Some(filename) = stripped.file_name().map(|n| n.to_string_lossy().into_owned())
            else {
                warn!("skipping upload with empty name {:?}", file.relative_name);
                continue;
            };

            // resolved against the base dir, not the library root
            let intended = paths::resolve_relative(&self.base_dir, &stripped);
            if self.store().find_item_by_filepath(&intended)?.is_some() {
                info!("upload {} already indexed, skipping", intended.display());
                continue;
            }

            let Some(target) = Self::locate_target(&intended, &filename) else {
                warn!(
                    "no existing directory for upload {}, skipping",
                    intended.display()
                );
                continue;
            };
            if target != intended && self.store().find_item_by_filepath(&target)?.is_some() {
                info!("upload {} already indexed, skipping", target.display());
                continue;
            }
            // the same target can occur twice in one batch, the first part wins
            if written.contains(&target) {
                info!("upload {} repeated in this batch, skipping", target.display());
                continue;
            }

            if let Err(err) = std::fs::write(&target, &file.bytes) {
                warn!("could not write upload {}: {err}", target.display());
                continue;
            }
            written.insert(target.clone());

            let duration = self.probe_label(&target);
            new_items.push(NewItem {
                filename,
                size: file.bytes.len() as u64,
                duration,
                library_id: library.id,
                filepath: target,
            });
        }

        let added = new_items.len();
        if !new_items.is_empty() {
            self.store().insert_items(&new_items)?;
        }

        info!("ingested {added} uploads into library {}", library.id);
        Ok(added)
    }

    /// The path the upload actually lands at: the intended one when its
    /// parent directory exists, otherwise the file name dropped into the
    /// nearest existing ancestor. Directories are never created.
    fn locate_target(intended: &Path, filename: &str) -> Option<PathBuf> {
        let parent = intended.parent()?;
        if parent.is_dir() {
            return Some(intended.to_path_buf());
        }
        paths::nearest_existing_dir(parent).map(|dir| dir.join(filename))
    }

    fn probe_label(&self, path: &Path) -> Option<String> {
        self.probe.probe_seconds(path).map(duration_label)
    }

    fn claim(&self, id: i64) -> Result<ScanToken<'_>, MediaError> {
        let mut busy = self.busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !busy.insert(id) {
            return Err(MediaError::ScanInProgress(id));
        }
        Ok(ScanToken { service: self, id })
    }
}

/// Advisory per-library marker, released on drop
struct ScanToken<'a> {
    service: &'a MediaService,
    id: i64,
}

impl Drop for ScanToken<'_> {
    fn drop(&mut self) {
        let mut busy = self
            .service
            .busy
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        busy.remove(&self.id);
    }
}
