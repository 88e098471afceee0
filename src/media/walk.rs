//! Module to enumerate video files and directories in the file system

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

use crate::media::error::MediaError;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "flv"];

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// One subdirectory visible while browsing
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SubdirEntry {
    pub name: String,
    /// the requested path extended with this entry, so a client can pass
    /// it straight back to descend
    pub relative_path: PathBuf,
}

/// One file visible while browsing
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FileEntry {
    pub name: String,
    pub relative_path: PathBuf,
    pub size: u64,
}

/// Recursively yields every supported video file under `root` together
/// with its metadata. Unreadable entries are logged and skipped; the walk
/// itself never fails.
pub fn video_files(root: &Path) -> impl Iterator<Item = (PathBuf, Metadata)> {
    let root_label = root.display().to_string();

    WalkDir::new(root)
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("error while scanning {root_label}, skipping an entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_video_file(entry.path()))
        .filter_map(|entry| match entry.metadata() {
            Ok(metadata) => Some((entry.into_path(), metadata)),
            Err(err) => {
                warn!("cannot stat {}, skipping: {err}", entry.path().display());
                None
            }
        })
}

/// Lists the immediate subdirectories of `resolved`. `requested` is the
/// path the client asked for; entry paths extend it.
pub fn list_subdirectories(
    resolved: &Path,
    requested: &Path,
) -> Result<Vec<SubdirEntry>, MediaError> {
    let mut entries = Vec::new();

    for entry in read_dir_checked(resolved)? {
        let Some((entry, file_type)) = typed_entry(resolved, entry) else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push(SubdirEntry {
            relative_path: requested.join(&name),
            name,
        });
    }

    Ok(entries)
}

/// Lists every regular file directly inside `resolved`, whatever its
/// extension. Used for browsing, not for indexing.
pub fn list_files(resolved: &Path, requested: &Path) -> Result<Vec<FileEntry>, MediaError> {
    let mut entries = Vec::new();

    for entry in read_dir_checked(resolved)? {
        let Some((entry, file_type)) = typed_entry(resolved, entry) else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                warn!("cannot stat {}, skipping: {err}", entry.path().display());
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push(FileEntry {
            relative_path: requested.join(&name),
            name,
            size,
        });
    }

    Ok(entries)
}

fn read_dir_checked(path: &Path) -> Result<std::fs::ReadDir, MediaError> {
    if !path.is_dir() {
        return Err(MediaError::DirectoryNotFound(path.to_path_buf()));
    }
    std::fs::read_dir(path).map_err(|err| match err.kind() {
        io::ErrorKind::PermissionDenied => MediaError::DirectoryUnreadable(path.to_path_buf()),
        _ => MediaError::Io(err),
    })
}

fn typed_entry(
    dir: &Path,
    entry: io::Result<std::fs::DirEntry>,
) -> Option<(std::fs::DirEntry, std::fs::FileType)> {
    let entry = match entry {
        Ok(entry) => entry,
        Err(err) => {
            warn!("skipping entry in {}: {err}", dir.display());
            return None;
        }
    };
    match entry.file_type() {
        Ok(file_type) => Some((entry, file_type)),
        Err(err) => {
            warn!("cannot stat {}, skipping: {err}", entry.path().display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::*;
    use crate::media::error::MediaError;

    #[test]
    fn video_extension_check_is_case_insensitive() {
        assert!(is_video_file(Path::new("a.mp4")));
        assert!(is_video_file(Path::new("b.MKV")));
        assert!(!is_video_file(Path::new("notes.txt")));
        assert!(!is_video_file(Path::new("no_extension")));
    }

    #[test]
    fn walk_finds_nested_video_files() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("season1");
        fs::create_dir_all(&nested).unwrap();

        let top = tmp.path().join("movie.mp4");
        let deep = nested.join("episode.MKV");
        let ignored = nested.join("subtitles.srt");

        fs::write(&top, b"aaa").unwrap();
        fs::write(&deep, b"bbbb").unwrap();
        fs::write(&ignored, b"ccc").unwrap();

        let found: Vec<_> = video_files(tmp.path()).collect();

        assert_eq!(found.len(), 2);
        let paths: Vec<_> = found.iter().map(|(p, _)| p.as_path()).collect();
        assert!(paths.contains(&top.as_path()));
        assert!(paths.contains(&deep.as_path()));

        let sizes: Vec<_> = found.iter().map(|(_, m)| m.len()).collect();
        assert!(sizes.contains(&3));
        assert!(sizes.contains(&4));
    }

    #[test]
    fn walk_of_missing_root_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone");

        assert_eq!(video_files(&missing).count(), 0);
    }

    #[test]
    fn list_subdirectories_returns_only_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("shows")).unwrap();
        fs::create_dir(tmp.path().join("movies")).unwrap();
        fs::write(tmp.path().join("loose.mp4"), b"x").unwrap();

        let mut entries = list_subdirectories(tmp.path(), Path::new("media")).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "movies");
        assert_eq!(entries[0].relative_path, PathBuf::from("media/movies"));
        assert_eq!(entries[1].name, "shows");
    }

    #[test]
    fn list_files_returns_every_regular_file() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("clip.mp4"), b"abcd").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"xy").unwrap();

        let mut entries = list_files(tmp.path(), Path::new("")).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        // browsing shows unsupported extensions too, only indexing filters
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "clip.mp4");
        assert_eq!(entries[0].size, 4);
        assert_eq!(entries[0].relative_path, PathBuf::from("clip.mp4"));
        assert_eq!(entries[1].name, "notes.txt");
    }

    #[test]
    fn listing_a_missing_path_fails_with_not_found() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone");

        let err = list_subdirectories(&missing, Path::new("gone")).unwrap_err();
        assert!(matches!(err, MediaError::DirectoryNotFound(_)));
    }

    #[test]
    fn listing_a_regular_file_fails_with_not_found() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("clip.mp4");
        fs::write(&file, b"x").unwrap();

        let err = list_files(&file, Path::new("clip.mp4")).unwrap_err();
        assert!(matches!(err, MediaError::DirectoryNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn listing_an_unreadable_directory_fails_with_unreadable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // running as root the permission bits do not apply
        if fs::read_dir(&locked).is_ok() {
            return;
        }

        let err = list_files(&locked, Path::new("locked")).unwrap_err();
        assert!(matches!(err, MediaError::DirectoryUnreadable(_)));
        let err = list_subdirectories(&locked, Path::new("locked")).unwrap_err();
        assert!(matches!(err, MediaError::DirectoryUnreadable(_)));

        // restore so the tempdir can be cleaned up
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
