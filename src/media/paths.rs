//! Path resolution and name sanitization for library roots and uploads

use std::path::{Component, Path, PathBuf};

use crate::media::error::MediaError;

/// Characters that never survive [`sanitize_name`]: path separators plus
/// everything mainstream filesystems refuse in a file name.
const UNSAFE_NAME_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Strips characters unsafe for file names and trims surrounding
/// whitespace. Callers that require an already-clean value compare the
/// result against the input and reject on mismatch.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !UNSAFE_NAME_CHARS.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// `candidate` unchanged when absolute, joined onto `base` otherwise.
/// Existence is not checked here.
pub fn resolve_relative(base: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Resolves the configured base media directory at startup: an absolute
/// path is used as-is, a relative one is joined to the working directory,
/// and either way the nearest existing ancestor is selected.
pub fn resolve_base(configured: &Path) -> Result<PathBuf, MediaError> {
    let desired = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        std::env::current_dir()?.join(configured)
    };

    match nearest_existing_dir(&desired) {
        Some(dir) => Ok(dir),
        None => Err(MediaError::NoExistingAncestor(desired)),
    }
}

/// Walks up from `path` to the first ancestor that exists and is a
/// directory. None when the whole chain, root included, is gone.
pub fn nearest_existing_dir(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|candidate| candidate.is_dir())
        .map(Path::to_path_buf)
}

/// Normalizes a client-supplied path into a safe relative one. Root and
/// prefix components are dropped, and `..` segments collapse against the
/// segments before them instead of escaping upwards, so the result never
/// climbs above the directory it is later joined to.
pub fn strip_traversal(relative: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            // a leading ".." has nothing to cancel and is simply dropped
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn sanitize_keeps_clean_names() {
        assert_eq!(sanitize_name("Movies"), "Movies");
        assert_eq!(sanitize_name("Kids shows 2024"), "Kids shows 2024");
    }

    #[test]
    fn sanitize_strips_separators_and_controls() {
        assert_eq!(sanitize_name("a/b"), "ab");
        assert_eq!(sanitize_name("win\\share"), "winshare");
        assert_eq!(sanitize_name("time: 12"), "time 12");
        assert_eq!(sanitize_name("bad\u{7}name"), "badname");
        assert_eq!(sanitize_name("  padded  "), "padded");
    }

    #[test]
    fn resolve_relative_joins_only_relative_paths() {
        let base = Path::new("/srv/media");

        assert_eq!(
            resolve_relative(base, Path::new("movies")),
            PathBuf::from("/srv/media/movies")
        );
        assert_eq!(
            resolve_relative(base, Path::new("/mnt/disk/movies")),
            PathBuf::from("/mnt/disk/movies")
        );
    }

    #[test]
    fn nearest_existing_dir_walks_up() {
        let tmp = TempDir::new().unwrap();
        let existing = tmp.path().join("a/b");
        fs::create_dir_all(&existing).unwrap();

        let missing = existing.join("c/d");
        assert_eq!(nearest_existing_dir(&missing), Some(existing.clone()));

        // an existing directory resolves to itself
        assert_eq!(nearest_existing_dir(&existing), Some(existing));
    }

    #[test]
    fn resolve_base_falls_back_to_existing_ancestor() {
        let tmp = TempDir::new().unwrap();

        let resolved = resolve_base(&tmp.path().join("not/created/yet")).unwrap();
        assert_eq!(resolved, tmp.path());
    }

    #[test]
    fn strip_traversal_drops_leading_parent_segments() {
        assert_eq!(
            strip_traversal(Path::new("../../etc/passwd")),
            PathBuf::from("etc/passwd")
        );
        assert_eq!(
            strip_traversal(Path::new("../../../../x.mp4")),
            PathBuf::from("x.mp4")
        );
    }

    #[test]
    fn strip_traversal_normalizes_interior_segments() {
        assert_eq!(
            strip_traversal(Path::new("movies/../shows/e1.mp4")),
            PathBuf::from("shows/e1.mp4")
        );
        assert_eq!(
            strip_traversal(Path::new("movies/./clip.mp4")),
            PathBuf::from("movies/clip.mp4")
        );
    }

    #[test]
    fn strip_traversal_unroots_absolute_paths() {
        assert_eq!(
            strip_traversal(Path::new("/etc/passwd")),
            PathBuf::from("etc/passwd")
        );
    }
}
