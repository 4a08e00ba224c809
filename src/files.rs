//! File discovery for the file-based inputs.
//!
//! A [`PathSource`] is what the caller handed us; [`PathSource::resolve`] turns it
//! into the ordered list of files that will actually be read. Directories are
//! expanded at resolution time, so files added between two passes are seen by
//! the second one.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{InputError, Result};

/// Where file-based records come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSource {
    /// One file.
    Single(PathBuf),
    /// Several files, read in the given order.
    List(Vec<PathBuf>),
    /// Every matching file directly inside a directory, in sorted order.
    Directory(PathBuf),
    /// One path that is a directory or a file, decided each time it is resolved.
    Auto(PathBuf),
}

impl PathSource {
    /// A single path whose kind is checked on disk at every resolution, so a
    /// directory created after construction is expanded like any other.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        PathSource::Auto(path.into())
    }

    /// The directory this source expands right now, if any.
    pub fn directory(&self) -> Option<&Path> {
        match self {
            PathSource::Directory(d) => Some(d),
            PathSource::Auto(p) if expand_home(p).is_dir() => Some(p),
            _ => None,
        }
    }

    /// Resolve to a concrete, ordered file list.
    ///
    /// `extension` filters directory listings only; explicit paths pass through
    /// untouched.
    pub fn resolve(&self, extension: &str) -> Result<Vec<PathBuf>> {
        match self {
            PathSource::Single(p) => Ok(vec![p.clone()]),
            PathSource::List(ps) => Ok(ps.clone()),
            PathSource::Directory(d) => list_files(d, extension),
            PathSource::Auto(p) if expand_home(p).is_dir() => list_files(p, extension),
            PathSource::Auto(p) => Ok(vec![p.clone()]),
        }
    }
}

impl From<PathBuf> for PathSource {
    fn from(p: PathBuf) -> Self {
        PathSource::from_path(p)
    }
}

impl From<&str> for PathSource {
    fn from(p: &str) -> Self {
        PathSource::from_path(p)
    }
}

impl From<Vec<PathBuf>> for PathSource {
    fn from(ps: Vec<PathBuf>) -> Self {
        PathSource::List(ps)
    }
}

/// List the files directly inside `directory` whose extension matches
/// `extension` (case-insensitive), sorted by path.
///
/// Hidden entries and sub-directories are skipped. A leading `~` is expanded to
/// the user's home directory. A directory with no matching file yields an empty
/// list.
pub fn list_files(directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let dir = expand_home(directory);
    let entries = fs::read_dir(&dir).map_err(|e| InputError::not_found(&dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| InputError::not_found(&dir, e))?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_file() && has_extension(&path, extension) {
            files.push(path);
        }
    }
    files.sort();

    debug!(directory = %dir.display(), extension, n_files = files.len(), "listed input files");
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
