use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::FsPath;
use tracing::trace;

/// The filesystem primitives a [`Walker`](crate::Walker) is built on.
pub trait FsBackend {
    /// Names of the immediate children of `dir`. The directory handle must be
    /// released before returning.
    fn list_names(&self, dir: &FsPath) -> io::Result<Vec<OsString>>;

    /// `false` when the path can't be inspected.
    fn exists(&self, path: &FsPath) -> bool;

    /// `false` when the path can't be inspected.
    fn is_dir(&self, path: &FsPath) -> bool;

    fn join(&self, base: &FsPath, name: &OsStr) -> FsPath {
        base.join_str(name)
    }

    /// Resolved location of `dir`, used to notice a walk coming back into one
    /// of its own ancestors through a link. `None` skips that check.
    fn canonical(&self, _dir: &FsPath) -> Option<PathBuf> {
        None
    }
}

impl<T: FsBackend + ?Sized> FsBackend for &T {
    fn list_names(&self, dir: &FsPath) -> io::Result<Vec<OsString>> {
        (**self).list_names(dir)
    }

    fn exists(&self, path: &FsPath) -> bool {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &FsPath) -> bool {
        (**self).is_dir(path)
    }

    fn join(&self, base: &FsPath, name: &OsStr) -> FsPath {
        (**self).join(base, name)
    }

    fn canonical(&self, dir: &FsPath) -> Option<PathBuf> {
        (**self).canonical(dir)
    }
}

/// Backend for the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl FsBackend for OsFs {
    fn list_names(&self, dir: &FsPath) -> io::Result<Vec<OsString>> {
        let entries = fs::read_dir(dir.as_path())?.map(|entry| entry.map(|e| e.file_name()));
        Ok(readable_names(dir, entries))
    }

    fn exists(&self, path: &FsPath) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &FsPath) -> bool {
        path.is_dir()
    }

    fn canonical(&self, dir: &FsPath) -> Option<PathBuf> {
        fs::canonicalize(dir.as_path()).ok()
    }
}

/// Keeps every name that was read, dropping only the entries that failed.
fn readable_names<I>(dir: &FsPath, entries: I) -> Vec<OsString>
where
    I: IntoIterator<Item = io::Result<OsString>>,
{
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(name) => Some(name),
            Err(e) => {
                trace!(dir = %dir, error = %e, "skipping unreadable entry");
                None
            }
        })
        .collect()
}
