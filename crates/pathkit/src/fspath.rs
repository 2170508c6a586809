use derivative::Derivative;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::{self, Metadata};
use std::path::{Component, Path, PathBuf};

use crate::join;
use crate::{FsBackend, OsFs, Result};
use eyre::{eyre, WrapErr};
use serde::{Serialize, Serializer};
use tracing::trace;

/// An immutable, never-empty path.
///
/// The text is kept exactly as the OS handed it over, so names that are not
/// valid UTF-8 survive joins, listings and walks.
///
/// Every transformation returns a new value. Filesystem queries never fail:
/// a path that can't be inspected is reported as missing, and a directory
/// that can't be read lists as empty.
#[derive(Derivative, PartialOrd, Ord)]
#[derivative(Debug = "transparent", Clone, Hash, PartialEq)]
pub struct FsPath {
    raw: OsString,
}

impl FsPath {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = path.as_ref().as_os_str();
        if raw.is_empty() {
            return Err(eyre!("path must not be empty"));
        }
        Ok(Self {
            raw: raw.to_owned(),
        })
    }

    /// Wraps a string that is known to be non-empty.
    ///
    /// # Panics
    ///
    /// Panics on an empty string.
    pub fn from_raw<S: Into<OsString>>(raw: S) -> Self {
        let raw = raw.into();
        assert!(!raw.is_empty(), "path must not be empty");
        Self { raw }
    }

    pub fn as_os_str(&self) -> &OsStr {
        &self.raw
    }

    /// `None` when the path is not valid UTF-8.
    pub fn to_str(&self) -> Option<&str> {
        self.raw.to_str()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        self.raw.to_string_lossy()
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.raw)
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.raw)
    }

    pub fn display(&self) -> std::path::Display {
        self.as_path().display()
    }

    #[must_use]
    pub fn join(&self, path: &FsPath) -> FsPath {
        self.join_str(path.as_os_str())
    }

    /// Appends one segment. Separators inside `segment`, `/` and `\` alike,
    /// split it into further components, so a Unix name containing `\`
    /// can't be joined as a single component.
    #[must_use]
    pub fn join_str<S: AsRef<OsStr>>(&self, segment: S) -> FsPath {
        // base is non-empty, so the result is too
        Self::from_raw(join::join_os(&self.raw, segment.as_ref()))
    }

    #[must_use]
    pub fn join_all<S: AsRef<OsStr>>(&self, segments: &[S]) -> FsPath {
        let joined = segments
            .iter()
            .fold(self.raw.clone(), |acc, segment| {
                join::join_os(&acc, segment.as_ref())
            });
        Self::from_raw(joined)
    }

    #[must_use]
    pub fn clean(&self) -> FsPath {
        Self::from_raw(join::clean(&self.raw))
    }

    pub fn to_absolute(&self) -> Result<FsPath> {
        if self.as_path().is_absolute() {
            return Ok(self.clean());
        }
        let cwd = std::env::current_dir().wrap_err("Failed to read the current directory")?;
        let cwd = FsPath::new(&cwd).wrap_err_with(|| {
            format!("Failed to use '{}' as a base for absolute paths", cwd.display())
        })?;
        Ok(cwd.join(self).clean())
    }

    pub fn exists(&self) -> bool {
        self.as_path().exists()
    }

    pub fn is_dir(&self) -> bool {
        self.as_path().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.as_path().is_file()
    }

    /// Names of the immediate children, in directory order.
    pub fn list_names(&self) -> Vec<OsString> {
        OsFs.list_names(self).unwrap_or_default()
    }

    /// Immediate children joined onto this path.
    pub fn list(&self) -> Vec<FsPath> {
        self.list_names()
            .iter()
            .map(|name| self.join_str(name))
            .collect()
    }

    /// Lazily reads the immediate children along with their metadata.
    pub fn entries(&self) -> Entries {
        let inner = match fs::read_dir(self.as_path()) {
            Ok(read_dir) => Some(read_dir),
            Err(e) => {
                trace!(path = %self, error = %e, "directory unreadable, no entries");
                None
            }
        };
        Entries {
            dir: self.clone(),
            inner,
        }
    }

    /// Windows volume prefix such as `C:`; empty on other platforms.
    pub fn volume_name(&self) -> &OsStr {
        match self.as_path().components().next() {
            Some(Component::Prefix(prefix)) => prefix.as_os_str(),
            _ => OsStr::new(""),
        }
    }

    pub fn name(&self) -> &OsStr {
        join::base_name(&self.raw)
    }

    /// Text after the last `.` of the final component.
    pub fn extension(&self) -> Option<&OsStr> {
        join::split_extension(self.name())
            .1
            .filter(|ext| !ext.is_empty())
    }

    pub fn name_without_extension(&self) -> &OsStr {
        join::split_extension(self.name()).0
    }

    /// Replaces the extension of the final component. A leading `.` on
    /// `extension` is optional. Paths without an extension are returned as-is.
    #[must_use]
    pub fn change_extension(&self, extension: &str) -> FsPath {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        if extension.is_empty() {
            return self.clone();
        }
        let raw = self.raw.as_encoded_bytes();
        let name_start = raw
            .iter()
            .rposition(|&b| join::is_separator(b))
            .map_or(0, |idx| idx + 1);
        match raw[name_start..].iter().rposition(|&b| b == b'.') {
            Some(dot) if name_start + dot + 1 < raw.len() => {
                let mut changed = raw[..=name_start + dot].to_vec();
                changed.extend_from_slice(extension.as_bytes());
                Self::from_raw(join::os_string(changed))
            }
            _ => self.clone(),
        }
    }

    pub fn metadata(&self) -> Option<Metadata> {
        fs::metadata(self.as_path()).ok()
    }

    pub fn size(&self) -> Option<u64> {
        self.metadata().map(|meta| meta.len())
    }

    /// Deletes the file or empty directory at this path.
    pub fn remove(&self) -> Result<()> {
        if self.is_dir() {
            fs::remove_dir(self.as_path())
                .wrap_err_with(|| format!("Failed to remove directory '{}'", self))
        } else {
            fs::remove_file(self.as_path())
                .wrap_err_with(|| format!("Failed to remove file '{}'", self))
        }
    }
}

impl Eq for FsPath {}

/// Serializes as a string. Bytes that are not valid UTF-8 are replaced with
/// `U+FFFD`.
impl Serialize for FsPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

/// Iterator over a directory's children, created by [`FsPath::entries`].
///
/// An entry that can't be read or inspected is skipped. The directory handle
/// is released once the listing is exhausted or the iterator is dropped.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Entries {
    dir: FsPath,
    #[derivative(Debug = "ignore")]
    inner: Option<fs::ReadDir>,
}

impl Iterator for Entries {
    type Item = (FsPath, Metadata);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.as_mut()?.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    trace!(dir = %self.dir, error = %e, "skipping unreadable entry");
                    continue;
                }
                None => {
                    self.inner = None;
                    return None;
                }
            };
            match entry.metadata() {
                Ok(metadata) => return Some((self.dir.join_str(entry.file_name()), metadata)),
                Err(e) => {
                    trace!(dir = %self.dir, error = %e, "skipping entry that can't be inspected");
                }
            }
        }
    }
}

// `From<&FsPath> for PathBuf` is provided by std's blanket
// `impl<T: AsRef<OsStr>> From<&T> for PathBuf`.

impl From<FsPath> for PathBuf {
    fn from(path: FsPath) -> Self {
        PathBuf::from(path.raw)
    }
}

impl From<FsPath> for OsString {
    fn from(path: FsPath) -> Self {
        path.raw
    }
}

impl AsRef<Path> for FsPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl AsRef<OsStr> for FsPath {
    fn as_ref(&self) -> &OsStr {
        self.as_os_str()
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display(), f)
    }
}

crate::helper::impl_try_from!(&str => FsPath);
crate::helper::impl_try_from!(String => FsPath);
crate::helper::impl_try_from!(&String => FsPath);
crate::helper::impl_try_from!(&Path => FsPath);
crate::helper::impl_try_from!(PathBuf => FsPath);
crate::helper::impl_try_from!(&PathBuf => FsPath);
crate::helper::impl_try_from!(OsString => FsPath);
crate::helper::impl_try_from!(&OsStr => FsPath);

#[cfg(test)]
mod test {

    #![allow(warnings, unused)]

    use super::*;
    use crate::join::SEPARATOR;
    use crate::test::{fspath, tree_root};
    use temptree::temptree;

    fn sep(s: &str) -> String {
        s.replace('/', &SEPARATOR.to_string())
    }

    #[test]
    fn makes_new() {
        let path = FsPath::new("dir/file.txt").expect("should be able to make an FsPath");
        assert_eq!(path.to_string(), "dir/file.txt");
    }

    #[test]
    fn make_new_fails_with_empty_path() {
        let path = FsPath::new("");
        assert!(path.is_err());
    }

    #[test]
    #[should_panic(expected = "path must not be empty")]
    fn from_raw_panics_on_empty_string() {
        FsPath::from_raw("");
    }

    #[test]
    fn try_from_conversions() {
        assert!(FsPath::try_from("a").is_ok());
        assert!(FsPath::try_from(String::from("a")).is_ok());
        assert!(FsPath::try_from(PathBuf::from("a")).is_ok());
        assert!(FsPath::try_from(OsString::from("a")).is_ok());
        assert!(FsPath::try_from(Path::new("")).is_err());
    }

    #[test]
    fn displays_raw_string() {
        let path = fspath!("dir//file");
        assert_eq!(path.to_string(), "dir//file");
    }

    #[test]
    fn serializes_as_string() {
        let path = fspath!("dir/file");
        assert_eq!(serde_json::to_string(&path).unwrap(), r#""dir/file""#);
    }

    #[cfg(unix)]
    #[test]
    fn keeps_names_that_are_not_utf8() {
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"caf\xe9.txt");
        let path = fspath!("dir").join_str(name);
        assert_eq!(path.name(), name);
        assert_eq!(path.extension(), Some(OsStr::new("txt")));
        assert_eq!(path.to_str(), None);
        assert_eq!(path.to_string_lossy(), "dir/caf\u{fffd}.txt");
        assert_eq!(
            path.change_extension("md").name().as_bytes(),
            b"caf\xe9.md"
        );
    }

    #[test]
    fn joins_another_path() {
        let path = fspath!("dir").join(&fspath!("file.txt"));
        assert_eq!(path.to_string(), sep("dir/file.txt"));
    }

    #[test]
    fn join_does_not_mutate_original() {
        let base = fspath!("dir");
        let _ = base.join_str("child");
        assert_eq!(base.to_string(), "dir");
    }

    #[test]
    fn joins_all_segments() {
        let path = fspath!("a/").join_all(&["/b", "c\\", "d.txt"]);
        assert_eq!(path.to_string(), sep("a/b/c/d.txt"));
    }

    #[test]
    fn cleans() {
        let path = fspath!("a/./b/../c//d");
        assert_eq!(path.clean().to_string(), sep("a/c/d"));
    }

    #[test]
    fn to_absolute_keeps_absolute_paths() {
        let tree = temptree! {
            "test": "",
        };
        let root = tree_root(&tree);
        let abs = root.join_str("test").to_absolute().unwrap();
        assert_eq!(abs.as_path(), tree.path().join("test"));
    }

    #[test]
    fn to_absolute_anchors_relative_paths_on_cwd() {
        let abs = fspath!("some/rel/../path").to_absolute().unwrap();
        let expected = std::env::current_dir().unwrap().join("some").join("path");
        assert_eq!(abs.as_path(), expected);
    }

    #[test]
    fn exists() {
        let tree = temptree! {
            "test": "",
        };
        let root = tree_root(&tree);
        assert!(root.join_str("test").exists());
        assert!(!root.join_str("missing").exists());
    }

    #[test]
    fn is_dir() {
        let tree = temptree! {
            dir: {},
            file: "",
        };
        let root = tree_root(&tree);
        assert!(root.join_str("dir").is_dir());
        assert!(!root.join_str("file").is_dir());
        assert!(!root.join_str("missing").is_dir());
    }

    #[test]
    fn is_file() {
        let tree = temptree! {
            dir: {},
            file: "",
        };
        let root = tree_root(&tree);
        assert!(root.join_str("file").is_file());
        assert!(!root.join_str("dir").is_file());
        assert!(!root.join_str("missing").is_file());
    }

    #[test]
    fn lists_names() {
        let tree = temptree! {
            a: "",
            b: {
                c: "",
            },
        };
        let mut names = tree_root(&tree).list_names();
        names.sort();
        assert_eq!(names, vec![OsString::from("a"), OsString::from("b")]);
    }

    #[test]
    fn lists_joined_paths() {
        let tree = temptree! {
            a: "",
        };
        let root = tree_root(&tree);
        assert_eq!(root.list(), vec![root.join_str("a")]);
    }

    #[test]
    fn listing_a_file_is_empty() {
        let tree = temptree! {
            a: "",
        };
        let file = tree_root(&tree).join_str("a");
        assert!(file.list_names().is_empty());
        assert!(file.list().is_empty());
        assert_eq!(file.entries().count(), 0);
    }

    #[test]
    fn listing_a_missing_dir_is_empty() {
        let tree = temptree! { other: "" };
        let missing = tree_root(&tree).join_str("missing");
        assert!(missing.list_names().is_empty());
    }

    #[test]
    fn iterates_entries_with_metadata() {
        let tree = temptree! {
            "data.bin": "12345",
            sub: {},
        };
        let root = tree_root(&tree);
        let mut entries: Vec<_> = root.entries().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, root.join_str("data.bin"));
        assert_eq!(entries[0].1.len(), 5);
        assert_eq!(entries[1].0, root.join_str("sub"));
        assert!(entries[1].1.is_dir());
    }

    #[test]
    fn volume_name_is_empty_without_prefix() {
        assert_eq!(fspath!("dir/file").volume_name(), "");
    }

    #[cfg(windows)]
    #[test]
    fn volume_name_of_drive() {
        assert_eq!(fspath!(r"C:\dir\file").volume_name(), "C:");
    }

    #[test]
    fn name() {
        assert_eq!(fspath!("dir/file.txt").name(), "file.txt");
        assert_eq!(fspath!("dir/sub/").name(), "sub");
    }

    #[test]
    fn extension() {
        assert_eq!(fspath!("dir/file.tar.gz").extension(), Some(OsStr::new("gz")));
        assert_eq!(fspath!("dir/.bashrc").extension(), Some(OsStr::new("bashrc")));
    }

    #[test]
    fn extension_returns_none_when_no_extension_present() {
        assert_eq!(fspath!("dir.d/file").extension(), None);
        assert_eq!(fspath!("dir/file.").extension(), None);
    }

    #[test]
    fn name_without_extension() {
        assert_eq!(fspath!("dir/file.tar.gz").name_without_extension(), "file.tar");
        assert_eq!(fspath!("dir/file").name_without_extension(), "file");
    }

    #[test]
    fn changes_extension() {
        let path = fspath!("dir/file.md");
        assert_eq!(path.change_extension("html").to_string(), "dir/file.html");
        assert_eq!(path.change_extension(".html").to_string(), "dir/file.html");
        assert_eq!(path.to_string(), "dir/file.md");
    }

    #[test]
    fn change_extension_ignores_dots_in_parent_dirs() {
        let path = fspath!("dir.d/file");
        assert_eq!(path.change_extension("txt"), path);
    }

    #[test]
    fn change_extension_with_empty_extension_is_noop() {
        let path = fspath!("file.md");
        assert_eq!(path.change_extension(""), path);
        assert_eq!(path.change_extension("."), path);
    }

    #[test]
    fn change_extension_on_trailing_dot_is_noop() {
        let path = fspath!("file.");
        assert_eq!(path.change_extension("txt"), path);
    }

    #[test]
    fn size() {
        let tree = temptree! {
            "test": "hello",
        };
        let root = tree_root(&tree);
        assert_eq!(root.join_str("test").size(), Some(5));
        assert_eq!(root.join_str("missing").size(), None);
    }

    #[test]
    fn metadata_is_none_when_missing() {
        let tree = temptree! { other: "" };
        assert!(tree_root(&tree).join_str("missing").metadata().is_none());
    }

    #[test]
    fn removes_file_and_empty_dir() {
        let tree = temptree! {
            file: "",
            dir: {},
        };
        let root = tree_root(&tree);
        let file = root.join_str("file");
        let dir = root.join_str("dir");

        file.remove().expect("should remove a file");
        dir.remove().expect("should remove an empty dir");

        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn remove_fails_when_missing() {
        let tree = temptree! { other: "" };
        let missing = tree_root(&tree).join_str("missing");
        assert!(missing.remove().is_err());
    }
}
