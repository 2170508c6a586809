#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod backend;
pub mod fspath;
pub mod join;
pub mod policy;
pub mod walk;

pub use backend::{FsBackend, OsFs};
pub use fspath::{Entries, FsPath};
pub use join::{join_paths, SEPARATOR};
pub use policy::{AllFiles, FilesMatching, FnPolicy, GlobPolicy};
pub use walk::{DirDecision, WalkPolicy, Walker};

pub type Result<T> = eyre::Result<T>;

pub(in crate) mod helper {
    macro_rules! impl_try_from {
        ($src:ident => $target:ident) => {
            impl TryFrom<$src> for $target {
                type Error = eyre::Report;
                fn try_from(path: $src) -> Result<Self> {
                    Self::new(path)
                }
            }
        };
        (&$src:ident => $target:ident) => {
            impl TryFrom<&$src> for $target {
                type Error = eyre::Report;
                fn try_from(path: &$src) -> Result<Self> {
                    Self::new(path)
                }
            }
        };
    }
    pub(in crate) use impl_try_from;
}

#[cfg(test)]
pub(in crate) mod test {

    #![allow(warnings, unused)]

    use crate::FsPath;
    use tempfile::TempDir;

    macro_rules! fspath {
        ($path:literal) => {{
            crate::FsPath::new($path).unwrap()
        }};
        ($path:expr) => {{
            crate::FsPath::new($path).unwrap()
        }};
    }

    pub(in crate) use fspath;

    pub fn tree_root(tree: &TempDir) -> FsPath {
        FsPath::new(tree.path()).unwrap()
    }

    /// Strips the temp dir prefix so assertions can use short `/` separated names.
    pub fn relative_names(tree: &TempDir, paths: &[FsPath]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                p.as_path()
                    .strip_prefix(tree.path())
                    .expect("walk results should live under the tree root")
                    .display()
                    .to_string()
                    .replace(std::path::MAIN_SEPARATOR, "/")
            })
            .collect()
    }
}
