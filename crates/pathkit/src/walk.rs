//! Recursive, policy-driven directory walking.
//!
//! A walk is depth-first and pre-order: an included directory is reported
//! before anything beneath it. Filesystem errors never escape a walk. An
//! unreadable directory lists as empty and an entry that vanishes between
//! listing and inspection is skipped.
//!
//! Entry names are sorted lexically at every level unless [`Walker::sorted`]
//! turns sorting off, in which case the backend's listing order is used.

use derivative::Derivative;
use std::convert::Infallible;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::policy::{AllFiles, FilesMatching, FnPolicy};
use crate::{FsBackend, FsPath, OsFs};
use tracing::{debug, instrument, trace};

/// What to do with a directory found during a walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirDecision {
    /// Recurse into the directory.
    pub descend: bool,
    /// Report the directory itself. Honored whether or not it is descended.
    pub include: bool,
}

impl DirDecision {
    pub const fn new(descend: bool, include: bool) -> Self {
        Self { descend, include }
    }

    pub const fn descend_only() -> Self {
        Self::new(true, false)
    }

    pub const fn descend_and_include() -> Self {
        Self::new(true, true)
    }

    pub const fn include_only() -> Self {
        Self::new(false, true)
    }

    pub const fn prune() -> Self {
        Self::new(false, false)
    }
}

/// Decides which directories are descended and which paths are reported.
///
/// `accept_dir` is called once for every directory below the root (never for
/// the root itself). `accept_file` is called once for every other entry.
pub trait WalkPolicy {
    fn accept_dir(&self, path: &FsPath) -> DirDecision;
    fn accept_file(&self, path: &FsPath) -> bool;
}

impl<T: WalkPolicy + ?Sized> WalkPolicy for &T {
    fn accept_dir(&self, path: &FsPath) -> DirDecision {
        (**self).accept_dir(path)
    }

    fn accept_file(&self, path: &FsPath) -> bool {
        (**self).accept_file(path)
    }
}

/// Walks the directory tree below a root.
///
/// Links to directories are followed. A directory that resolves to one of
/// its own ancestors in the current walk is offered to the policy like any
/// other directory but is never descended, so link cycles end after one
/// step. The check relies on [`FsBackend::canonical`].
///
/// Names are joined with [`FsPath::join_str`], which reads `\` as a
/// separator. On Unix an entry whose name contains a backslash therefore
/// can't be found again after listing and is skipped.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Walker<'a, B = OsFs> {
    root: &'a FsPath,
    #[derivative(Debug = "ignore")]
    backend: B,
    sorted: bool,
}

impl<'a> Walker<'a, OsFs> {
    pub fn new(root: &'a FsPath) -> Self {
        Self::with_backend(root, OsFs)
    }
}

impl<'a, B: FsBackend> Walker<'a, B> {
    pub fn with_backend(root: &'a FsPath, backend: B) -> Self {
        Self {
            root,
            backend,
            sorted: true,
        }
    }

    #[must_use]
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    /// Every accepted path, in walk order.
    #[instrument(skip(self, policy), fields(root = %self.root))]
    pub fn collect<P: WalkPolicy>(&self, policy: &P) -> Vec<FsPath> {
        let mut paths = vec![];
        self.visit(policy, |path| paths.push(path));
        debug!(count = paths.len(), "walk collected paths");
        paths
    }

    /// Calls `visit` with each accepted path, in walk order.
    pub fn visit<P, F>(&self, policy: &P, mut visit: F)
    where
        P: WalkPolicy,
        F: FnMut(FsPath),
    {
        let walked: Result<(), Infallible> = self.try_visit(policy, |path| {
            visit(path);
            Ok(())
        });
        match walked {
            Ok(()) => (),
            Err(never) => match never {},
        }
    }

    /// Like [`visit`](Self::visit), but the first error returned by `visit`
    /// stops the walk and is handed back unchanged.
    #[instrument(skip(self, policy, visit), fields(root = %self.root))]
    pub fn try_visit<P, F, E>(&self, policy: &P, mut visit: F) -> Result<(), E>
    where
        P: WalkPolicy,
        F: FnMut(FsPath) -> Result<(), E>,
    {
        if !self.backend.is_dir(self.root) {
            trace!("root is not a directory, nothing to walk");
            return Ok(());
        }
        let mut ancestors = vec![];
        self.walk_dir(self.root, policy, &mut visit, &mut ancestors)
    }

    /// Names under `dir` in walk order. Unreadable directories are empty.
    fn names(&self, dir: &FsPath) -> Vec<OsString> {
        let mut names = match self.backend.list_names(dir) {
            Ok(names) => names,
            Err(e) => {
                trace!(dir = %dir, error = %e, "unreadable directory treated as empty");
                return vec![];
            }
        };
        if self.sorted {
            names.sort_unstable();
        }
        names
    }

    fn walk_dir<P, F, E>(
        &self,
        dir: &FsPath,
        policy: &P,
        visit: &mut F,
        ancestors: &mut Vec<PathBuf>,
    ) -> Result<(), E>
    where
        P: WalkPolicy,
        F: FnMut(FsPath) -> Result<(), E>,
    {
        let canonical = self.backend.canonical(dir);
        if canonical.as_ref().map_or(false, |c| ancestors.contains(c)) {
            trace!(dir = %dir, "link leads back into the walk, not descending");
            return Ok(());
        }

        let names = self.names(dir);
        let depth = ancestors.len();
        ancestors.extend(canonical);

        for name in names {
            let path = self.backend.join(dir, &name);
            if !self.backend.exists(&path) {
                trace!(path = %path, "entry vanished before it could be inspected");
                continue;
            }

            if self.backend.is_dir(&path) {
                let decision = policy.accept_dir(&path);
                match (decision.descend, decision.include) {
                    (true, true) => {
                        visit(path.clone())?;
                        self.walk_dir(&path, policy, visit, ancestors)?;
                    }
                    (true, false) => self.walk_dir(&path, policy, visit, ancestors)?,
                    (false, true) => visit(path)?,
                    (false, false) => trace!(path = %path, "pruned"),
                }
            } else if policy.accept_file(&path) {
                visit(path)?;
            }
        }

        ancestors.truncate(depth);
        Ok(())
    }
}

/// Shortcuts over [`Walker`] using the real filesystem and sorted listings.
impl FsPath {
    /// Every file below this directory. Directories are descended but not
    /// reported.
    pub fn walk_all(&self) -> Vec<FsPath> {
        Walker::new(self).collect(&AllFiles)
    }

    /// Files below this directory accepted by `accept_file`.
    pub fn walk_matching<F>(&self, accept_file: F) -> Vec<FsPath>
    where
        F: Fn(&FsPath) -> bool,
    {
        Walker::new(self).collect(&FilesMatching(accept_file))
    }

    pub fn walk_with<D, F>(&self, accept_dir: D, accept_file: F) -> Vec<FsPath>
    where
        D: Fn(&FsPath) -> DirDecision,
        F: Fn(&FsPath) -> bool,
    {
        Walker::new(self).collect(&FnPolicy::new(accept_dir, accept_file))
    }

    pub fn visit_all<V>(&self, visit: V)
    where
        V: FnMut(FsPath),
    {
        Walker::new(self).visit(&AllFiles, visit);
    }

    pub fn visit_matching<F, V>(&self, accept_file: F, visit: V)
    where
        F: Fn(&FsPath) -> bool,
        V: FnMut(FsPath),
    {
        Walker::new(self).visit(&FilesMatching(accept_file), visit);
    }

    pub fn visit_with<D, F, V>(&self, accept_dir: D, accept_file: F, visit: V)
    where
        D: Fn(&FsPath) -> DirDecision,
        F: Fn(&FsPath) -> bool,
        V: FnMut(FsPath),
    {
        Walker::new(self).visit(&FnPolicy::new(accept_dir, accept_file), visit);
    }
}
