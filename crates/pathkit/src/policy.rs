//! Ready-made [`WalkPolicy`] implementations.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

use crate::{DirDecision, FsPath, Result, WalkPolicy};
use eyre::WrapErr;
use tracing::instrument;

/// Descends into every directory, never reports directories, reports every
/// file.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllFiles;

impl WalkPolicy for AllFiles {
    fn accept_dir(&self, _: &FsPath) -> DirDecision {
        DirDecision::descend_only()
    }

    fn accept_file(&self, _: &FsPath) -> bool {
        true
    }
}

/// Descends into every directory and reports the files accepted by the
/// wrapped predicate.
#[derive(Debug, Clone, Copy)]
pub struct FilesMatching<F>(pub F);

impl<F> WalkPolicy for FilesMatching<F>
where
    F: Fn(&FsPath) -> bool,
{
    fn accept_dir(&self, _: &FsPath) -> DirDecision {
        DirDecision::descend_only()
    }

    fn accept_file(&self, path: &FsPath) -> bool {
        (self.0)(path)
    }
}

/// A policy made of two independent closures.
#[derive(Debug, Clone, Copy)]
pub struct FnPolicy<D, F> {
    accept_dir: D,
    accept_file: F,
}

impl<D, F> FnPolicy<D, F>
where
    D: Fn(&FsPath) -> DirDecision,
    F: Fn(&FsPath) -> bool,
{
    pub fn new(accept_dir: D, accept_file: F) -> Self {
        Self {
            accept_dir,
            accept_file,
        }
    }
}

impl<D, F> WalkPolicy for FnPolicy<D, F>
where
    D: Fn(&FsPath) -> DirDecision,
    F: Fn(&FsPath) -> bool,
{
    fn accept_dir(&self, path: &FsPath) -> DirDecision {
        (self.accept_dir)(path)
    }

    fn accept_file(&self, path: &FsPath) -> bool {
        (self.accept_file)(path)
    }
}

/// Glob driven policy. Patterns are matched against the path relative to the
/// walk root, and `*` does not cross a separator (use `**` for that).
///
/// * files are reported when they match an include pattern, or always when
///   there are no include patterns
/// * directories matching an exclude pattern are pruned and never reported
/// * other directories are descended, and reported if `include_dirs` is set
#[derive(Debug, Clone)]
pub struct GlobPolicy {
    root: FsPath,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
    include_dirs: bool,
}

impl GlobPolicy {
    pub fn new(root: &FsPath) -> Self {
        Self {
            root: root.clone(),
            include: None,
            exclude: None,
            include_dirs: false,
        }
    }

    pub fn include<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.include = build_set(patterns).wrap_err("Failed to build include patterns")?;
        Ok(self)
    }

    pub fn exclude<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.exclude = build_set(patterns).wrap_err("Failed to build exclude patterns")?;
        Ok(self)
    }

    #[must_use]
    pub fn include_dirs(mut self, include_dirs: bool) -> Self {
        self.include_dirs = include_dirs;
        self
    }

    fn relative<'p>(&self, path: &'p FsPath) -> &'p Path {
        path.as_path()
            .strip_prefix(self.root.as_path())
            .unwrap_or_else(|_| path.as_path())
    }
}

impl WalkPolicy for GlobPolicy {
    fn accept_dir(&self, path: &FsPath) -> DirDecision {
        let excluded = self
            .exclude
            .as_ref()
            .map_or(false, |set| set.is_match(self.relative(path)));
        if excluded {
            DirDecision::prune()
        } else {
            DirDecision::new(true, self.include_dirs)
        }
    }

    fn accept_file(&self, path: &FsPath) -> bool {
        self.include
            .as_ref()
            .map_or(true, |set| set.is_match(self.relative(path)))
    }
}

#[instrument(skip(patterns), ret)]
fn build_set<S: AsRef<str>>(patterns: &[S]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .wrap_err_with(|| format!("Malformed glob pattern '{}'", pattern))?;
        builder.add(glob);
    }
    Ok(Some(builder.build()?))
}
