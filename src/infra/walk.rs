//! Filepath: src/infra/walk.rs
//! Gitignore-aware discovery of Python sources.
//! - Respects .gitignore, .git/info/exclude, and global gitignore
//!   unless told otherwise
//! - Extra ignore globs (early prune + late filter)
//! - Excluded directory prefixes, compared after canonicalisation
//! - Deterministic ordering for stable output
//!
//! Backed by ripgrep's `ignore` crate and `globset`.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};
use tracing::{debug, warn};

/// Extension of files picked up from directories.
const PYTHON_EXT: &str = "py";

/// Gitignore-aware walker with optional extra ignore globs.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out files that still slipped through.
pub struct FileWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Honour .gitignore and friends; default true
    respect_gitignore: bool,

    /// Include hidden (dot) files; default true
    include_hidden: bool,

    /// Canonical directory prefixes to skip
    excludes: Vec<PathBuf>,
}

impl FileWalker
{
    /// Build a walker with additional ignore patterns (e.g.
    /// "**/__pycache__", "**/build/**"). Patterns match on relative paths.
    pub fn new(additional_ignores: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_patterns: builder.build()?,
            respect_gitignore: true,
            include_hidden: true,
            excludes: Vec::new(),
        })
    }

    /// (Optional) Honour or disregard ignore files.
    pub fn with_gitignore(
        mut self,
        respect: bool,
    ) -> Self
    {
        self.respect_gitignore = respect;
        self
    }

    /// (Optional) Include or exclude hidden files (dotfiles).
    pub fn with_include_hidden(
        mut self,
        include_hidden: bool,
    ) -> Self
    {
        self.include_hidden = include_hidden;
        self
    }

    /// (Optional) Skip everything beneath these directories.
    /// Directories that do not exist are ignored.
    pub fn with_excludes<P: AsRef<Path>>(
        mut self,
        dirs: &[P],
    ) -> Self
    {
        self.excludes = dirs
            .iter()
            .filter_map(|d| {
                dunce::canonicalize(d.as_ref())
                    .inspect_err(|e| debug!(dir = %d.as_ref().display(), error = %e, "exclude skipped"))
                    .ok()
            })
            .collect();
        self
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // WalkBuilder::hidden(true) skips dotfiles
        b.hidden(!self.include_hidden);

        b.ignore(self.respect_gitignore);
        b.git_ignore(self.respect_gitignore);
        b.git_global(self.respect_gitignore);
        b.git_exclude(self.respect_gitignore);
        b.parents(self.respect_gitignore);

        // Early directory pruning using extra ignores and excludes.
        let extra = self
            .ignore_patterns
            .clone();
        let excludes = self
            .excludes
            .clone();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .is_some_and(|ft| ft.is_dir());
            if !is_dir
            {
                return true;
            }
            if extra.is_match(ent.path())
            {
                return false;
            }
            !is_excluded(&excludes, ent.path())
        });

        b
    }

    /// Python files under `root`, respecting ignore rules, extra
    /// globs and excludes. Sorted for determinism.
    pub fn python_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<PathBuf>
    {
        let root_path = root.as_ref();
        let walker = self
            .build_walk(root_path)
            .build();

        let mut out: Vec<PathBuf> = walker
            .filter_map(|res| {
                res.inspect_err(|e| warn!(error = %e, "skipping unreadable entry"))
                    .ok()
            })
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .map(|entry| entry.into_path())
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext == PYTHON_EXT)
            })
            // Late file-level extra ignore filtering using RELATIVE path
            .filter(|abs| {
                let rel = abs
                    .strip_prefix(root_path)
                    .unwrap_or(abs);
                !self
                    .ignore_patterns
                    .is_match(rel)
            })
            .filter(|p| !is_excluded(&self.excludes, p))
            .collect();

        out.sort();

        out
    }

    /// Explicit files first, in the order given, then the Python
    /// files of each directory. A file reached through several
    /// spellings (`a.py`, `./a.py`) is listed once.
    pub fn collect<F, D>(
        &self,
        files: &[F],
        dirs: &[D],
    ) -> Vec<PathBuf>
    where
        F: AsRef<Path>,
        D: AsRef<Path>,
    {
        let mut seen = HashSet::new();

        files
            .iter()
            .map(|f| {
                f.as_ref()
                    .to_path_buf()
            })
            .chain(
                dirs.iter()
                    .flat_map(|d| self.python_files(d)),
            )
            .filter(|p| {
                let key = dunce::canonicalize(p).unwrap_or_else(|_| p.clone());
                seen.insert(key)
            })
            .collect()
    }
}

/// True when `path` lies beneath one of the canonical `excludes`.
fn is_excluded(
    excludes: &[PathBuf],
    path: &Path,
) -> bool
{
    if excludes.is_empty()
    {
        return false;
    }
    let Ok(resolved) = dunce::canonicalize(path)
    else
    {
        return false;
    };
    excludes
        .iter()
        .any(|ex| resolved.starts_with(ex))
}
