//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory tree
//! and yielding every regular file beneath it. Children are visited in file
//! name order so repeated walks over an unchanged tree discover files in the
//! same sequence.
//!
//! # Features
//!
//! - Deterministic, single-threaded traversal
//! - Symbolic links skipped unless explicitly followed
//! - Exact-path exclusions (e.g. a checkpoint file inside the root)
//! - Graceful shutdown via atomic flag
//!
//! Unlike a best-effort scanner, errors are yielded and the caller is expected
//! to stop at the first one.
//!
//! # Example
//!
//! ```no_run
//! use stagedupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => {
//!             eprintln!("Error: {}", e);
//!             break;
//!         }
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{FileEntry, ScanError, WalkerConfig};

/// Directory walker for regular-file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Excluded paths, canonicalized where possible
    excluded: Vec<PathBuf>,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to scan
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        let excluded = config
            .excluded_paths
            .iter()
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
            .collect();

        Self {
            root: path.to_path_buf(),
            config,
            excluded,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// Once the flag is raised the walk yields [`ScanError::Interrupted`].
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// [`ScanError::NotFound`], [`ScanError::NotADirectory`], or the I/O error
    /// raised while reading the root's metadata.
    pub fn validate_root(&self) -> Result<(), ScanError> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::NotADirectory(self.root.clone())),
            Err(e) => Err(classify_io_error(&self.root, e)),
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        if self.excluded.iter().any(|ex| ex == path) {
            return true;
        }
        // Relative roots yield relative paths
        path.canonicalize()
            .is_ok_and(|canonical| self.excluded.contains(&canonical))
    }

    /// Walk the directory tree, yielding regular files in discovery order.
    ///
    /// Directories are descended into but never yielded. Errors are yielded
    /// as [`ScanError`] values; iteration may continue past them, so callers
    /// wanting all-or-nothing semantics must stop at the first `Err`.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return Some(Err(ScanError::Interrupted));
            }

            match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();

                    if file_type.is_dir() {
                        return None;
                    }

                    // Only reported for links that are not being followed
                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", entry.path().display());
                        return None;
                    }

                    if !file_type.is_file() {
                        log::trace!("Skipping special file: {}", entry.path().display());
                        return None;
                    }

                    if self.is_excluded(entry.path()) {
                        log::debug!("Excluded from scan: {}", entry.path().display());
                        return None;
                    }

                    let size = match entry.metadata() {
                        Ok(meta) => meta.len(),
                        Err(e) => return Some(Err(self.handle_walkdir_error(e))),
                    };

                    Some(Ok(FileEntry::new(entry.into_path(), size)))
                }
                Err(e) => Some(Err(self.handle_walkdir_error(e))),
            }
        })
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn handle_walkdir_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if error.loop_ancestor().is_some() {
            log::warn!("Symbolic link loop at {}", path.display());
            return ScanError::SymlinkLoop(path);
        }

        log::warn!("Walker error for {}: {}", path.display(), error);
        match error.into_io_error() {
            Some(io_err) => classify_io_error(&path, io_err),
            None => ScanError::Io {
                path,
                source: std::io::Error::other("directory walk failed"),
            },
        }
    }
}

fn classify_io_error(path: &Path, error: std::io::Error) -> ScanError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::PermissionDenied => ScanError::PermissionDenied(path.to_path_buf()),
        ErrorKind::NotFound => ScanError::NotFound(path.to_path_buf()),
        _ => ScanError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
