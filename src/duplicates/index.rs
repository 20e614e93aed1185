//! Index-building stage: walk the root and fingerprint every regular file.
//!
//! # Overview
//!
//! [`BuildIndex`] runs in two phases:
//!
//! 1. **Walking**: the root is traversed and every regular file collected in
//!    discovery order. The first traversal error ends the stage.
//! 2. **Hashing**: each file is fingerprinted and its path appended to the
//!    index entry for that fingerprint.
//!
//! With `io_threads > 1` the hashing phase runs on a dedicated rayon pool.
//! Results are folded back in discovery order, so the index is identical to
//! a sequential run.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::pipeline::{FingerprintIndex, PipelineState, Stage, StageError, StateField};
use crate::progress::ProgressCallback;
use crate::scanner::{FileEntry, Fingerprint, HashError, Hasher, ScanError, Walker, WalkerConfig};

/// Counters collected while building an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Regular files hashed
    pub files: usize,
    /// Total bytes across those files
    pub bytes: u64,
    /// Distinct fingerprints in the index
    pub fingerprints: usize,
}

/// Stage that replaces `fingerprintIndex` with a fresh index of the root.
///
/// # Example
///
/// ```no_run
/// use stagedupe::duplicates::BuildIndex;
/// use stagedupe::scanner::WalkerConfig;
/// use std::path::Path;
///
/// let stage = BuildIndex::default()
///     .with_walker_config(WalkerConfig::new(false, Vec::new()))
///     .with_io_threads(4);
/// let (index, stats) = stage.build_index(Path::new("/data")).unwrap();
/// println!("{} files, {} fingerprints", stats.files, index.len());
/// ```
#[derive(Clone, Default)]
pub struct BuildIndex {
    walker_config: WalkerConfig,
    hasher: Hasher,
    io_threads: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for BuildIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildIndex")
            .field("walker_config", &self.walker_config)
            .field("hasher", &self.hasher)
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BuildIndex {
    /// Set traversal options.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Use a specific hasher (e.g. a smaller chunk size).
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Hash on `threads` workers; 0 or 1 hashes sequentially.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    /// Abort with [`ScanError::Interrupted`] once `flag` is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report walking and hashing progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk `root` and fingerprint every regular file under it.
    ///
    /// # Errors
    ///
    /// The first [`ScanError`] from the walk or the first [`HashError`] in
    /// discovery order. Nothing is returned for a partial scan.
    pub fn build_index(&self, root: &Path) -> Result<(FingerprintIndex, IndexStats), StageError> {
        let files = self.collect_files(root)?;
        let hashed = self.hash_files(&files)?;

        let mut index = FingerprintIndex::new();
        let mut stats = IndexStats::default();
        for (file, fingerprint) in files.iter().zip(hashed) {
            stats.files += 1;
            stats.bytes += file.size;
            index
                .entry(fingerprint)
                .or_default()
                .push(file.path.to_string_lossy().into_owned());
        }
        stats.fingerprints = index.len();

        log::info!(
            "Indexed {} files ({} bytes) into {} fingerprints",
            stats.files,
            stats.bytes,
            stats.fingerprints
        );
        Ok((index, stats))
    }

    fn collect_files(&self, root: &Path) -> Result<Vec<FileEntry>, ScanError> {
        let mut walker = Walker::new(root, self.walker_config.clone());
        if let Some(flag) = &self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        walker.validate_root()?;

        if let Some(cb) = &self.progress {
            cb.on_phase_start("walking", 0);
        }

        let mut files = Vec::new();
        for entry in walker.walk() {
            let entry = entry?;
            if let Some(cb) = &self.progress {
                cb.on_progress(files.len() + 1, entry.path.to_string_lossy().as_ref());
            }
            files.push(entry);
        }

        if let Some(cb) = &self.progress {
            cb.on_phase_end("walking");
        }
        log::debug!("Walk of {} found {} files", root.display(), files.len());
        Ok(files)
    }

    fn hash_files(&self, files: &[FileEntry]) -> Result<Vec<Fingerprint>, StageError> {
        if let Some(cb) = &self.progress {
            cb.on_phase_start("hashing", files.len());
        }

        let result = if self.io_threads > 1 {
            self.hash_parallel(files)
        } else {
            self.hash_sequential(files)
        };

        if let Some(cb) = &self.progress {
            cb.on_phase_end("hashing");
        }
        result
    }

    fn hash_sequential(&self, files: &[FileEntry]) -> Result<Vec<Fingerprint>, StageError> {
        let hashed = AtomicUsize::new(0);
        files
            .iter()
            .map(|file| self.hash_one(file, &hashed))
            .collect()
    }

    fn hash_parallel(&self, files: &[FileEntry]) -> Result<Vec<Fingerprint>, StageError> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.io_threads)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                log::warn!("Failed to create hashing thread pool, hashing sequentially: {}", e);
                return self.hash_sequential(files);
            }
        };

        log::debug!("Hashing {} files on {} threads", files.len(), self.io_threads);

        let hashed = AtomicUsize::new(0);
        let first_failure = AtomicUsize::new(usize::MAX);
        let results: Vec<Option<Result<Fingerprint, StageError>>> = pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .map(|(idx, file)| self.hash_unless_failed(idx, file, &hashed, &first_failure))
                .collect()
        });

        // Only files after a failure are skipped, so the earliest failure in
        // discovery order is always present and wins
        results.into_iter().flatten().collect()
    }

    /// Hash `file` unless a file earlier in discovery order already failed.
    fn hash_unless_failed(
        &self,
        idx: usize,
        file: &FileEntry,
        hashed: &AtomicUsize,
        first_failure: &AtomicUsize,
    ) -> Option<Result<Fingerprint, StageError>> {
        if idx > first_failure.load(Ordering::SeqCst) {
            return None;
        }

        let result = self.hash_one(file, hashed);
        if result.is_err() {
            first_failure.fetch_min(idx, Ordering::SeqCst);
        }
        Some(result)
    }

    fn hash_one(&self, file: &FileEntry, hashed: &AtomicUsize) -> Result<Fingerprint, StageError> {
        if self.is_shutdown_requested() {
            return Err(ScanError::Interrupted.into());
        }

        let position = hashed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(cb) = &self.progress {
            cb.on_progress(position, file.path.to_string_lossy().as_ref());
        }

        let fingerprint = self.hasher.full_hash(&file.path).map_err(|e: HashError| {
            log::debug!("Hashing failed for {}: {}", e.path().display(), e);
            e
        })?;
        log::trace!("{} {}", fingerprint, file.path.display());

        if let Some(cb) = &self.progress {
            cb.on_item_completed(file.size);
        }
        Ok(fingerprint)
    }
}

impl Stage for BuildIndex {
    fn name(&self) -> &'static str {
        "build_index"
    }

    fn required_inputs(&self) -> &'static [StateField] {
        &[StateField::RootPath]
    }

    fn execute(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let root = state
            .key()
            .ok_or(StageError::MissingInput(StateField::RootPath))?;
        let (index, _) = self.build_index(Path::new(root))?;
        state.fingerprint_index = Some(index);
        Ok(())
    }
}
