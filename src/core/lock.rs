//! core::lock
//!
//! Exclusive working-tree lock for a repository.
//!
//! # Architecture
//!
//! A repository has exactly one working tree, and reads such as "list the
//! files of branch X" are implemented as checkout-then-read. Two requests
//! for different branches must therefore never interleave. The
//! `WorktreeLock` is the single mutual-exclusion scope around every
//! checkout+read, stage+commit, and push.
//!
//! The lock is an OS-level exclusive lock (`fs2`) on
//! `<git_dir>/gitbridge/worktree.lock`. These locks conflict between
//! distinct open file handles, so they serialize threads of this process as
//! well as other gitbridge processes serving the same repository.
//!
//! # Invariants
//!
//! - Lock must be held for the whole checkout+read (or stage+commit) scope
//! - Lock is released on drop (RAII)
//! - [`WorktreeLock::acquire`] blocks; [`WorktreeLock::try_acquire`] does not
//!
//! # Example
//!
//! ```ignore
//! use gitbridge::core::lock::WorktreeLock;
//!
//! let lock = WorktreeLock::acquire(git.git_dir())?;
//! // checkout + read
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Directory under the git dir that holds gitbridge's state.
const STATE_DIR: &str = "gitbridge";

/// Lock file name inside [`STATE_DIR`].
const LOCK_FILE: &str = "worktree.lock";

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),

    /// I/O error during lock operations.
    #[error("lock i/o error: {0}")]
    IoError(#[from] std::io::Error),
}

/// An exclusive lock on a repository's working tree.
///
/// Released when dropped, even if the guarded operation panics.
#[derive(Debug)]
pub struct WorktreeLock {
    path: PathBuf,
    /// Some while the lock is held.
    file: Option<File>,
}

impl WorktreeLock {
    /// Path of the lock file for a repository whose `.git` dir is `git_dir`.
    pub fn lock_path(git_dir: &Path) -> PathBuf {
        git_dir.join(STATE_DIR).join(LOCK_FILE)
    }

    /// Acquire the lock, waiting until any other holder releases it.
    ///
    /// # Errors
    ///
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock call fails
    pub fn acquire(git_dir: &Path) -> Result<Self, LockError> {
        let (path, file) = Self::open(git_dir)?;
        file.lock_exclusive()
            .map_err(|e| LockError::AcquireFailed(e.to_string()))?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Try to acquire the lock without waiting.
    ///
    /// Returns `Ok(None)` if someone else holds it.
    pub fn try_acquire(git_dir: &Path) -> Result<Option<Self>, LockError> {
        let (path, file) = Self::open(git_dir)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                path,
                file: Some(file),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    fn open(git_dir: &Path) -> Result<(PathBuf, File), LockError> {
        let dir = git_dir.join(STATE_DIR);
        fs::create_dir_all(&dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        Ok((path, file))
    }

    /// Whether this guard still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    ///
    /// Calling this more than once is a no-op.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for WorktreeLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
