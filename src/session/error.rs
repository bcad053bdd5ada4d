//! session::error
//!
//! The closed set of failures a session operation can report.
//!
//! Every session operation returns `Result<_, SessionError>`. The HTTP
//! layer maps each variant to a status code and a JSON envelope; anything
//! the Git layer reports that has no dedicated kind becomes
//! [`SessionError::Internal`].

use std::path::PathBuf;

use thiserror::Error;

use crate::core::lock::LockError;
use crate::git::GitError;

/// Errors from repository session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No repository path has been set yet.
    #[error("repository path is not configured; call /set-repo-path first")]
    NotConfigured,

    /// Path is empty or does not exist.
    #[error("invalid path: '{}' does not exist", path.display())]
    InvalidPath {
        /// The rejected path
        path: PathBuf,
    },

    /// Path exists but cannot be opened as a Git repository.
    #[error("cannot open repository at '{}': {reason}", path.display())]
    RepoOpenFailed {
        /// The path that was opened
        path: PathBuf,
        /// Why opening failed
        reason: String,
    },

    /// Requested local branch does not exist.
    #[error("branch {branch} not found")]
    BranchNotFound {
        /// The requested branch
        branch: String,
    },

    /// A required input was empty.
    #[error("{field} is missing")]
    MissingField {
        /// Wire name of the missing field
        field: &'static str,
    },

    /// Staging or committing failed (including "nothing to commit").
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// Push transport failed or the remote refused the update.
    #[error("push failed: {summary}")]
    PushFailed {
        /// What the transport or remote reported
        summary: String,
    },

    /// Creating, updating, or finding a remote failed.
    #[error("remote operation failed: {0}")]
    RemoteOpFailed(String),

    /// Any failure without a dedicated kind.
    #[error("internal error: {detail}")]
    Internal {
        /// Description of the failure
        detail: String,
    },
}

impl SessionError {
    /// Shorthand for [`SessionError::Internal`].
    pub fn internal(detail: impl Into<String>) -> Self {
        SessionError::Internal {
            detail: detail.into(),
        }
    }

    /// Classify a Git failure that happened while committing.
    pub(crate) fn commit(err: GitError) -> Self {
        match err {
            GitError::BranchNotFound { .. } => err.into(),
            other => SessionError::CommitFailed(other.to_string()),
        }
    }

    /// Classify a Git failure that happened while configuring a remote.
    pub(crate) fn remote(err: GitError) -> Self {
        SessionError::RemoteOpFailed(err.to_string())
    }
}

impl From<GitError> for SessionError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::BranchNotFound { branch } => SessionError::BranchNotFound { branch },
            GitError::NotARepo { path } => SessionError::RepoOpenFailed {
                path,
                reason: "not a git repository".to_string(),
            },
            GitError::PushRejected { summary } => SessionError::PushFailed { summary },
            GitError::RemoteNotFound { name } => {
                SessionError::RemoteOpFailed(format!("remote '{}' is not configured", name))
            }
            GitError::NothingToCommit | GitError::IdentityMissing { .. } => {
                SessionError::CommitFailed(err.to_string())
            }
            other => SessionError::internal(other.to_string()),
        }
    }
}

impl From<LockError> for SessionError {
    fn from(err: LockError) -> Self {
        SessionError::internal(err.to_string())
    }
}
