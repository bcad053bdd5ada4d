//! session
//!
//! The process-wide repository session.
//!
//! # Architecture
//!
//! A [`RepositorySession`] owns the one piece of mutable state the service
//! has, the configured repository path, and exposes every repository
//! operation the HTTP layer offers. Each operation:
//!
//! 1. checks its inputs and the session preconditions,
//! 2. opens the repository fresh through [`Git`],
//! 3. takes the [`WorktreeLock`] if it touches the working tree,
//! 4. classifies any failure into a [`SessionError`].
//!
//! # State
//!
//! ```text
//! Unset --set_repository_path--> Set --set_repository_path--> Set
//! ```
//!
//! Every operation except [`RepositorySession::set_repository_path`],
//! [`RepositorySession::push`] (which names its repository explicitly) and
//! [`RepositorySession::status`] fails with [`SessionError::NotConfigured`]
//! while the state is `Unset`.
//!
//! # Checkout as a side effect
//!
//! Listing files, changes, or history of a branch checks that branch out
//! and leaves it checked out, so a following commit lands on the branch the
//! client last looked at. The checkout and the read happen inside one
//! [`WorktreeLock`] scope, so concurrent requests for different branches
//! never observe each other's working tree.

mod error;

pub use error::SessionError;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::config::{ConfigError, Settings};
use crate::core::lock::WorktreeLock;
use crate::core::types::{
    BranchName, CommitId, CommitMetadata, CommitRecord, FileChangeSet, RemoteAction,
    RemoteConfig, UserIdentity,
};
use crate::git::{Git, GitError};

/// The settings a session needs, validated.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Branch used when a request omits one
    pub default_branch: BranchName,
    /// History length when a request omits a limit
    pub history_limit: usize,
    /// Message for commits submitted without one
    pub commit_message: String,
    /// Host credential remotes point at
    pub remote_host: String,
}

impl SessionSettings {
    /// Extract the session settings from a loaded configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let default_branch = BranchName::new(settings.repository.default_branch.as_str())
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        Ok(Self {
            default_branch,
            history_limit: settings.repository.history_limit,
            commit_message: settings.repository.commit_message.clone(),
            remote_host: settings.remote.host.clone(),
        })
    }
}

/// Snapshot of the session for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub repo_path: Option<PathBuf>,
    pub current_branch: Option<BranchName>,
}

/// The repository session shared by all requests.
///
/// All methods take `&self`; share the session with `Arc`.
#[derive(Debug)]
pub struct RepositorySession {
    repo_path: RwLock<Option<PathBuf>>,
    settings: SessionSettings,
}

impl RepositorySession {
    /// Create a session with no repository configured.
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            repo_path: RwLock::new(None),
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// The configured repository path, if any.
    pub fn repo_path(&self) -> Option<PathBuf> {
        self.repo_path.read().clone()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Point the session at the repository in `path`.
    ///
    /// Only checks that the path exists; whether it is a repository is
    /// discovered by the first operation that opens it. On failure the
    /// previous path is kept.
    pub fn set_repository_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() || !path.exists() {
            return Err(SessionError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let path = path.to_path_buf();
        let previous = self.repo_path.write().replace(path.clone());
        info!(path = %path.display(), previous = ?previous, "repository path set");
        Ok(path)
    }

    /// Write `user.name` / `user.email` into the repository's local config.
    pub fn set_user_identity(&self, name: &str, email: &str) -> Result<(), SessionError> {
        let name = required("user_name", name)?;
        let email = required("user_email", email)?;

        let git = self.open()?;
        git.set_user_identity(&UserIdentity {
            name: name.to_string(),
            email: email.to_string(),
        })?;

        info!(%name, %email, "git user identity configured");
        Ok(())
    }

    /// The identity commits will be recorded with, if configured.
    pub fn user_identity(&self) -> Result<Option<UserIdentity>, SessionError> {
        Ok(self.open()?.user_identity()?)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All local branches, read fresh from disk.
    ///
    /// Does not check anything out, so it runs without the worktree lock.
    pub fn list_branches(&self) -> Result<Vec<BranchName>, SessionError> {
        Ok(self.open()?.list_branches()?)
    }

    /// Check out `branch` and list every file tracked on it.
    pub fn list_all_files(&self, branch: &BranchName) -> Result<Vec<PathBuf>, SessionError> {
        self.with_branch_checked_out(branch, Git::tree_paths)
    }

    /// Check out `branch` and list its changed and untracked files.
    pub fn list_changed_files(&self, branch: &BranchName) -> Result<FileChangeSet, SessionError> {
        self.with_branch_checked_out(branch, Git::change_set)
    }

    /// Check out every branch in turn and collect its change set.
    ///
    /// The whole walk holds the worktree lock. Afterwards HEAD goes back to
    /// where it was before the call, whether or not the walk succeeded: the
    /// same branch, or the same commit if HEAD was detached. If restoring
    /// fails, the branch the walk stopped on stays checked out and a warning
    /// is logged.
    pub fn list_all_branches_files(
        &self,
    ) -> Result<BTreeMap<BranchName, FileChangeSet>, SessionError> {
        let git = self.open()?;
        let _lock = Self::lock(&git)?;

        let original = git.head()?;
        let result = collect_change_sets(&git);

        if let Some(original) = original {
            if let Err(e) = git.restore_head(&original) {
                warn!(head = ?original, error = %e, "failed to restore HEAD");
            }
        }

        Ok(result?)
    }

    /// Check out `branch` and return up to `limit` newest commits.
    ///
    /// `None` uses the configured history limit.
    pub fn list_commit_history(
        &self,
        branch: &BranchName,
        limit: Option<usize>,
    ) -> Result<Vec<CommitRecord>, SessionError> {
        let limit = limit.unwrap_or(self.settings.history_limit);
        self.with_branch_checked_out(branch, |git| git.log(branch, limit))
    }

    /// Report the configured path and the branch checked out there.
    pub fn status(&self) -> SessionStatus {
        let repo_path = self.repo_path();
        let current_branch = repo_path
            .as_deref()
            .and_then(|path| Git::open(path).ok())
            .and_then(|git| git.current_branch().ok().flatten());

        SessionStatus {
            repo_path,
            current_branch,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Stage everything and commit it on the checked-out branch.
    ///
    /// An empty `message` is replaced by the configured default. `metadata`
    /// is logged and otherwise ignored.
    pub fn commit(
        &self,
        message: &str,
        metadata: &CommitMetadata,
    ) -> Result<CommitId, SessionError> {
        let message = if message.trim().is_empty() {
            self.settings.commit_message.as_str()
        } else {
            message
        };

        let git = self.open()?;
        let _lock = Self::lock(&git)?;

        git.stage_all().map_err(SessionError::commit)?;
        let id = git.commit(message).map_err(SessionError::commit)?;

        info!(
            commit = %id.short(7),
            %message,
            git_type = metadata.git_type.as_deref().unwrap_or("Unknown"),
            time = metadata.time.as_deref().unwrap_or(""),
            todo_title = metadata.todo_title.as_deref().unwrap_or(""),
            "commit created"
        );
        Ok(id)
    }

    /// Create or update the `origin` remote with credentials embedded.
    pub fn set_remote(
        &self,
        username: &str,
        repository: &str,
        token: &str,
    ) -> Result<(RemoteConfig, RemoteAction), SessionError> {
        let username = required("username", username)?;
        let repository = required("repo", repository)?;
        let token = required("token", token)?;

        let path = self.configured_path()?;
        if !path.exists() {
            return Err(SessionError::InvalidPath { path });
        }
        let git = Self::open_at(&path)?;

        let remote =
            RemoteConfig::with_credentials(&self.settings.remote_host, username, repository, token)
                .map_err(|e| SessionError::RemoteOpFailed(e.to_string()))?;
        let action = git
            .upsert_remote(remote.name(), remote.url())
            .map_err(SessionError::remote)?;

        info!(remote = %remote, %action, "remote configured");
        Ok((remote, action))
    }

    /// Push `branch` of the repository at `repo_path` to `origin`.
    ///
    /// `repo_path` is independent of the session's configured path. `None`
    /// pushes the configured default branch.
    pub fn push(&self, repo_path: &Path, branch: Option<&BranchName>) -> Result<(), SessionError> {
        if repo_path.as_os_str().is_empty() || !repo_path.exists() {
            return Err(SessionError::InvalidPath {
                path: repo_path.to_path_buf(),
            });
        }
        let branch = branch.unwrap_or(&self.settings.default_branch);

        let git = Self::open_at(repo_path)?;
        let _lock = Self::lock(&git)?;

        let url = git.remote_url(RemoteConfig::ORIGIN)?.unwrap_or_default();
        debug!(
            remote = %crate::core::types::redact_url(&url),
            %branch,
            "pushing"
        );
        git.push(RemoteConfig::ORIGIN, branch)?;

        info!(path = %repo_path.display(), %branch, "pushed to origin");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn configured_path(&self) -> Result<PathBuf, SessionError> {
        self.repo_path().ok_or(SessionError::NotConfigured)
    }

    /// Open the configured repository.
    fn open(&self) -> Result<Git, SessionError> {
        Self::open_at(&self.configured_path()?)
    }

    fn open_at(path: &Path) -> Result<Git, SessionError> {
        Git::open(path).map_err(|e| SessionError::RepoOpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn lock(git: &Git) -> Result<WorktreeLock, SessionError> {
        debug!(git_dir = %git.git_dir().display(), "acquiring worktree lock");
        Ok(WorktreeLock::acquire(git.git_dir())?)
    }

    /// Run `read` with `branch` checked out, inside one worktree-lock scope.
    ///
    /// A missing branch fails before anything is checked out.
    fn with_branch_checked_out<T>(
        &self,
        branch: &BranchName,
        read: impl FnOnce(&Git) -> Result<T, GitError>,
    ) -> Result<T, SessionError> {
        let git = self.open()?;
        let _lock = Self::lock(&git)?;

        if !git.branch_exists(branch) {
            return Err(SessionError::BranchNotFound {
                branch: branch.to_string(),
            });
        }

        debug!(%branch, "checking out");
        git.checkout(branch)?;
        Ok(read(&git)?)
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, SessionError> {
    let value = value.trim();
    if value.is_empty() {
        Err(SessionError::MissingField { field })
    } else {
        Ok(value)
    }
}

fn collect_change_sets(git: &Git) -> Result<BTreeMap<BranchName, FileChangeSet>, GitError> {
    let mut sets = BTreeMap::new();
    for branch in git.list_branches()? {
        debug!(%branch, "checking out");
        git.checkout(&branch)?;
        let changes = git.change_set()?;
        sets.insert(branch, changes);
    }
    Ok(sets)
}
