//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads and
//! writes flow through this interface, and no other module imports `git2`.
//! We use the `git2` crate exclusively (no shelling out to the git CLI).
//!
//! # Responsibilities
//!
//! - Repository opening
//! - Branch listing and checkout
//! - Working-tree status (changed, untracked, tracked files)
//! - Staging and committing
//! - Commit history
//! - Local config (user identity)
//! - Remote configuration and push
//!
//! # Invariants
//!
//! - Nothing is cached; every call reads the repository on disk
//! - All operations return strong types (`BranchName`, `CommitId`, ...)
//! - Errors are normalized into [`GitError`]

mod interface;

pub use interface::{Git, GitError, Head, RepoInfo};
