//! core
//!
//! Domain types, configuration, and the worktree lock.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, CommitId, FileChangeSet, etc.
//! - [`config`] - Configuration schema and loading
//! - [`lock`] - Exclusive lock serializing working-tree access

pub mod config;
pub mod lock;
pub mod types;
