//! gitbridge - HTTP endpoints over a single local Git repository
//!
//! gitbridge lets a client point the service at a repository on disk, then
//! list branches and files, inspect changes and history, commit, configure a
//! credentialed remote, and push, all through JSON over HTTP.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Flags, configuration, logging setup, server startup
//! - [`server`] - HTTP routing, request validation, response envelopes
//! - [`session`] - The repository session: state, preconditions, locking
//! - [`git`] - Single interface for all Git operations
//! - [`core`] - Domain types, configuration schema, worktree lock
//!
//! # Invariants
//!
//! 1. Only [`git`] talks to the repository
//! 2. Every working-tree mutation holds the worktree lock
//! 3. Every failure reaches the client as a JSON envelope

pub mod cli;
pub mod core;
pub mod git;
pub mod server;
pub mod session;
