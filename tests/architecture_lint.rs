//! Architecture enforcement tests.
//!
//! The layering described in `src/lib.rs` is checked against the source
//! tree so violations are caught in CI:
//!
//! 1. **Git doorway** - only `src/git/` may name `git2`
//! 2. **Thin server** - `src/server/` reaches Git only through the session

use std::fs;
use std::path::{Path, PathBuf};

/// Every `.rs` file under `dir`, recursively.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).expect("Failed to read source directory") {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
            files.push(path);
        }
    }
    files
}

#[test]
fn only_git_module_uses_git2() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src")) {
        if path.starts_with("src/git") {
            continue;
        }
        let content = fs::read_to_string(&path).unwrap();
        if content.contains("git2::") {
            violations.push(path.display().to_string());
        }
    }

    assert!(
        violations.is_empty(),
        "git2 used outside src/git:\n  {}",
        violations.join("\n  ")
    );
}

#[test]
fn server_goes_through_the_session() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src/server")) {
        let content = fs::read_to_string(&path).unwrap();
        if content.contains("crate::git") {
            violations.push(path.display().to_string());
        }
    }

    assert!(
        violations.is_empty(),
        "server modules importing crate::git:\n  {}",
        violations.join("\n  ")
    );
}

#[test]
fn git_module_exists() {
    assert!(Path::new("src/git/interface.rs").exists());
}
