//! Shared fixtures for integration tests.
//!
//! Repositories are built with the git CLI so the code under test never
//! prepares its own inputs.

#![allow(dead_code)]

use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use gitbridge::core::config::Settings;
use gitbridge::session::{RepositorySession, SessionSettings};

/// A real repository on `main` with one commit containing `README.md`.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");

        run_git(dir.path(), &["init", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);

        std::fs::write(dir.path().join("README.md"), "# Test Repo\n").unwrap();
        run_git(dir.path(), &["add", "README.md"]);
        run_git(dir.path(), &["commit", "-m", "Initial commit"]);

        Self { dir }
    }

    /// A repository with no commits and no identity.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-b", "main"]);
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    /// Write, stage, and commit a file on the checked-out branch.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) {
        self.write(path, content);
        run_git(self.path(), &["add", path]);
        run_git(self.path(), &["commit", "-m", message]);
    }

    pub fn create_branch(&self, name: &str) {
        run_git(self.path(), &["branch", name]);
    }

    pub fn checkout(&self, name: &str) {
        run_git(self.path(), &["checkout", "-q", name]);
    }

    /// The checked-out branch according to git itself.
    pub fn head_branch(&self) -> String {
        git_output(self.path(), &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn rev_parse(&self, rev: &str) -> String {
        git_output(self.path(), &["rev-parse", rev])
    }

    /// Resolve `rev`, `None` if it does not exist.
    pub fn try_rev_parse(&self, rev: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", rev])
            .current_dir(self.path())
            .output()
            .expect("git command failed");
        output
            .status
            .success()
            .then(|| String::from_utf8(output.stdout).unwrap().trim().to_string())
    }

    pub fn config(&self, key: &str) -> String {
        git_output(self.path(), &["config", "--local", key])
    }

    pub fn remotes(&self) -> Vec<String> {
        git_output(self.path(), &["remote"])
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// A bare repository to push into.
pub struct BareRemote {
    dir: TempDir,
}

impl BareRemote {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "--bare", "-b", "main"]);
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn rev_parse(&self, rev: &str) -> String {
        git_output(self.dir.path(), &["rev-parse", rev])
    }
}

/// A bare repository served by `git daemon` with pushes enabled.
///
/// The daemon is killed when the fixture drops.
pub struct DaemonRemote {
    dir: TempDir,
    port: u16,
    child: Child,
}

impl DaemonRemote {
    const NAME: &'static str = "remote.git";

    pub fn start() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "--bare", "-q", "-b", "main", Self::NAME]);

        let port = TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .expect("no free port")
            .port();
        let base = dir.path().to_str().unwrap().to_string();
        let child = Command::new("git")
            .args([
                "daemon",
                "--listen=127.0.0.1",
                &format!("--port={}", port),
                &format!("--base-path={}", base),
                "--export-all",
                "--enable=receive-pack",
                "--reuseaddr",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn git daemon");

        let deadline = Instant::now() + Duration::from_secs(10);
        while TcpStream::connect(("127.0.0.1", port)).is_err() {
            assert!(Instant::now() < deadline, "git daemon did not start");
            thread::sleep(Duration::from_millis(50));
        }

        Self { dir, port, child }
    }

    pub fn url(&self) -> String {
        format!("git://127.0.0.1:{}/{}", self.port, Self::NAME)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join(Self::NAME)
    }

    /// Install a `pre-receive` hook that refuses every update.
    #[cfg(unix)]
    pub fn reject_pushes(&self) {
        use std::os::unix::fs::PermissionsExt;

        let hook = self.path().join("hooks").join("pre-receive");
        std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
        std::fs::write(&hook, "#!/bin/sh\necho refused >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Resolve `rev` in the served repository, `None` if it does not exist.
    pub fn try_rev_parse(&self, rev: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", rev])
            .current_dir(self.path())
            .output()
            .expect("git command failed");
        output
            .status
            .success()
            .then(|| String::from_utf8(output.stdout).unwrap().trim().to_string())
    }
}

impl Drop for DaemonRemote {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

pub fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// A session built from default settings.
pub fn session() -> RepositorySession {
    RepositorySession::new(SessionSettings::from_settings(&Settings::default()).unwrap())
}

/// A session already pointed at `repo`.
pub fn session_for(repo: &TestRepo) -> RepositorySession {
    let session = session();
    session.set_repository_path(repo.path()).unwrap();
    session
}
