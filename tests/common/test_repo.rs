//! TestRepo helper for integration tests.
//!
//! Provides a temporary git repository with a `main` branch.

use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// A temporary git repository for testing.
///
/// The repository is automatically cleaned up when the TestRepo is dropped.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new git repository in a temporary directory, on `main`.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let repo = Self { dir };

        repo.git(&["init", "--quiet"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    /// Get the path to the repository root.
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Execute a git command in this repository.
    ///
    /// # Panics
    ///
    /// Panics if the command fails to execute or returns a non-zero exit code.
    pub fn git(&self, args: &[&str]) -> String {
        match self.git_result(args) {
            Ok(stdout) => stdout,
            Err(stderr) => panic!("git {:?} failed:\n{}", args, stderr),
        }
    }

    /// Execute a git command, returning Result instead of panicking.
    pub fn git_result(&self, args: &[&str]) -> Result<String, String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("Failed to execute git command");

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).into_owned())
        }
    }

    /// Write a file in the repository.
    pub fn write_file(&self, name: &str, content: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&path, content).expect("Failed to write file");
    }

    /// Read a file from the repository.
    ///
    /// Returns an empty string if the file does not exist.
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.path().join(name)).unwrap_or_default()
    }

    /// Stage everything and commit as the given author.
    pub fn commit_as(&self, name: &str, email: &str, message: &str) -> String {
        self.git(&["add", "-A"]);
        let output = Command::new("git")
            .args([
                "commit",
                "--quiet",
                "--no-verify",
                "--allow-empty",
                "--allow-empty-message",
                "-m",
                message,
            ])
            .env("GIT_AUTHOR_NAME", name)
            .env("GIT_AUTHOR_EMAIL", email)
            .env("GIT_COMMITTER_NAME", name)
            .env("GIT_COMMITTER_EMAIL", email)
            .current_dir(self.path())
            .output()
            .expect("Failed to execute git commit");
        if !output.status.success() {
            panic!("git commit failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        self.head()
    }

    /// Stage everything and commit as the default test user.
    pub fn commit(&self, message: &str) -> String {
        self.commit_as("Test User", "test@example.com", message)
    }

    /// Write a file and commit it.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> String {
        self.write_file(name, content);
        self.commit(message)
    }

    /// Full hash of HEAD.
    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"]).trim().to_string()
    }

    /// Name of the checked-out branch.
    pub fn current_branch(&self) -> String {
        self.git(&["symbolic-ref", "--short", "HEAD"]).trim().to_string()
    }

    /// Number of commits reachable from `rev`.
    pub fn count_commits(&self, rev: &str) -> usize {
        self.git(&["rev-list", "--count", rev])
            .trim()
            .parse()
            .expect("rev-list --count output")
    }

    /// Local branches whose names match `pattern`.
    pub fn branches_matching(&self, pattern: &str) -> Vec<String> {
        self.git(&["branch", "--list", "--format=%(refname:short)", pattern])
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// One formatted line per commit, oldest first, for the newest `count`
    /// commits of `rev`.
    pub fn log_oldest_first(&self, rev: &str, count: usize, format: &str) -> Vec<String> {
        let max = format!("--max-count={count}");
        let format = format!("--format={format}");
        let mut lines: Vec<String> = self
            .git(&["log", &max, &format, rev])
            .lines()
            .map(str::to_string)
            .collect();
        lines.reverse();
        lines
    }

    /// Full raw messages, oldest first, for the newest `count` commits.
    pub fn messages_oldest_first(&self, rev: &str, count: usize) -> Vec<String> {
        let max = format!("--max-count={count}");
        let mut messages: Vec<String> = self
            .git(&["log", "-z", &max, "--format=%B", rev])
            .split('\0')
            .map(|m| m.trim_start_matches('\n').to_string())
            .filter(|m| !m.is_empty())
            .collect();
        messages.reverse();
        messages
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
