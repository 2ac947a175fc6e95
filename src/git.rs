//! Git repository operations.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::record::LOG_FORMAT;

/// Author and committer identity for a new commit.
#[derive(Debug, Clone, Copy)]
pub struct Signature<'a> {
    pub name: &'a str,
    pub email: &'a str,

    /// Anything git's date parser accepts, e.g. `2026-01-03 14:22:10`.
    pub date: &'a str,
}

/// A git repository handle that provides common operations.
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
}

impl Git {
    /// Find the git repository containing `start` (a directory).
    pub fn discover(start: &Path) -> Result<Self, Error> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(start)
            .output()
            .map_err(|e| Error::Exec(format!("git rev-parse: {e}")))?;

        if !output.status.success() {
            return Err(Error::NotARepo(start.display().to_string()));
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(root = %root, "discovered repository");
        Ok(Self {
            root: PathBuf::from(root),
        })
    }

    /// Get the repository root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if a branch or ref exists.
    pub fn ref_exists(&self, refname: &str) -> bool {
        self.command(&["rev-parse", "--verify", "--quiet", refname])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Check if a local branch exists.
    pub fn branch_exists(&self, branch: &str) -> bool {
        self.ref_exists(&format!("refs/heads/{branch}"))
    }

    /// Name of the checked-out branch, or `None` when HEAD is detached.
    pub fn current_branch(&self) -> Result<Option<String>, Error> {
        let branch = self.try_output(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        Ok(branch.map(|b| b.trim().to_string()))
    }

    /// Number of commits reachable from `rev`.
    pub fn commit_count(&self, rev: &str) -> Result<usize, Error> {
        let count = self.run_output(&["rev-list", "--count", rev])?;
        count.trim().parse().map_err(|_| Error::Failed {
            command: format!("git rev-list --count {rev}"),
            stderr: format!("unexpected output '{}'", count.trim()),
        })
    }

    /// Whether tracked files differ from HEAD (staged or not).
    pub fn has_tracked_changes(&self) -> Result<bool, Error> {
        let status = self.run_output(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!status.trim().is_empty())
    }

    /// Raw log of the `count` most recent commits, newest first, in the
    /// format understood by [`crate::record::parse_log`].
    pub fn log_records(&self, count: usize) -> Result<String, Error> {
        let max = format!("--max-count={count}");
        let format = format!("--format={LOG_FORMAT}");
        self.run_output(&["log", "-z", &max, &format, "HEAD"])
    }

    /// Files not tracked in the index, ignored ones included.
    pub fn untracked_files(&self) -> Result<Vec<String>, Error> {
        let output = self.run_output(&["ls-files", "-z", "--others"])?;
        Ok(split_nul(&output))
    }

    /// Every file path recorded in the tree of `rev`.
    pub fn tree_paths(&self, rev: &str) -> Result<Vec<String>, Error> {
        let output = self.run_output(&["ls-tree", "-r", "-z", "--name-only", rev])?;
        Ok(split_nul(&output))
    }

    /// Hashes of the parentless commits reachable from HEAD.
    pub fn root_commits(&self) -> Result<Vec<String>, Error> {
        let output = self.run_output(&["rev-list", "--max-parents=0", "HEAD"])?;
        Ok(output.lines().map(str::to_string).collect())
    }

    /// Full hash of HEAD, or `None` on an unborn branch.
    pub fn head(&self) -> Result<Option<String>, Error> {
        let hash = self.try_output(&["rev-parse", "--verify", "--quiet", "HEAD"])?;
        Ok(hash.map(|h| h.trim().to_string()))
    }

    /// Parents of `rev`, in order.
    pub fn parents(&self, rev: &str) -> Result<Vec<String>, Error> {
        let output = self.run_output(&["rev-list", "--parents", "-n", "1", rev])?;
        Ok(output
            .split_whitespace()
            .skip(1)
            .map(str::to_string)
            .collect())
    }

    /// Hash of the tree recorded by `rev`.
    pub fn tree(&self, rev: &str) -> Result<String, Error> {
        let tree = self.run_output(&["rev-parse", &format!("{rev}^{{tree}}")])?;
        Ok(tree.trim().to_string())
    }

    /// Create a branch pointing at `start`.
    pub fn create_branch(&self, branch: &str, start: &str) -> Result<(), Error> {
        self.run(&["branch", branch, start])
    }

    /// Move `branch` to `target`, creating it if needed.
    pub fn force_branch(&self, branch: &str, target: &str) -> Result<(), Error> {
        self.run(&["branch", "-f", branch, target])
    }

    /// Delete a branch whether or not it is merged.
    pub fn delete_branch(&self, branch: &str) -> Result<(), Error> {
        self.run(&["branch", "-D", branch])
    }

    /// Checkout a branch.
    pub fn checkout(&self, branch: &str) -> Result<(), Error> {
        self.run(&["checkout", "--quiet", branch])
    }

    /// Checkout a branch, discarding local changes to tracked files.
    pub fn checkout_force(&self, branch: &str) -> Result<(), Error> {
        self.run(&["checkout", "--quiet", "--force", branch])
    }

    /// Start a new branch with no history. The index keeps the current tree.
    pub fn checkout_orphan(&self, branch: &str) -> Result<(), Error> {
        self.run(&["checkout", "--quiet", "--orphan", branch])
    }

    /// Make the index and tracked files match the tree of `rev` exactly.
    ///
    /// Tracked files missing from that tree are removed. An untracked file at
    /// a path of that tree is overwritten.
    pub fn read_tree(&self, rev: &str) -> Result<(), Error> {
        self.run(&["read-tree", "--reset", "-u", rev])
    }

    /// Commit the index as-is with the given identity and message.
    ///
    /// The message goes through stdin untouched (`--cleanup=verbatim`), an
    /// empty message is accepted, and hooks are skipped.
    pub fn commit_as(
        &self,
        signature: Signature<'_>,
        message: &str,
        allow_empty: bool,
    ) -> Result<(), Error> {
        let mut args = vec![
            "commit",
            "--quiet",
            "--no-verify",
            "--cleanup=verbatim",
            "--allow-empty-message",
            "--file=-",
        ];
        if allow_empty {
            args.push("--allow-empty");
        }

        let mut child = self
            .command(&args)
            .env("GIT_AUTHOR_NAME", signature.name)
            .env("GIT_AUTHOR_EMAIL", signature.email)
            .env("GIT_AUTHOR_DATE", signature.date)
            .env("GIT_COMMITTER_NAME", signature.name)
            .env("GIT_COMMITTER_EMAIL", signature.email)
            .env("GIT_COMMITTER_DATE", signature.date)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Exec(format!("git commit: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .map_err(|e| Error::Exec(format!("git commit: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Exec(format!("git commit: {e}")))?;
        check(&args, output).map(drop)
    }

    /// One line per commit (`<short hash> <date> <subject>`) for the last
    /// `count` commits on HEAD.
    pub fn log_tail(&self, count: usize) -> Result<String, Error> {
        let max = format!("--max-count={count}");
        self.run_output(&["log", &max, "--date=short", "--pretty=format:%h %ad %s"])
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn command(&self, args: &[&str]) -> Command {
        tracing::debug!(?args, "git");
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.root);
        cmd
    }

    /// Run a git command that produces no output we care about.
    fn run(&self, args: &[&str]) -> Result<(), Error> {
        self.run_output(args).map(drop)
    }

    /// Run a git command and capture its stdout.
    fn run_output(&self, args: &[&str]) -> Result<String, Error> {
        let output = self
            .command(args)
            .output()
            .map_err(|e| Error::Exec(format!("git {}: {e}", args.first().unwrap_or(&""))))?;
        check(args, output)
    }

    /// Like `run_output`, but a non-zero exit is `None` rather than an error.
    fn try_output(&self, args: &[&str]) -> Result<Option<String>, Error> {
        let output = self
            .command(args)
            .output()
            .map_err(|e| Error::Exec(format!("git {}: {e}", args.first().unwrap_or(&""))))?;

        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).to_string()))
        } else {
            Ok(None)
        }
    }
}

fn split_nul(output: &str) -> Vec<String> {
    output
        .split('\0')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn check(args: &[&str], output: Output) -> Result<String, Error> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(Error::Failed {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Errors from git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to execute: {0}")]
    Exec(String),

    #[error("not a git repository (searched from '{0}')")]
    NotARepo(String),

    #[error("`{command}` failed: {stderr}")]
    Failed { command: String, stderr: String },
}
