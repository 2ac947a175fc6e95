//! Rebuild history with redistributed dates.
//!
//! A run goes through fixed stages: preflight checks and extraction (read
//! only), planning, a backup branch, the operator's confirmation, the replay
//! loop on a scratch branch, and finally moving the original branch onto the
//! rebuilt line. Nothing is written before the backup exists, and the backup
//! is never removed once the operator has confirmed.

use std::collections::HashSet;
use std::fmt;

use chrono::{Local, NaiveDate, NaiveDateTime};
use rand::Rng;
use thiserror::Error;

use crate::config::Branches;
use crate::git::{self, Git, Signature};
use crate::plan::{self, DatePlan, PlanConfig, PlanError};
use crate::prompt::Confirm;
use crate::record::{self, CommitRecord, ParseError, SHORT_HASH_LEN};

/// Knobs for a run that are not part of the plan itself.
#[derive(Debug, Clone, Default)]
pub struct RebuildOptions {
    /// Stop after printing the plan.
    pub dry_run: bool,

    /// Record commits whose snapshot equals the previous one.
    pub allow_empty: bool,

    pub branches: Branches,

    /// Number of rewritten commits listed in the report.
    pub tail_len: usize,
}

/// How a run ended, when it did not fail.
#[derive(Debug)]
pub enum Outcome {
    /// `dry_run` was set; nothing was touched.
    Planned(DatePlan),

    /// The operator declined. The repository is as it was.
    Cancelled,

    /// History was rewritten.
    Completed(Report),
}

/// Summary printed after a successful rewrite.
#[derive(Debug, Clone)]
pub struct Report {
    pub branch: String,
    pub backup: String,
    pub remote: String,
    pub commits: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,

    /// `git log` lines for the newest rewritten commits.
    pub tail: String,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "New commit dates (last {} lines):", self.tail.lines().count())?;
        writeln!(f, "{}", self.tail)?;
        writeln!(f)?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "✓ {} commits redistributed", self.commits)?;
        writeln!(f, "  Date range: {} to {}", self.first_date, self.last_date)?;
        writeln!(f, "  Backup branch: {}", self.backup)?;
        writeln!(f)?;
        writeln!(f, "To push changes:")?;
        writeln!(f, "   git push --force {} {}", self.remote, self.branch)?;
        writeln!(f)?;
        writeln!(f, "To restore the original history:")?;
        writeln!(f, "   git reset --hard {}", self.backup)?;
        write!(f, "{}", "=".repeat(50))
    }
}

/// Run the whole rewrite against `git`.
pub fn run<R: Rng + ?Sized>(
    git: Git,
    plan_config: &PlanConfig,
    options: &RebuildOptions,
    rng: &mut R,
    confirm: &mut dyn Confirm,
) -> Result<Outcome, Error> {
    let mut session = Session::open(git)?;
    println!("Branch: {}", session.branch());

    let records = session.extract(plan_config.total)?;
    session.check_untracked(&records)?;

    let date_plan = plan::plan(plan_config, rng)?;
    let timestamps = plan::expand(&date_plan, plan_config.work_hours, rng);
    println!("{date_plan}\n");

    if options.dry_run {
        return Ok(Outcome::Planned(date_plan));
    }

    let now = Local::now().naive_local();
    let backup = session.snapshot(&options.branches.backup_prefix, now)?;
    println!("✓ Backup created: {backup}\n");

    println!("⚠ WARNING: this will rewrite the history of '{}'!", session.branch());
    println!(
        "  {} commits will be redistributed from {} onwards",
        timestamps.len(),
        plan_config.start_date
    );
    let confirmed = confirm.confirm("Continue?").map_err(Error::Prompt)?;
    if !confirmed {
        session.discard_backup()?;
        println!("Aborted");
        return Ok(Outcome::Cancelled);
    }

    let roots = session.git.root_commits()?;
    if let Some(root) = roots.first() {
        println!("\nRoot commit: {}...", &root[..SHORT_HASH_LEN.min(root.len())]);
    }

    println!("Rewriting {} commits...", records.len());
    let scratch = format!("{}-{}", options.branches.temp_prefix, now.format("%H%M%S"));
    let rewritten = session
        .replay(&scratch, &records, &timestamps, options.allow_empty)
        .and_then(|()| {
            println!("\n✓ Rewrite complete\n");
            println!("Updating {}...", session.branch());
            session.finalize()
        });
    if let Err(e) = rewritten {
        eprintln!("✗ Rewrite failed; original history is kept in '{backup}'");
        eprintln!("  To restore: git reset --hard {backup}");
        return Err(e);
    }

    Ok(Outcome::Completed(Report {
        branch: session.branch().to_string(),
        backup,
        remote: options.branches.remote.clone(),
        commits: records.len(),
        first_date: date_plan.first_date().unwrap_or(plan_config.start_date),
        last_date: date_plan.last_date().unwrap_or(plan_config.start_date),
        tail: tail_or_warn(session.git.log_tail(options.tail_len)),
    }))
}

/// The branch has already moved by the time the tail is read, so a failure
/// here only shortens the report.
fn tail_or_warn(tail: Result<String, git::Error>) -> String {
    tail.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read the rewritten log");
        String::new()
    })
}

/// Untracked paths that a replay would overwrite, delete, or need to turn
/// into (or out of) a directory, given every file path in the replayed trees.
fn colliding_paths(untracked: &[String], tracked: &HashSet<String>) -> Vec<String> {
    let dirs: HashSet<&str> = tracked
        .iter()
        .flat_map(|path| path.match_indices('/').map(move |(slash, _)| &path[..slash]))
        .collect();

    untracked
        .iter()
        .filter(|path| {
            tracked.contains(path.as_str())
                || dirs.contains(path.as_str())
                || path
                    .match_indices('/')
                    .any(|(slash, _)| tracked.contains(&path[..slash]))
        })
        .cloned()
        .collect()
}

/// State of one run: the repository, the branch being rewritten, and the
/// branches created along the way.
#[derive(Debug)]
pub struct Session {
    git: Git,
    branch: String,
    backup: Option<String>,
    scratch: Option<String>,
}

impl Session {
    /// Preflight: a named branch must be checked out with no pending changes
    /// to tracked files.
    pub fn open(git: Git) -> Result<Self, Error> {
        let branch = git.current_branch()?.ok_or(Error::DetachedHead)?;
        if git.has_tracked_changes()? {
            return Err(Error::DirtyWorkingTree);
        }
        tracing::info!(%branch, root = %git.root().display(), "session opened");
        Ok(Self {
            git,
            branch,
            backup: None,
            scratch: None,
        })
    }

    pub fn git(&self) -> &Git {
        &self.git
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn backup(&self) -> Option<&str> {
        self.backup.as_deref()
    }

    /// Read the `count` most recent commits, oldest first.
    pub fn extract(&self, count: usize) -> Result<Vec<CommitRecord>, Error> {
        let available = match self.git.head()? {
            Some(_) => self.git.commit_count("HEAD")?,
            None => 0,
        };
        println!("Total commits found: {available}");
        println!("Target commits to redistribute: {count}\n");
        if available < count {
            return Err(Error::InsufficientCommits {
                available,
                requested: count,
            });
        }

        let mut records = record::parse_log(&self.git.log_records(count)?)?;
        if records.len() != count {
            return Err(Error::IncompleteHistory {
                read: records.len(),
                requested: count,
            });
        }
        records.reverse();
        Ok(records)
    }

    /// Refuse to go on when an untracked or ignored file sits where one of
    /// the replayed snapshots has a path. Materializing those snapshots would
    /// overwrite or delete it.
    pub fn check_untracked(&self, records: &[CommitRecord]) -> Result<(), Error> {
        let untracked = self.git.untracked_files()?;
        if untracked.is_empty() {
            return Ok(());
        }

        let mut tracked = HashSet::new();
        for record in records {
            tracked.extend(self.git.tree_paths(&record.tree)?);
        }

        let paths = colliding_paths(&untracked, &tracked);
        if paths.is_empty() {
            tracing::debug!(count = untracked.len(), "untracked files do not collide");
            return Ok(());
        }
        Err(Error::UntrackedCollision { paths })
    }

    /// Create the backup branch at the current tip and check it is there.
    pub fn snapshot(&mut self, prefix: &str, now: NaiveDateTime) -> Result<String, Error> {
        let name = format!("{prefix}-{}", now.format("%Y%m%d-%H%M%S"));
        if self.git.branch_exists(&name) {
            return Err(Error::BranchExists(name));
        }

        println!("Creating backup: {name}");
        self.git.create_branch(&name, "HEAD")?;
        if !self.git.branch_exists(&name) {
            return Err(Error::BackupMissing(name));
        }

        tracing::info!(backup = %name, "backup created");
        self.backup = Some(name.clone());
        Ok(name)
    }

    /// Remove the backup again. Only valid before anything was rewritten.
    pub fn discard_backup(&mut self) -> Result<(), Error> {
        if let Some(backup) = self.backup.take() {
            self.git.delete_branch(&backup)?;
            tracing::info!(%backup, "backup removed");
        }
        Ok(())
    }

    /// Replay `records` onto a new parentless branch named `scratch`, one
    /// commit per record, stamped with the matching entry of `timestamps`.
    ///
    /// On failure the original branch is checked out again and the scratch
    /// branch is removed; the backup stays.
    pub fn replay(
        &mut self,
        scratch: &str,
        records: &[CommitRecord],
        timestamps: &[NaiveDateTime],
        allow_empty: bool,
    ) -> Result<(), Error> {
        if records.len() != timestamps.len() {
            return Err(Error::PlanMismatch {
                commits: records.len(),
                timestamps: timestamps.len(),
            });
        }
        if self.git.branch_exists(scratch) {
            return Err(Error::BranchExists(scratch.to_string()));
        }

        self.git.checkout_orphan(scratch)?;
        self.scratch = Some(scratch.to_string());

        let result = records
            .iter()
            .zip(timestamps)
            .enumerate()
            .try_for_each(|(i, (record, when))| {
                println!(
                    "[{}/{}] {} -> {}",
                    i + 1,
                    records.len(),
                    record.short_id(),
                    when.format("%Y-%m-%d %H:%M:%S")
                );
                self.replay_one(i + 1, record, when, allow_empty)
            });

        if let Err(e) = result {
            tracing::error!(error = %e, "replay failed, restoring {}", self.branch);
            self.abort();
            return Err(e);
        }
        Ok(())
    }

    fn replay_one(
        &self,
        index: usize,
        record: &CommitRecord,
        when: &NaiveDateTime,
        allow_empty: bool,
    ) -> Result<(), Error> {
        let before = self.git.head()?;

        self.git.read_tree(&record.id)?;

        let date = when.format("%Y-%m-%d %H:%M:%S").to_string();
        let signature = Signature {
            name: &record.author_name,
            email: &record.author_email,
            date: &date,
        };
        let committed = self.git.commit_as(signature, &record.message, allow_empty);

        let after = match self.git.head()? {
            Some(after) if Some(&after) != before.as_ref() => after,
            _ => {
                if let Err(e) = &committed {
                    tracing::warn!(index, id = %record.id, error = %e, "commit did not happen");
                }
                return Err(Error::EmptyReplay {
                    index,
                    id: record.id.clone(),
                });
            }
        };
        committed?;

        let expected_parents: Vec<String> = before.into_iter().collect();
        if self.git.parents(&after)? != expected_parents {
            return Err(Error::NotLinear {
                index,
                id: record.id.clone(),
            });
        }

        if self.git.tree(&after)? != record.tree {
            return Err(Error::TreeMismatch {
                index,
                id: record.id.clone(),
            });
        }

        tracing::debug!(index, from = %record.id, to = %after, "replayed");
        Ok(())
    }

    /// Best-effort return to the original branch after a failed replay.
    fn abort(&mut self) {
        if let Err(e) = self.git.checkout_force(&self.branch) {
            tracing::warn!(error = %e, "could not check out {}", self.branch);
            return;
        }
        if let Some(scratch) = self.scratch.take() {
            if self.git.branch_exists(&scratch) {
                if let Err(e) = self.git.delete_branch(&scratch) {
                    tracing::warn!(error = %e, "could not delete {scratch}");
                }
            }
        }
    }

    /// Point the original branch at the rebuilt line and drop the scratch
    /// branch.
    pub fn finalize(&mut self) -> Result<(), Error> {
        let Some(scratch) = self.scratch.take() else {
            return Err(Error::NothingReplayed);
        };
        self.git.force_branch(&self.branch, &scratch)?;
        self.git.checkout(&self.branch)?;
        self.git.delete_branch(&scratch)?;
        tracing::info!(branch = %self.branch, "branch moved to rebuilt history");
        Ok(())
    }
}

/// Errors that can occur during a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Git(#[from] git::Error),

    #[error("failed to read history")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("HEAD is detached; check out the branch to rewrite")]
    DetachedHead,

    #[error("tracked files have uncommitted changes; commit or stash them first")]
    DirtyWorkingTree,

    #[error(
        "untracked files would be overwritten by the rewrite: {}; move or commit them first",
        list_paths(.paths)
    )]
    UntrackedCollision { paths: Vec<String> },

    #[error("repository has {available} commits but {requested} were requested")]
    InsufficientCommits { available: usize, requested: usize },

    #[error("read {read} commits from history but {requested} were requested")]
    IncompleteHistory { read: usize, requested: usize },

    #[error("{commits} commits but {timestamps} planned timestamps")]
    PlanMismatch { commits: usize, timestamps: usize },

    #[error("branch '{0}' already exists")]
    BranchExists(String),

    #[error("backup branch '{0}' was not created")]
    BackupMissing(String),

    #[error("commit {index} ({id}) did not produce a new commit (unchanged snapshot? see --allow-empty)")]
    EmptyReplay { index: usize, id: String },

    #[error("commit {index} ({id}) was not added on top of the previous one")]
    NotLinear { index: usize, id: String },

    #[error("commit {index} ({id}) was rebuilt with different content")]
    TreeMismatch { index: usize, id: String },

    #[error("finalize called before anything was replayed")]
    NothingReplayed,

    #[error("failed to read confirmation")]
    Prompt(#[source] std::io::Error),
}

impl Error {
    /// Whether the failure happened before the repository was touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::Git(git::Error::NotARepo(_))
                | Error::Parse(_)
                | Error::Plan(_)
                | Error::DetachedHead
                | Error::DirtyWorkingTree
                | Error::UntrackedCollision { .. }
                | Error::InsufficientCommits { .. }
                | Error::IncompleteHistory { .. }
        )
    }
}

fn list_paths(paths: &[String]) -> String {
    const SHOWN: usize = 5;
    let mut list = paths
        .iter()
        .take(SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if paths.len() > SHOWN {
        list.push_str(&format!(" and {} more", paths.len() - SHOWN));
    }
    list
}
