//! redate: spread the dates of existing git commits across a new range of days.
//!
//! redate takes the most recent N commits of the current branch, decides how
//! many of them land on each day starting from a chosen date, and rebuilds the
//! branch as a linear history whose commits carry the same trees, authors and
//! messages but the new dates.
//!
//! # Architecture
//!
//! - **Config**: TOML file plus command-line overrides
//! - **Plan**: Per-day allocation and timestamp generation
//! - **Record**: Commits read from existing history
//! - **Git**: Thin wrapper over the `git` command line
//! - **Rebuild**: Backup, confirmation and the replay loop
//! - **Prompt**: The operator confirmation gate

pub mod config;
pub mod git;
pub mod plan;
pub mod prompt;
pub mod rebuild;
pub mod record;

pub use config::{Config, Overrides};
pub use git::Git;
pub use plan::{DatePlan, DayAllocation, PlanConfig, PlanError, WorkHours, expand, plan};
pub use prompt::{AssumeYes, Confirm, LinePrompt};
pub use rebuild::{Outcome, RebuildOptions, Report, Session, run};
pub use record::CommitRecord;
