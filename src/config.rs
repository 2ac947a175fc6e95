//! Run configuration.
//!
//! Settings come from an optional TOML file (by default `redate.toml` at the
//! repository root) and are then overridden by command-line flags:
//!
//! ```toml
//! start_date = "2026-01-03"
//! count = 124
//!
//! [distribution]
//! min_per_day = 3
//! max_per_day = 8
//! lookahead_days = 50
//!
//! [work_hours]
//! start = 9
//! end = 18
//!
//! [branches]
//! backup_prefix = "backup"
//! temp_prefix = "temp-rewrite"
//! remote = "origin"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::{
    DEFAULT_LOOKAHEAD_DAYS, DEFAULT_MAX_PER_DAY, DEFAULT_MIN_PER_DAY, PlanConfig, PlanError,
    WorkHours,
};

/// File name looked up at the repository root when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "redate.toml";

/// Everything a run can be configured with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// First day commits are moved to
    pub start_date: Option<NaiveDate>,

    /// How many of the most recent commits to redistribute
    pub count: Option<usize>,

    pub distribution: Distribution,

    pub work_hours: WorkHours,

    pub branches: Branches,

    pub report: Report,
}

/// Bounds for the per-day allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Distribution {
    pub min_per_day: usize,
    pub max_per_day: usize,
    pub lookahead_days: usize,
}

impl Default for Distribution {
    fn default() -> Self {
        Self {
            min_per_day: DEFAULT_MIN_PER_DAY,
            max_per_day: DEFAULT_MAX_PER_DAY,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }
}

/// Names used for the branches a run creates, and where to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Branches {
    /// Backup branch is `<backup_prefix>-YYYYMMDD-HHMMSS`
    pub backup_prefix: String,

    /// Scratch branch is `<temp_prefix>-HHMMSS`
    pub temp_prefix: String,

    /// Remote named in the suggested push command
    pub remote: String,
}

impl Default for Branches {
    fn default() -> Self {
        Self {
            backup_prefix: "backup".to_string(),
            temp_prefix: "temp-rewrite".to_string(),
            remote: "origin".to_string(),
        }
    }
}

/// What the final report shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Report {
    /// Number of rewritten commits listed at the end
    pub tail_len: usize,
}

impl Default for Report {
    fn default() -> Self {
        Self { tail_len: 15 }
    }
}

/// Values given on the command line. `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub start_date: Option<NaiveDate>,
    pub count: Option<usize>,
}

impl Config {
    /// Parse a config from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `explicit` if given, else `redate.toml` under `root` if it
    /// exists, else the defaults.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let default_path = root.join(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            tracing::info!(path = %default_path.display(), "using config file");
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line values on top of this config.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.start_date.is_some() {
            self.start_date = overrides.start_date;
        }
        if overrides.count.is_some() {
            self.count = overrides.count;
        }
        self
    }

    /// Build and validate the planner's parameters.
    pub fn plan_config(&self) -> Result<PlanConfig, Error> {
        let start_date = self.start_date.ok_or(Error::MissingStartDate)?;
        let total = self.count.ok_or(Error::MissingCount)?;

        let config = PlanConfig {
            start_date,
            total,
            min_per_day: self.distribution.min_per_day,
            max_per_day: self.distribution.max_per_day,
            lookahead_days: self.distribution.lookahead_days,
            work_hours: self.work_hours,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no start date given (use --start-date or `start_date` in the config file)")]
    MissingStartDate,

    #[error("no commit count given (use --count or `count` in the config file)")]
    MissingCount,

    #[error(transparent)]
    Plan(#[from] PlanError),
}
