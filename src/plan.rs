//! Spread a number of commits over consecutive days.
//!
//! Planning happens in two steps. [`plan`] walks forward from the start date
//! and decides how many commits land on each day; [`expand`] turns that
//! allocation into one timestamp per commit, oldest first.
//!
//! Both steps take the random number generator as a parameter so callers can
//! pass a seeded generator and get the same plan back.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default lower bound for commits placed on one day.
pub const DEFAULT_MIN_PER_DAY: usize = 3;

/// Default upper bound for commits placed on one day.
pub const DEFAULT_MAX_PER_DAY: usize = 8;

/// Default number of days the planner may use.
pub const DEFAULT_LOOKAHEAD_DAYS: usize = 50;

/// Hours of the day that timestamps are drawn from.
///
/// Both ends are inclusive: `start = 9, end = 18` covers 09:00:00 through
/// 18:59:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkHours {
    pub start: u32,
    pub end: u32,
}

impl Default for WorkHours {
    fn default() -> Self {
        Self { start: 9, end: 18 }
    }
}

impl WorkHours {
    /// First second of the window, counted from midnight.
    fn first_second(&self) -> u32 {
        self.start * 3600
    }

    /// Last second of the window, counted from midnight.
    fn last_second(&self) -> u32 {
        self.end * 3600 + 3599
    }

    /// Whether `time` falls inside the window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let secs = time.signed_duration_since(NaiveTime::default()).num_seconds();
        secs >= i64::from(self.first_second()) && secs <= i64::from(self.last_second())
    }
}

/// Everything the planner needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanConfig {
    /// First calendar day commits may land on.
    pub start_date: NaiveDate,

    /// Number of commits to place.
    pub total: usize,

    pub min_per_day: usize,
    pub max_per_day: usize,

    /// How many consecutive days, starting at `start_date`, are available.
    pub lookahead_days: usize,

    pub work_hours: WorkHours,
}

impl PlanConfig {
    /// A config with the default per-day bounds, window and working hours.
    pub fn new(start_date: NaiveDate, total: usize) -> Self {
        Self {
            start_date,
            total,
            min_per_day: DEFAULT_MIN_PER_DAY,
            max_per_day: DEFAULT_MAX_PER_DAY,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            work_hours: WorkHours::default(),
        }
    }

    /// Check that the parameters describe a plan that can be built.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.total == 0 {
            return Err(PlanError::InvalidConfig(
                "commit count must be at least 1".to_string(),
            ));
        }
        if self.min_per_day == 0 || self.min_per_day > self.max_per_day {
            return Err(PlanError::InvalidConfig(format!(
                "per-day bounds must satisfy 1 <= min <= max (got {}..={})",
                self.min_per_day, self.max_per_day
            )));
        }
        if self.lookahead_days == 0 {
            return Err(PlanError::InvalidConfig(
                "lookahead must be at least one day".to_string(),
            ));
        }
        if self.work_hours.start > self.work_hours.end || self.work_hours.end > 23 {
            return Err(PlanError::InvalidConfig(format!(
                "working hours must satisfy start <= end <= 23 (got {}..={})",
                self.work_hours.start, self.work_hours.end
            )));
        }
        Ok(())
    }
}

/// Number of commits assigned to one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayAllocation {
    pub date: NaiveDate,
    pub count: usize,
}

/// Day-by-day allocation of commits, in date order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePlan {
    entries: Vec<DayAllocation>,
}

impl DatePlan {
    pub fn entries(&self) -> &[DayAllocation] {
        &self.entries
    }

    /// Sum of all per-day counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.entries.first().map(|e| e.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.entries.last().map(|e| e.date)
    }
}

impl fmt::Display for DatePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Commit distribution plan:")?;
        writeln!(f, "{}", "-".repeat(40))?;
        for entry in &self.entries {
            writeln!(f, "  {}: {} commits", entry.date, entry.count)?;
        }
        writeln!(f)?;
        writeln!(f, "Total distributed: {} commits", self.total())?;
        if let (Some(first), Some(last)) = (self.first_date(), self.last_date()) {
            writeln!(f, "Starting date: {first}")?;
            write!(f, "Ending date: {last}")?;
        }
        Ok(())
    }
}

/// Decide how many commits go on each day.
///
/// Days are consumed in order from `config.start_date`. While more than
/// `max_per_day` commits remain, a day gets a uniform draw from
/// `min_per_day..=max_per_day`; the next day takes whatever is left.
pub fn plan<R: Rng + ?Sized>(config: &PlanConfig, rng: &mut R) -> Result<DatePlan, PlanError> {
    config.validate()?;

    let mut entries = Vec::new();
    let mut remaining = config.total;

    for date in config.start_date.iter_days().take(config.lookahead_days) {
        let count = if remaining > config.max_per_day {
            rng.random_range(config.min_per_day..=config.max_per_day)
        } else {
            remaining
        };
        entries.push(DayAllocation { date, count });
        remaining -= count;
        if remaining == 0 {
            break;
        }
    }

    if remaining > 0 {
        return Err(PlanError::WindowExhausted {
            window: config.lookahead_days,
            allocated: config.total - remaining,
            total: config.total,
        });
    }

    tracing::debug!(days = entries.len(), total = config.total, "planned distribution");
    Ok(DatePlan { entries })
}

/// Turn a plan into one timestamp per commit.
///
/// Times are drawn uniformly from `hours` and sorted within each day, so the
/// result is ordered oldest first.
pub fn expand<R: Rng + ?Sized>(
    plan: &DatePlan,
    hours: WorkHours,
    rng: &mut R,
) -> Vec<NaiveDateTime> {
    let mut timestamps = Vec::with_capacity(plan.total());

    for entry in &plan.entries {
        let midnight = entry.date.and_time(NaiveTime::default());
        let mut seconds: Vec<u32> = (0..entry.count)
            .map(|_| rng.random_range(hours.first_second()..=hours.last_second()))
            .collect();
        seconds.sort_unstable();
        timestamps.extend(
            seconds
                .into_iter()
                .map(|s| midnight + Duration::seconds(i64::from(s))),
        );
    }

    timestamps
}

/// Errors from planning.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid plan configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "ran out of days: {window} days hold only {allocated} of {total} commits \
         (raise lookahead_days or max_per_day)"
    )]
    WindowExhausted {
        window: usize,
        allocated: usize,
        total: usize,
    },
}
