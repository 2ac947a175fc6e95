//! Property-based tests for planning and log parsing.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use redate::plan::{DEFAULT_LOOKAHEAD_DAYS, DEFAULT_MAX_PER_DAY, DEFAULT_MIN_PER_DAY};
use redate::record::{CommitRecord, parse_log};
use redate::{PlanConfig, PlanError, WorkHours, expand, plan};

// =============================================================================
// Strategies
// =============================================================================

/// A start date somewhere between 2000 and roughly 2040.
fn start_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0u64..15_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
    })
}

/// Valid per-day bounds: `1 <= min <= max`.
fn bounds_strategy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..6).prop_flat_map(|min| (Just(min), min..min + 8))
}

fn hours_strategy() -> impl Strategy<Value = WorkHours> {
    (0u32..24).prop_flat_map(|start| (Just(start), start..24))
        .prop_map(|(start, end)| WorkHours { start, end })
}

fn field_strategy() -> impl Strategy<Value = String> {
    "[^\\x00\\x1f\\n]{0,30}"
}

// =============================================================================
// Planner invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Default settings: counts add up, stay in 3..=8 except the last day,
    /// and days are consecutive from the start date.
    #[test]
    fn default_plan_invariants(
        seed in any::<u64>(),
        start in start_date_strategy(),
        total in 1usize..=124,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let date_plan = plan(&PlanConfig::new(start, total), &mut rng).unwrap();
        let entries = date_plan.entries();

        prop_assert_eq!(date_plan.total(), total);
        prop_assert!(entries.len() <= DEFAULT_LOOKAHEAD_DAYS);
        for entry in &entries[..entries.len() - 1] {
            prop_assert!((DEFAULT_MIN_PER_DAY..=DEFAULT_MAX_PER_DAY).contains(&entry.count));
        }
        prop_assert!(entries.iter().all(|e| e.count >= 1));
        for (i, entry) in entries.iter().enumerate() {
            prop_assert_eq!(entry.date, start.checked_add_days(Days::new(i as u64)).unwrap());
        }
    }

    /// Any valid bounds and window either yield a complete plan or report
    /// the exhausted window.
    #[test]
    fn custom_bounds_never_truncate(
        seed in any::<u64>(),
        start in start_date_strategy(),
        (min, max) in bounds_strategy(),
        lookahead in 1usize..40,
        total in 1usize..300,
    ) {
        let config = PlanConfig {
            min_per_day: min,
            max_per_day: max,
            lookahead_days: lookahead,
            ..PlanConfig::new(start, total)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        match plan(&config, &mut rng) {
            Ok(date_plan) => {
                prop_assert_eq!(date_plan.total(), total);
                prop_assert!(date_plan.entries().len() <= lookahead);
                let entries = date_plan.entries();
                for entry in &entries[..entries.len() - 1] {
                    prop_assert!((min..=max).contains(&entry.count));
                }
            }
            Err(PlanError::WindowExhausted { window, allocated, total: t }) => {
                prop_assert_eq!(window, lookahead);
                prop_assert_eq!(t, total);
                prop_assert!(allocated < total);
                // every day of the window took a full draw
                prop_assert!(allocated >= lookahead * min);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    /// Too little room always fails.
    #[test]
    fn impossible_windows_fail(
        seed in any::<u64>(),
        lookahead in 1usize..10,
        extra in 1usize..50,
    ) {
        let total = lookahead * DEFAULT_MAX_PER_DAY + extra;
        let config = PlanConfig {
            lookahead_days: lookahead,
            ..PlanConfig::new(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(), total)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let is_exhausted = matches!(plan(&config, &mut rng), Err(PlanError::WindowExhausted { .. }));
        prop_assert!(is_exhausted);
    }

    /// One timestamp per commit, in order, inside working hours, on the
    /// planned days.
    #[test]
    fn expanded_timestamps(
        seed in any::<u64>(),
        start in start_date_strategy(),
        total in 1usize..=124,
        hours in hours_strategy(),
    ) {
        let config = PlanConfig {
            work_hours: hours,
            ..PlanConfig::new(start, total)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let date_plan = plan(&config, &mut rng).unwrap();
        let stamps = expand(&date_plan, hours, &mut rng);

        prop_assert_eq!(stamps.len(), total);
        prop_assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(stamps.iter().all(|t| hours.contains(t.time())));

        let mut offset = 0;
        for entry in date_plan.entries() {
            for stamp in &stamps[offset..offset + entry.count] {
                prop_assert_eq!(stamp.date(), entry.date);
            }
            offset += entry.count;
        }
    }

    /// The same seed gives the same plan.
    #[test]
    fn seeded_plans_are_reproducible(seed in any::<u64>(), total in 1usize..=124) {
        let config = PlanConfig::new(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(), total);
        let mut a = ChaCha8Rng::seed_from_u64(seed);
        let mut b = ChaCha8Rng::seed_from_u64(seed);
        prop_assert_eq!(plan(&config, &mut a).unwrap(), plan(&config, &mut b).unwrap());
    }
}

// =============================================================================
// Log parsing
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// The parser returns Ok or Err, never panics.
    #[test]
    fn log_parser_does_not_panic(input in "(?s).*") {
        let _ = parse_log(&input);
    }

    /// Messages survive whatever they contain, apart from NUL.
    #[test]
    fn messages_are_recovered_verbatim(
        id in "[0-9a-f]{40}",
        tree in "[0-9a-f]{40}",
        name in field_strategy(),
        email in field_strategy(),
        message in "[^\\x00]{0,200}",
    ) {
        let output = format!("{id}\x1f{tree}\x1f{name}\x1f{email}\x1f{message}\0");
        let records = parse_log(&output).unwrap();
        prop_assert_eq!(
            records,
            vec![CommitRecord { id, tree, author_name: name, author_email: email, message }]
        );
    }
}
