use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "redate")]
#[command(about = "Spread the dates of recent git commits across a new range of days")]
struct Cli {
    /// Repository to operate on
    #[arg(short = 'C', long, default_value = ".")]
    repo: PathBuf,

    /// TOML configuration file (default: redate.toml in the repository root)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// First day commits are moved to (YYYY-MM-DD)
    #[arg(short, long)]
    start_date: Option<NaiveDate>,

    /// Number of most recent commits to redistribute
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Seed for the random distribution, for reproducible plans
    #[arg(long)]
    seed: Option<u64>,

    /// Print the plan without touching the repository
    #[arg(long)]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Keep commits whose snapshot is unchanged instead of failing
    #[arg(long)]
    allow_empty: bool,

    /// More log output on stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let git = redate::Git::discover(&cli.repo)?;

    let config = redate::Config::discover(git.root(), cli.config.as_deref())?.with_overrides(
        redate::Overrides {
            start_date: cli.start_date,
            count: cli.count,
        },
    );
    let plan_config = config.plan_config()?;

    let options = redate::RebuildOptions {
        dry_run: cli.dry_run,
        allow_empty: cli.allow_empty,
        branches: config.branches.clone(),
        tail_len: config.report.tail_len,
    };

    let mut rng = match cli.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    };

    println!("=== redate: redistributing commit dates ===\n");

    let outcome = if cli.yes {
        redate::run(
            git,
            &plan_config,
            &options,
            &mut rng,
            &mut redate::AssumeYes(true),
        )
    } else {
        redate::run(
            git,
            &plan_config,
            &options,
            &mut rng,
            &mut redate::LinePrompt::stdio(),
        )
    }
    .map_err(|e| {
        let note = if e.is_precondition() {
            "nothing was changed"
        } else {
            "rewrite did not complete"
        };
        anyhow::Error::new(e).context(note)
    })?;

    match outcome {
        redate::Outcome::Planned(_) => println!("Dry run: repository left untouched."),
        redate::Outcome::Cancelled => {}
        redate::Outcome::Completed(report) => println!("\n{report}"),
    }

    Ok(())
}
