use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pl_goals::config::{self, PipelineConfig, RunParams};
use pl_goals::fixtures::{FixtureStrategy, TeamFilter};
use pl_goals::identity::TeamResolver;
use pl_goals::model::Season;
use pl_goals::pipeline::Pipeline;
use pl_goals::provider::HttpProvider;
use pl_goals::rate_limit::FixedInterval;
use pl_goals::sink::PersistenceSink;
use pl_goals::snapshot::SnapshotWriter;
use pl_goals::store::{RowStore, SqliteStore};

#[derive(Debug, clap::Parser, Clone)]
#[clap(about = "Ingest Premier League goal timing snapshots")]
struct Args {
    /// single season (starting year)
    #[clap(long, conflicts_with = "seasons")]
    season: Option<Season>,

    /// comma separated seasons, or `all`
    #[clap(long)]
    seasons: Option<String>,

    /// `all` or a team slug
    #[clap(long, default_value = "all")]
    team: String,

    /// fetch goal events and fixture statistics
    #[clap(long)]
    with_stats: bool,

    /// one fixture call per team instead of one per season
    #[clap(long)]
    per_team: bool,

    /// season whose roster document is written (default: latest in the run)
    #[clap(long)]
    roster_season: Option<Season>,

    /// snapshot directory, overrides PL_OUT_DIR
    #[clap(long)]
    out_dir: Option<PathBuf>,

    /// sqlite file, overrides PL_STORE_PATH
    #[clap(long)]
    db: Option<PathBuf>,
}

impl Args {
    fn run_params(&self) -> Result<RunParams> {
        let year = config::current_year();
        let seasons = match (&self.seasons, self.season) {
            (Some(raw), _) => config::parse_seasons(raw, year)?,
            (None, Some(season)) => vec![config::validate_season(season, year)?],
            (None, None) => vec![config::DEFAULT_SEASON],
        };
        let strategy = if self.per_team {
            FixtureStrategy::PerTeam
        } else {
            FixtureStrategy::Bulk
        };
        let params = RunParams {
            seasons,
            team: TeamFilter::parse(&self.team)?,
            with_stats: self.with_stats,
            strategy,
            roster_season: self.roster_season,
        };
        params.validate(year)?;
        Ok(params)
    }
}

fn main() -> Result<()> {
    PipelineConfig::load_env_files();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    debug!("args: {args:?}");
    let params = args.run_params()?;

    let mut cfg = PipelineConfig::from_env()?;
    if let Some(out_dir) = args.out_dir.clone() {
        cfg.out_dir = out_dir;
    }
    if let Some(db) = args.db.clone() {
        cfg.store_path = Some(db);
    }

    let resolver = TeamResolver::new(cfg.load_identity_table()?);
    let store: Option<Box<dyn RowStore>> = match &cfg.store_path {
        Some(path) => {
            let store = SqliteStore::open(path)
                .with_context(|| format!("open sqlite db {}", path.display()))?;
            Some(Box::new(store))
        }
        None => None,
    };
    let sink = PersistenceSink::new(SnapshotWriter::new(cfg.out_dir.clone()), store);
    let provider = HttpProvider::new(
        cfg.provider,
        cfg.api_key.clone(),
        FixedInterval::new(cfg.call_interval),
    )
    .context("build provider client")?;

    let mut pipeline = Pipeline::new(provider, resolver, sink);
    let summary = pipeline.run(&params)?;

    println!("Premier League goal ingest complete");
    println!("Provider: {}", summary.provider);
    println!("Out dir: {}", cfg.out_dir.display());
    println!(
        "DB: {}",
        cfg.store_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none (snapshots only)".to_string())
    );
    println!(
        "Seasons: {}/{}",
        summary.seasons_total - summary.seasons_skipped,
        summary.seasons_total
    );
    println!(
        "Units: {} written, {} skipped",
        summary.units_written, summary.units_skipped
    );
    println!("Files written: {}", summary.files_written);
    println!(
        "Rows upserted: fixtures={} goal_events={}",
        summary.fixture_rows, summary.event_rows
    );
    println!("API calls: {}", summary.api_calls);
    if !summary.warnings.is_empty() {
        println!("Warnings: {}", summary.warnings.len());
        for warning in summary.warnings.iter().take(8) {
            println!(" - {warning}");
        }
    }

    Ok(())
}
