use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, Utc};

use crate::error::{ConfigError, ValidationError};
use crate::fixtures::{FixtureStrategy, TeamFilter};
use crate::identity::IdentityTable;
use crate::model::Season;
use crate::provider::ProviderKind;

pub const DEFAULT_OUT_DIR: &str = "public/data";
pub const DEFAULT_CALL_INTERVAL_MS: u64 = 6500;
pub const DEFAULT_SEASON: Season = 2024;
/// Expansion of `--seasons all`.
pub const ALL_SEASONS: RangeInclusive<Season> = 2015..=2025;
pub const FIRST_SUPPORTED_SEASON: Season = 2000;

/// Process-level settings, read once from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub store_path: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub call_interval: Duration,
    pub identity_table: Option<PathBuf>,
}

impl PipelineConfig {
    /// `.env.local` wins over `.env`; neither is required.
    pub fn load_env_files() {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(opt_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("PL_PROVIDER") {
            Some(raw) => raw.parse::<ProviderKind>()?,
            None => ProviderKind::ApiSports,
        };
        let key_var = provider.key_var();
        let api_key = lookup(key_var).ok_or(ConfigError::MissingVar(key_var))?;

        let call_interval = match lookup("PL_CALL_INTERVAL_MS") {
            Some(raw) => {
                let ms = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidVar {
                        key: "PL_CALL_INTERVAL_MS",
                        value: raw.clone(),
                    })?;
                Duration::from_millis(ms)
            }
            None => Duration::from_millis(DEFAULT_CALL_INTERVAL_MS),
        };

        Ok(Self {
            provider,
            api_key,
            store_path: lookup("PL_STORE_PATH").map(PathBuf::from),
            out_dir: lookup("PL_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            call_interval,
            identity_table: lookup("PL_IDENTITY_TABLE").map(PathBuf::from),
        })
    }

    pub fn load_identity_table(&self) -> Result<IdentityTable, ConfigError> {
        match &self.identity_table {
            Some(path) => IdentityTable::from_json_file(path),
            None => Ok(IdentityTable::builtin()),
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        if val.trim().is_empty() {
            None
        } else {
            Some(val)
        }
    })
}

/// Per-invocation parameters, validated before any provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub seasons: Vec<Season>,
    pub team: TeamFilter,
    /// Goal events and fixture statistics; off means score-only aggregates.
    pub with_stats: bool,
    pub strategy: FixtureStrategy,
    pub roster_season: Option<Season>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            seasons: vec![DEFAULT_SEASON],
            team: TeamFilter::All,
            with_stats: false,
            strategy: FixtureStrategy::Bulk,
            roster_season: None,
        }
    }
}

impl RunParams {
    /// Season whose roster document gets written: explicit, else the latest run.
    pub fn roster_season(&self) -> Option<Season> {
        self.roster_season
            .or_else(|| self.seasons.iter().max().copied())
    }

    pub fn validate(&self, current_year: Season) -> Result<(), ValidationError> {
        if self.seasons.is_empty() {
            return Err(ValidationError::NoSeasons);
        }
        for season in self.seasons.iter().chain(self.roster_season.iter()) {
            validate_season(*season, current_year)?;
        }
        Ok(())
    }
}

pub fn current_year() -> Season {
    Utc::now().year().clamp(0, i32::from(Season::MAX)) as Season
}

/// Accepts a single year, a comma or space separated list, or `all`.
/// Order is kept and duplicates dropped.
pub fn parse_seasons(raw: &str, current_year: Season) -> Result<Vec<Season>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("all") {
        return Ok(ALL_SEASONS
            .filter(|season| *season <= current_year)
            .collect());
    }

    let mut seasons = Vec::new();
    for part in trimmed.split([',', ' ', ';']).filter(|p| !p.is_empty()) {
        let season = part
            .parse::<Season>()
            .map_err(|_| ValidationError::Season(part.to_string()))?;
        let season = validate_season(season, current_year)?;
        if !seasons.contains(&season) {
            seasons.push(season);
        }
    }
    if seasons.is_empty() {
        return Err(ValidationError::NoSeasons);
    }
    Ok(seasons)
}

pub fn validate_season(season: Season, current_year: Season) -> Result<Season, ValidationError> {
    if (FIRST_SUPPORTED_SEASON..=current_year).contains(&season) {
        Ok(season)
    } else {
        Err(ValidationError::SeasonOutOfRange {
            season,
            min: FIRST_SUPPORTED_SEASON,
            max: current_year,
        })
    }
}
