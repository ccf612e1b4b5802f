use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::aggregate::{FallbackReason, GoalEventSource, aggregate_unit};
use crate::config::{RunParams, current_year};
use crate::error::{PersistenceError, PipelineError};
use crate::events::{EventFetcher, FixtureDetailCache, fetch_fixture_stats};
use crate::fixtures::{SeasonFixtures, collect_season};
use crate::identity::TeamResolver;
use crate::model::{Season, TeamIdentity};
use crate::provider::{Provider, ProviderKind};
use crate::scorers::top_scorers;
use crate::sink::{PersistenceSink, SinkReport};
use crate::snapshot::TeamSeasonSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub provider: ProviderKind,
    pub started_at: DateTime<Utc>,
    pub seasons_total: usize,
    pub seasons_skipped: usize,
    pub units_written: usize,
    pub units_skipped: usize,
    /// Snapshots plus roster documents.
    pub files_written: usize,
    pub fixture_rows: usize,
    pub event_rows: usize,
    pub api_calls: usize,
    pub warnings: Vec<String>,
}

impl RunSummary {
    fn new(provider: ProviderKind, seasons_total: usize) -> Self {
        Self {
            provider,
            started_at: Utc::now(),
            seasons_total,
            seasons_skipped: 0,
            units_written: 0,
            units_skipped: 0,
            files_written: 0,
            fixture_rows: 0,
            event_rows: 0,
            api_calls: 0,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Drives seasons and (team, season) units strictly in sequence. The provider's
/// limiter is the only place a run waits.
pub struct Pipeline<P: Provider> {
    provider: P,
    resolver: TeamResolver,
    sink: PersistenceSink,
}

impl<P: Provider> Pipeline<P> {
    pub fn new(provider: P, resolver: TeamResolver, sink: PersistenceSink) -> Self {
        Self {
            provider,
            resolver,
            sink,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn sink(&self) -> &PersistenceSink {
        &self.sink
    }

    /// Only invalid parameters fail the run. Provider and persistence trouble
    /// skips the affected season or unit and is reported in the summary.
    pub fn run(&mut self, params: &RunParams) -> Result<RunSummary, PipelineError> {
        params.validate(current_year())?;

        let kind = self.provider.kind();
        let mut summary = RunSummary::new(kind, params.seasons.len());
        let roster_season = params.roster_season();
        info!(
            provider = %kind,
            seasons = ?params.seasons,
            identity_table = self.resolver.table_version(),
            "ingest run starting"
        );

        for &season in &params.seasons {
            let collected = match collect_season(
                &mut self.provider,
                &self.resolver,
                season,
                params.strategy,
                &params.team,
            ) {
                Ok(collected) => collected,
                Err(err) => {
                    warn!(season, error = %err, "season skipped");
                    summary.seasons_skipped += 1;
                    summary.warn(format!("season {season}: {err}"));
                    continue;
                }
            };
            self.run_season(&collected, params, roster_season == Some(season), &mut summary);
        }

        summary.api_calls = self.provider.calls();
        self.sink.record_run(&summary);
        info!(
            units_written = summary.units_written,
            units_skipped = summary.units_skipped,
            seasons_skipped = summary.seasons_skipped,
            api_calls = summary.api_calls,
            "ingest run finished"
        );
        Ok(summary)
    }

    fn run_season(
        &mut self,
        collected: &SeasonFixtures,
        params: &RunParams,
        write_roster: bool,
        summary: &mut RunSummary,
    ) {
        let season = collected.season;
        if write_roster {
            match self.sink.snapshots().write_roster(season, &collected.roster) {
                Ok(path) => {
                    info!(season, path = %path.display(), teams = collected.roster.len(), "roster written");
                    summary.files_written += 1;
                }
                Err(err) => {
                    warn!(season, error = %err, "roster write failed");
                    summary.warn(format!("roster {season}: {err}"));
                }
            }
        }

        let teams = collected.selected_teams(&params.team);
        if teams.is_empty() {
            warn!(season, filter = ?params.team, "no team in the season matches the filter");
            summary.warn(format!("season {season}: no team matches {:?}", params.team));
        }

        let mut cache = FixtureDetailCache::new();
        for team in &teams {
            match self.run_unit(collected, team, params.with_stats, &mut cache, summary) {
                Ok(report) => {
                    summary.units_written += 1;
                    summary.files_written += 1;
                    summary.fixture_rows += report.fixture_rows;
                    summary.event_rows += report.event_rows;
                    if let Some(err) = report.row_error {
                        summary.warn(format!("{} {season} rows: {err}", team.slug));
                    }
                }
                Err(err) => {
                    warn!(team = %team.slug, season, error = %err, "unit skipped, previous snapshot kept");
                    summary.units_skipped += 1;
                    summary.warn(format!("{} {season}: {err}", team.slug));
                }
            }
        }
    }

    fn run_unit(
        &mut self,
        collected: &SeasonFixtures,
        team: &TeamIdentity,
        with_stats: bool,
        cache: &mut FixtureDetailCache,
        summary: &mut RunSummary,
    ) -> Result<SinkReport, PersistenceError> {
        let season: Season = collected.season;
        let fixtures = collected.for_team(team.canonical_id);

        let unit = if with_stats {
            let mut fetcher = EventFetcher::new(&mut self.provider, &self.resolver, cache);
            let source: &mut dyn GoalEventSource = &mut fetcher;
            aggregate_unit(team.canonical_id, &fixtures, Some(source))
        } else {
            aggregate_unit(team.canonical_id, &fixtures, None)
        };
        if let Some(reason @ FallbackReason::FetchFailed { .. }) = &unit.fallback {
            summary.warn(format!("{} {season}: {reason}", team.slug));
        }

        let mut stats = HashMap::new();
        if with_stats {
            for fixture in &fixtures {
                if let Some(found) = fetch_fixture_stats(&mut self.provider, cache, fixture) {
                    stats.insert(fixture.id, found);
                }
            }
        }

        let snapshots = self.sink.snapshots();
        let mut scorer_source = cache.scorer_source(&mut self.provider);
        let scorers = top_scorers(&mut scorer_source, team, season, || {
            snapshots.read_scorers(&team.slug, season)
        });
        if scorers.is_soft_warning() {
            summary.warn(format!("{} {season}: no scorers available", team.slug));
        }

        let snapshot = TeamSeasonSnapshot {
            team: team.clone(),
            season,
            aggregate: unit.aggregate,
            fixtures,
            scorers: scorers.records,
            goal_events: unit.goal_events,
            stats,
        };
        let report = self.sink.persist(&snapshot)?;
        info!(
            team = %team.slug,
            season,
            fixtures = snapshot.fixtures.len(),
            by_time = snapshot.aggregate.by_time_available(),
            "unit written"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::identity::IdentityTable;
    use crate::snapshot::SnapshotWriter;
    use crate::testing::{MemoryStore, ScriptedProvider};

    #[test]
    fn invalid_params_fail_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(ProviderKind::ApiSports);
        let sink = PersistenceSink::new(SnapshotWriter::new(dir.path()), None);
        let mut pipeline = Pipeline::new(provider, TeamResolver::new(IdentityTable::builtin()), sink);
        let params = RunParams {
            seasons: vec![1990],
            ..RunParams::default()
        };
        assert!(matches!(pipeline.run(&params), Err(PipelineError::Validation(_))));
        assert_eq!(pipeline.provider().calls(), 0);
    }

    #[test]
    fn empty_season_is_recorded_in_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(ProviderKind::ApiSports).respond(
            "/fixtures?league=39&season=2024&status=FT-AET-PEN",
            json!({ "errors": [], "response": [] }),
        );
        let store = MemoryStore::new();
        let sink = PersistenceSink::new(SnapshotWriter::new(dir.path()), Some(Box::new(store.clone())));
        let mut pipeline = Pipeline::new(provider, TeamResolver::new(IdentityTable::builtin()), sink);
        let summary = pipeline.run(&RunParams::default()).unwrap();
        assert_eq!(summary.units_written, 0);
        assert_eq!(summary.seasons_skipped, 0);
        assert_eq!(summary.api_calls, 1);
        assert_eq!(store.runs().len(), 1);
    }
}
