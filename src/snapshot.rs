use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    BUCKET_COUNT, BucketCounts, GoalSummary, Metric, PeriodBucket, SeasonAggregate,
};
use crate::error::PersistenceError;
use crate::model::{
    Fixture, FixtureId, FixtureStats, FormResult, GoalEvent, ScorerRecord, Season, SideStats,
    TeamId, TeamIdentity,
};

/// Everything computed for one (team, season) unit.
#[derive(Debug, Clone)]
pub struct TeamSeasonSnapshot {
    pub team: TeamIdentity,
    pub season: Season,
    pub aggregate: SeasonAggregate,
    /// Most recent first.
    pub fixtures: Vec<Fixture>,
    pub scorers: Vec<ScorerRecord>,
    pub goal_events: Vec<GoalEvent>,
    pub stats: HashMap<FixtureId, FixtureStats>,
}

impl TeamSeasonSnapshot {
    pub fn file_name(&self) -> String {
        snapshot_file_name(&self.team.slug, self.season)
    }

    pub fn to_document(&self, generated_at: DateTime<Utc>) -> SnapshotDocument {
        let split = |metric: Metric| self.aggregate.buckets(metric);
        let scored = MetricDocument {
            total: Some(self.aggregate.total(Metric::Scored)),
            by_time: split(Metric::Scored).map(|s| *s.all().as_array()),
        };
        let conceded = MetricDocument {
            total: Some(self.aggregate.total(Metric::Conceded)),
            by_time: split(Metric::Conceded).map(|s| *s.all().as_array()),
        };

        let halves = match &self.aggregate {
            SeasonAggregate::TotalsOnly(totals) => totals.halves.map(|h| HalvesDocument {
                scored: h.scored,
                conceded: h.conceded,
            }),
            SeasonAggregate::Timed(_) => None,
        };

        SnapshotDocument {
            team_id: self.team.canonical_id,
            slug: self.team.slug.clone(),
            name: self.team.name.clone(),
            season: self.season,
            by_time_available: self.aggregate.by_time_available(),
            periods: PeriodBucket::ALL.iter().map(|b| b.label().to_string()).collect(),
            scored,
            conceded,
            home: VenueDocument {
                scored: metric_doc(split(Metric::Scored).map(|s| s.home)),
                conceded: metric_doc(split(Metric::Conceded).map(|s| s.home)),
            },
            away: VenueDocument {
                scored: metric_doc(split(Metric::Scored).map(|s| s.away)),
                conceded: metric_doc(split(Metric::Conceded).map(|s| s.away)),
            },
            halves,
            recent_form: self.aggregate.recent_form().to_vec(),
            scorers: self.scorers.clone(),
            fixtures: self
                .fixtures
                .iter()
                .map(|fixture| {
                    FixtureDocument::new(fixture, self.team.canonical_id, self.stats.get(&fixture.id))
                })
                .collect(),
            generated_at: generated_at.to_rfc3339(),
        }
    }
}

fn metric_doc(counts: Option<BucketCounts>) -> MetricDocument {
    match counts {
        Some(counts) => MetricDocument {
            total: Some(counts.total()),
            by_time: Some(*counts.as_array()),
        },
        None => MetricDocument::default(),
    }
}

pub fn snapshot_file_name(slug: &str, season: Season) -> String {
    format!("{slug}-{season}.json")
}

pub fn roster_file_name(season: Season) -> String {
    format!("pl-teams-{season}.json")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDocument {
    pub total: Option<u32>,
    pub by_time: Option<[u32; BUCKET_COUNT]>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueDocument {
    pub scored: MetricDocument,
    pub conceded: MetricDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalvesDocument {
    pub scored: [u32; 2],
    pub conceded: [u32; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureDocument {
    pub id: FixtureId,
    pub season: Season,
    pub team_id: TeamId,
    pub match_date: String,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_team_name: String,
    pub away_team_name: String,
    pub goals_home: u8,
    pub goals_away: u8,
    pub ht_home: Option<u8>,
    pub ht_away: Option<u8>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_home: Option<SideStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_away: Option<SideStats>,
}

impl FixtureDocument {
    fn new(fixture: &Fixture, team_id: TeamId, stats: Option<&FixtureStats>) -> Self {
        Self {
            id: fixture.id,
            season: fixture.season,
            team_id,
            match_date: fixture.kickoff.to_rfc3339(),
            home_team_id: fixture.home.id,
            away_team_id: fixture.away.id,
            home_team_name: fixture.home.name.clone(),
            away_team_name: fixture.away.name.clone(),
            goals_home: fixture.fulltime.home,
            goals_away: fixture.fulltime.away,
            ht_home: fixture.halftime.map(|s| s.home),
            ht_away: fixture.halftime.map(|s| s.away),
            status: fixture.status.clone(),
            stats_home: stats.and_then(|s| s.home.clone()),
            stats_away: stats.and_then(|s| s.away.clone()),
        }
    }
}

/// On-disk shape of one team-season snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub team_id: TeamId,
    pub slug: String,
    pub name: String,
    pub season: Season,
    pub by_time_available: bool,
    pub periods: Vec<String>,
    pub scored: MetricDocument,
    pub conceded: MetricDocument,
    pub home: VenueDocument,
    pub away: VenueDocument,
    pub halves: Option<HalvesDocument>,
    pub recent_form: Vec<FormResult>,
    pub scorers: Vec<ScorerRecord>,
    pub fixtures: Vec<FixtureDocument>,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: TeamId,
    pub name: String,
    pub short_name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub has_data: bool,
}

impl From<&TeamIdentity> for RosterEntry {
    fn from(team: &TeamIdentity) -> Self {
        Self {
            id: team.canonical_id,
            name: team.name.clone(),
            short_name: team.name.clone(),
            slug: team.slug.clone(),
            logo: team.logo.clone(),
            has_data: true,
        }
    }
}

/// Only the part of an old snapshot the pipeline ever reads back.
#[derive(Debug, Deserialize)]
struct PreviousSnapshot {
    #[serde(default)]
    scorers: Vec<ScorerRecord>,
}

#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    out_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn snapshot_path(&self, slug: &str, season: Season) -> PathBuf {
        self.out_dir.join(snapshot_file_name(slug, season))
    }

    pub fn write(&self, snapshot: &TeamSeasonSnapshot) -> Result<PathBuf, PersistenceError> {
        let path = self.out_dir.join(snapshot.file_name());
        let json = serde_json::to_string_pretty(&snapshot.to_document(Utc::now()))?;
        write_atomic(&path, &json)?;
        Ok(path)
    }

    pub fn write_roster(
        &self,
        season: Season,
        roster: &[TeamIdentity],
    ) -> Result<PathBuf, PersistenceError> {
        let path = self.out_dir.join(roster_file_name(season));
        let entries = roster.iter().map(RosterEntry::from).collect::<Vec<_>>();
        let json = serde_json::to_string_pretty(&entries)?;
        write_atomic(&path, &json)?;
        Ok(path)
    }

    /// Missing or unreadable snapshots read as "no snapshot".
    pub fn read_scorers(&self, slug: &str, season: Season) -> Option<Vec<ScorerRecord>> {
        let raw = fs::read_to_string(self.snapshot_path(slug, season)).ok()?;
        let previous = serde_json::from_str::<PreviousSnapshot>(&raw).ok()?;
        Some(previous.scorers)
    }

    pub fn read_document(&self, slug: &str, season: Season) -> Option<SnapshotDocument> {
        let raw = fs::read_to_string(self.snapshot_path(slug, season)).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
