use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::model::{Fixture, FixtureId, FormResult, GoalEvent, TeamId, Venue};

pub const BUCKET_COUNT: usize = 6;
pub const RECENT_FORM_LEN: usize = 5;

/// Six fixed minute ranges partitioning `[1, inf)`. The last one absorbs all
/// stoppage time of the second half; first-half stoppage goals carry elapsed
/// minute 45 and stay in `31-45`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodBucket {
    Opening,
    FirstQuarterHour,
    FirstHalfClose,
    SecondHalfOpening,
    SecondQuarterHour,
    Closing,
}

impl PeriodBucket {
    pub const ALL: [PeriodBucket; BUCKET_COUNT] = [
        PeriodBucket::Opening,
        PeriodBucket::FirstQuarterHour,
        PeriodBucket::FirstHalfClose,
        PeriodBucket::SecondHalfOpening,
        PeriodBucket::SecondQuarterHour,
        PeriodBucket::Closing,
    ];

    pub fn of(minute: u16) -> Self {
        match minute {
            0..=15 => PeriodBucket::Opening,
            16..=30 => PeriodBucket::FirstQuarterHour,
            31..=45 => PeriodBucket::FirstHalfClose,
            46..=60 => PeriodBucket::SecondHalfOpening,
            61..=75 => PeriodBucket::SecondQuarterHour,
            _ => PeriodBucket::Closing,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Inclusive bounds; the last bucket is open-ended.
    pub fn range(self) -> (u16, Option<u16>) {
        match self {
            PeriodBucket::Opening => (1, Some(15)),
            PeriodBucket::FirstQuarterHour => (16, Some(30)),
            PeriodBucket::FirstHalfClose => (31, Some(45)),
            PeriodBucket::SecondHalfOpening => (46, Some(60)),
            PeriodBucket::SecondQuarterHour => (61, Some(75)),
            PeriodBucket::Closing => (76, None),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PeriodBucket::Opening => "0-15",
            PeriodBucket::FirstQuarterHour => "16-30",
            PeriodBucket::FirstHalfClose => "31-45",
            PeriodBucket::SecondHalfOpening => "46-60",
            PeriodBucket::SecondQuarterHour => "61-75",
            PeriodBucket::Closing => "76-90+",
        }
    }
}

pub fn bucket_of(minute: u16) -> PeriodBucket {
    PeriodBucket::of(minute)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct BucketCounts([u32; BUCKET_COUNT]);

impl BucketCounts {
    pub fn from_array(counts: [u32; BUCKET_COUNT]) -> Self {
        Self(counts)
    }

    pub fn get(&self, bucket: PeriodBucket) -> u32 {
        self.0[bucket.index()]
    }

    pub fn as_array(&self) -> &[u32; BUCKET_COUNT] {
        &self.0
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    fn add(&mut self, bucket: PeriodBucket) {
        self.0[bucket.index()] += 1;
    }

    fn combined(&self, other: &BucketCounts) -> BucketCounts {
        let mut out = [0u32; BUCKET_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[i] + other.0[i];
        }
        BucketCounts(out)
    }
}

/// Home and away counts; the "all" view is always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VenueSplit {
    pub home: BucketCounts,
    pub away: BucketCounts,
}

impl VenueSplit {
    pub fn all(&self) -> BucketCounts {
        self.home.combined(&self.away)
    }

    pub fn venue(&self, venue: Venue) -> &BucketCounts {
        match venue {
            Venue::Home => &self.home,
            Venue::Away => &self.away,
        }
    }

    fn record(&mut self, venue: Venue, bucket: PeriodBucket) {
        match venue {
            Venue::Home => self.home.add(bucket),
            Venue::Away => self.away.add(bucket),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Scored,
    Conceded,
}

pub trait GoalSummary {
    fn total(&self, metric: Metric) -> u32;

    /// Most recent first, at most five entries.
    fn recent_form(&self) -> &[FormResult];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedAggregate {
    pub scored: VenueSplit,
    pub conceded: VenueSplit,
    pub recent_form: Vec<FormResult>,
}

impl TimedAggregate {
    pub fn split(&self, metric: Metric) -> &VenueSplit {
        match metric {
            Metric::Scored => &self.scored,
            Metric::Conceded => &self.conceded,
        }
    }
}

impl GoalSummary for TimedAggregate {
    fn total(&self, metric: Metric) -> u32 {
        self.split(metric).all().total()
    }

    fn recent_form(&self) -> &[FormResult] {
        &self.recent_form
    }
}

/// First/second half goals derived from halftime scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HalfSplit {
    pub scored: [u32; 2],
    pub conceded: [u32; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsOnlyAggregate {
    pub scored: u32,
    pub conceded: u32,
    /// Present only when every fixture carried a halftime score.
    pub halves: Option<HalfSplit>,
    pub recent_form: Vec<FormResult>,
}

impl GoalSummary for TotalsOnlyAggregate {
    fn total(&self, metric: Metric) -> u32 {
        match metric {
            Metric::Scored => self.scored,
            Metric::Conceded => self.conceded,
        }
    }

    fn recent_form(&self) -> &[FormResult] {
        &self.recent_form
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonAggregate {
    Timed(TimedAggregate),
    TotalsOnly(TotalsOnlyAggregate),
}

impl SeasonAggregate {
    pub fn by_time_available(&self) -> bool {
        matches!(self, SeasonAggregate::Timed(_))
    }

    pub fn buckets(&self, metric: Metric) -> Option<&VenueSplit> {
        match self {
            SeasonAggregate::Timed(timed) => Some(timed.split(metric)),
            SeasonAggregate::TotalsOnly(_) => None,
        }
    }
}

impl GoalSummary for SeasonAggregate {
    fn total(&self, metric: Metric) -> u32 {
        match self {
            SeasonAggregate::Timed(timed) => timed.total(metric),
            SeasonAggregate::TotalsOnly(totals) => totals.total(metric),
        }
    }

    fn recent_form(&self) -> &[FormResult] {
        match self {
            SeasonAggregate::Timed(timed) => timed.recent_form(),
            SeasonAggregate::TotalsOnly(totals) => totals.recent_form(),
        }
    }
}

/// Supplier of per-fixture goal events for the event-level strategy.
pub trait GoalEventSource {
    fn available(&self) -> bool;

    fn goal_events(&mut self, fixture: &Fixture) -> Result<Vec<GoalEvent>, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    Disabled,
    Unavailable,
    FetchFailed { fixture_id: FixtureId, message: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Disabled => f.write_str("event fetch disabled"),
            FallbackReason::Unavailable => f.write_str("provider has no event data"),
            FallbackReason::FetchFailed {
                fixture_id,
                message,
            } => write!(f, "events for fixture {fixture_id} failed: {message}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitAggregate {
    pub aggregate: SeasonAggregate,
    /// Every goal-typed event fetched, allow-listed or not. Empty on fallback.
    pub goal_events: Vec<GoalEvent>,
    pub fallback: Option<FallbackReason>,
}

/// Picks one strategy for the whole unit. A failed event-level pass is thrown
/// away entirely before the score-only pass runs.
pub fn aggregate_unit(
    team: TeamId,
    fixtures: &[Fixture],
    source: Option<&mut dyn GoalEventSource>,
) -> UnitAggregate {
    let fallback = match source {
        None => FallbackReason::Disabled,
        Some(source) if !source.available() => FallbackReason::Unavailable,
        Some(source) => match aggregate_timed(team, fixtures, source) {
            Ok((timed, goal_events)) => {
                return UnitAggregate {
                    aggregate: SeasonAggregate::Timed(timed),
                    goal_events,
                    fallback: None,
                };
            }
            Err((fixture_id, err)) => {
                warn!(team, fixture_id, error = %err, "event-level aggregation abandoned, using scores only");
                FallbackReason::FetchFailed {
                    fixture_id,
                    message: err.to_string(),
                }
            }
        },
    };
    debug!(team, reason = %fallback, "score-only aggregation");
    UnitAggregate {
        aggregate: SeasonAggregate::TotalsOnly(aggregate_totals(team, fixtures)),
        goal_events: Vec::new(),
        fallback: Some(fallback),
    }
}

pub fn aggregate_timed(
    team: TeamId,
    fixtures: &[Fixture],
    source: &mut dyn GoalEventSource,
) -> Result<(TimedAggregate, Vec<GoalEvent>), (FixtureId, ProviderError)> {
    let mut scored = VenueSplit::default();
    let mut conceded = VenueSplit::default();
    let mut kept = Vec::new();

    for fixture in fixtures {
        let Some(venue) = fixture.venue_of(team) else {
            continue;
        };
        let events = source
            .goal_events(fixture)
            .map_err(|err| (fixture.id, err))?;
        for event in events {
            if event.kind.is_counted() {
                let bucket = bucket_of(event.minute);
                if event.team_id == team {
                    scored.record(venue, bucket);
                } else {
                    conceded.record(venue, bucket);
                }
            }
            kept.push(event);
        }
    }

    let timed = TimedAggregate {
        scored,
        conceded,
        recent_form: recent_form(team, fixtures),
    };
    Ok((timed, kept))
}

pub fn aggregate_totals(team: TeamId, fixtures: &[Fixture]) -> TotalsOnlyAggregate {
    let mut scored = 0u32;
    let mut conceded = 0u32;
    let mut halves = Some(HalfSplit::default());

    for fixture in fixtures {
        let Some(venue) = fixture.venue_of(team) else {
            continue;
        };
        let (ft_for, ft_against) = fixture.fulltime.from_side(venue);
        scored += ft_for;
        conceded += ft_against;

        halves = match (halves, fixture.halftime) {
            (Some(mut split), Some(halftime)) => {
                let (ht_for, ht_against) = halftime.from_side(venue);
                split.scored[0] += ht_for;
                split.scored[1] += ft_for.saturating_sub(ht_for);
                split.conceded[0] += ht_against;
                split.conceded[1] += ft_against.saturating_sub(ht_against);
                Some(split)
            }
            _ => None,
        };
    }

    TotalsOnlyAggregate {
        scored,
        conceded,
        halves,
        recent_form: recent_form(team, fixtures),
    }
}

pub fn recent_form(team: TeamId, fixtures: &[Fixture]) -> Vec<FormResult> {
    let mut ordered = fixtures
        .iter()
        .filter(|fixture| fixture.involves(team))
        .collect::<Vec<_>>();
    ordered.sort_by(|a, b| b.kickoff.cmp(&a.kickoff).then(b.id.cmp(&a.id)));
    ordered
        .into_iter()
        .filter_map(|fixture| fixture.result_for(team))
        .take(RECENT_FORM_LEN)
        .collect()
}
