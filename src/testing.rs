//! In-process doubles for the provider, the row store and the goal-event
//! source, plus small builders for fixtures and events. Nothing here touches
//! the network or the wall clock.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::aggregate::GoalEventSource;
use crate::error::{PersistenceError, ProviderError};
use crate::model::{Fixture, FixtureId, GoalEvent, GoalKind, Score, TeamId, TeamSide};
use crate::pipeline::RunSummary;
use crate::provider::{Provider, ProviderKind, check_envelope};
use crate::store::{FixtureRow, GoalEventRow, RowStore};

pub use crate::rate_limit::Unthrottled;

#[derive(Debug, Clone)]
enum Scripted {
    Body(Value),
    Status(u16),
}

/// Provider that answers from a path-keyed script. Unscripted paths are 404s.
/// Bodies go through the same envelope check as live responses.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    kind: ProviderKind,
    responses: HashMap<String, Scripted>,
    requests: Vec<String>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            responses: HashMap::new(),
            requests: Vec::new(),
        }
    }

    pub fn respond(mut self, path: impl Into<String>, body: Value) -> Self {
        self.responses.insert(path.into(), Scripted::Body(body));
        self
    }

    pub fn fail(mut self, path: impl Into<String>, status: u16) -> Self {
        self.responses.insert(path.into(), Scripted::Status(status));
        self
    }

    /// Every path requested, in order.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    pub fn requests_to(&self, path: &str) -> usize {
        self.requests.iter().filter(|p| p.as_str() == path).count()
    }
}

impl Provider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn fetch(&mut self, path: &str) -> Result<Value, ProviderError> {
        self.requests.push(path.to_string());
        match self.responses.get(path) {
            Some(Scripted::Body(body)) => check_envelope(self.kind, path, body.clone()),
            Some(Scripted::Status(status)) => Err(ProviderError::Http {
                status: *status,
                path: path.to_string(),
            }),
            None => Err(ProviderError::Http {
                status: 404,
                path: path.to_string(),
            }),
        }
    }

    fn calls(&self) -> usize {
        self.requests.len()
    }
}

#[derive(Debug, Default)]
struct MemoryRows {
    fixtures: BTreeMap<FixtureId, FixtureRow>,
    events: BTreeMap<(FixtureId, u32), GoalEventRow>,
    runs: Vec<RunSummary>,
    failing: bool,
}

/// Keyed in-memory row store. Clones share the same rows, so a test can keep
/// one handle while the sink owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Rc<RefCell<MemoryRows>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upsert fails, as a locked or corrupt database would.
    pub fn failing() -> Self {
        let store = Self::default();
        store.rows.borrow_mut().failing = true;
        store
    }

    pub fn fixture_count(&self) -> usize {
        self.rows.borrow().fixtures.len()
    }

    pub fn event_count(&self) -> usize {
        self.rows.borrow().events.len()
    }

    pub fn fixture(&self, id: FixtureId) -> Option<FixtureRow> {
        self.rows.borrow().fixtures.get(&id).cloned()
    }

    pub fn events(&self) -> Vec<GoalEventRow> {
        self.rows.borrow().events.values().cloned().collect()
    }

    pub fn runs(&self) -> Vec<RunSummary> {
        self.rows.borrow().runs.clone()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.rows.borrow().failing {
            return Err(PersistenceError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        Ok(())
    }
}

impl RowStore for MemoryStore {
    fn upsert_fixtures(&mut self, rows: &[FixtureRow]) -> Result<usize, PersistenceError> {
        self.check()?;
        let mut inner = self.rows.borrow_mut();
        for row in rows {
            inner.fixtures.insert(row.fixture_id, row.clone());
        }
        Ok(rows.len())
    }

    fn upsert_goal_events(&mut self, rows: &[GoalEventRow]) -> Result<usize, PersistenceError> {
        self.check()?;
        let mut inner = self.rows.borrow_mut();
        for row in rows {
            inner.events.insert((row.fixture_id, row.seq), row.clone());
        }
        Ok(rows.len())
    }

    fn record_run(&mut self, summary: &RunSummary) -> Result<(), PersistenceError> {
        self.rows.borrow_mut().runs.push(summary.clone());
        Ok(())
    }
}

/// Goal-event source backed by a map, with per-fixture failures.
#[derive(Debug, Clone)]
pub struct MapEventSource {
    events: HashMap<FixtureId, Vec<GoalEvent>>,
    failing: HashSet<FixtureId>,
    available: bool,
    calls: usize,
}

impl Default for MapEventSource {
    fn default() -> Self {
        Self {
            events: HashMap::new(),
            failing: HashSet::new(),
            available: true,
            calls: 0,
        }
    }
}

impl MapEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fixture_id: FixtureId, events: Vec<GoalEvent>) -> Self {
        self.events.insert(fixture_id, events);
        self
    }

    pub fn failing(mut self, fixture_id: FixtureId) -> Self {
        self.failing.insert(fixture_id);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl GoalEventSource for MapEventSource {
    fn available(&self) -> bool {
        self.available
    }

    fn goal_events(&mut self, fixture: &Fixture) -> Result<Vec<GoalEvent>, ProviderError> {
        self.calls += 1;
        if self.failing.contains(&fixture.id) {
            return Err(ProviderError::Http {
                status: 500,
                path: format!("/fixtures/events?fixture={}", fixture.id),
            });
        }
        Ok(self.events.get(&fixture.id).cloned().unwrap_or_default())
    }
}

/// Finished fixture kicking off `day` days after 2024-08-01 15:00 UTC.
/// Provider IDs equal canonical IDs.
pub fn fixture(
    id: FixtureId,
    day: u32,
    home: (TeamId, &str),
    away: (TeamId, &str),
    fulltime: (u8, u8),
    halftime: Option<(u8, u8)>,
) -> Fixture {
    const AUG_1_2024_1500: i64 = 1_722_524_400;
    let kickoff = DateTime::<Utc>::from_timestamp(AUG_1_2024_1500 + i64::from(day) * 86_400, 0)
        .unwrap_or_default();
    Fixture {
        id,
        season: 2024,
        kickoff,
        status: "FT".to_string(),
        home: TeamSide {
            id: home.0,
            provider_id: home.0,
            name: home.1.to_string(),
        },
        away: TeamSide {
            id: away.0,
            provider_id: away.0,
            name: away.1.to_string(),
        },
        fulltime: Score::new(fulltime.0, fulltime.1),
        halftime: halftime.map(|(h, a)| Score::new(h, a)),
    }
}

/// Regular-time normal goal.
pub fn goal(fixture_id: FixtureId, seq: u32, team_id: TeamId, minute: u16) -> GoalEvent {
    GoalEvent {
        fixture_id,
        seq,
        team_id,
        minute,
        extra: None,
        kind: GoalKind::Normal,
        detail: "Normal Goal".to_string(),
        player: None,
    }
}
