use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::aggregate::GoalEventSource;
use crate::error::ProviderError;
use crate::identity::TeamResolver;
use crate::model::{Fixture, FixtureId, FixtureStats, GoalEvent, GoalKind};
use crate::provider::{Provider, ProviderKind, RawGoalEvent};

/// Per-season memo of fixture details. A fixture appears in two units (one per
/// side), so the second unit reads from here instead of spending a call.
/// Failures are never stored.
#[derive(Debug, Default)]
pub struct FixtureDetailCache {
    events: HashMap<FixtureId, Vec<GoalEvent>>,
    stats: HashMap<FixtureId, FixtureStats>,
    scorer_bodies: HashMap<String, Value>,
}

impl FixtureDetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_events(&self) -> usize {
        self.events.len()
    }

    /// Provider view that answers repeated scorer paths from this cache.
    pub fn scorer_source<'a, P: Provider + ?Sized>(
        &'a mut self,
        provider: &'a mut P,
    ) -> CachedScorers<'a, P> {
        CachedScorers {
            provider,
            bodies: &mut self.scorer_bodies,
        }
    }
}

/// football-data serves one leaderboard for the whole competition, so every
/// unit of a season asks for the same path.
pub struct CachedScorers<'a, P: Provider + ?Sized> {
    provider: &'a mut P,
    bodies: &'a mut HashMap<String, Value>,
}

impl<P: Provider + ?Sized> Provider for CachedScorers<'_, P> {
    fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    fn fetch(&mut self, path: &str) -> Result<Value, ProviderError> {
        if let Some(body) = self.bodies.get(path) {
            debug!(path, "scorer page from season cache");
            return Ok(body.clone());
        }
        let body = self.provider.fetch(path)?;
        self.bodies.insert(path.to_string(), body.clone());
        Ok(body)
    }

    fn calls(&self) -> usize {
        self.provider.calls()
    }
}

pub struct EventFetcher<'a, P: Provider + ?Sized> {
    provider: &'a mut P,
    resolver: &'a TeamResolver,
    cache: &'a mut FixtureDetailCache,
}

impl<'a, P: Provider + ?Sized> EventFetcher<'a, P> {
    pub fn new(
        provider: &'a mut P,
        resolver: &'a TeamResolver,
        cache: &'a mut FixtureDetailCache,
    ) -> Self {
        Self {
            provider,
            resolver,
            cache,
        }
    }

    fn to_goal_event(&self, fixture: &Fixture, raw: RawGoalEvent) -> GoalEvent {
        let team_id = if raw.provider_team_id == fixture.home.provider_id {
            fixture.home.id
        } else if raw.provider_team_id == fixture.away.provider_id {
            fixture.away.id
        } else {
            self.resolver
                .resolve(self.provider.kind(), raw.provider_team_id, &raw.team_name)
        };
        GoalEvent {
            fixture_id: fixture.id,
            seq: raw.seq,
            team_id,
            minute: raw.minute,
            extra: raw.extra,
            kind: GoalKind::from_detail(&raw.detail),
            detail: raw.detail,
            player: raw.player,
        }
    }
}

impl<P: Provider + ?Sized> GoalEventSource for EventFetcher<'_, P> {
    fn available(&self) -> bool {
        self.provider.dialect().goal_events_path(0).is_some()
    }

    fn goal_events(&mut self, fixture: &Fixture) -> Result<Vec<GoalEvent>, ProviderError> {
        if let Some(events) = self.cache.events.get(&fixture.id) {
            return Ok(events.clone());
        }
        let dialect = self.provider.dialect();
        let Some(path) = dialect.goal_events_path(fixture.id) else {
            return Ok(Vec::new());
        };
        let body = self.provider.fetch(&path)?;
        let events = dialect
            .parse_goal_events(&body)
            .into_iter()
            .map(|raw| self.to_goal_event(fixture, raw))
            .collect::<Vec<_>>();
        self.cache.events.insert(fixture.id, events.clone());
        Ok(events)
    }
}

/// Match statistics are decoration: a failed fetch is logged and skipped.
pub fn fetch_fixture_stats<P: Provider + ?Sized>(
    provider: &mut P,
    cache: &mut FixtureDetailCache,
    fixture: &Fixture,
) -> Option<FixtureStats> {
    if let Some(stats) = cache.stats.get(&fixture.id) {
        return Some(stats.clone());
    }
    let dialect = provider.dialect();
    let path = dialect.fixture_stats_path(fixture.id)?;
    let body = match provider.fetch(&path) {
        Ok(body) => body,
        Err(err) => {
            warn!(fixture_id = fixture.id, error = %err, "fixture statistics unavailable");
            return None;
        }
    };

    let mut stats = FixtureStats::default();
    for (provider_team_id, side) in dialect.parse_fixture_stats(&body) {
        if provider_team_id == fixture.home.provider_id {
            stats.home = Some(side);
        } else if provider_team_id == fixture.away.provider_id {
            stats.away = Some(side);
        }
    }
    cache.stats.insert(fixture.id, stats.clone());
    Some(stats)
}
