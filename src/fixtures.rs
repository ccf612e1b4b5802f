use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::error::{ProviderError, ValidationError};
use crate::identity::TeamResolver;
use crate::model::{Fixture, Season, TeamId, TeamIdentity, TeamSide};
use crate::provider::{Provider, ProviderKind, RawFixture};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixtureStrategy {
    /// One competition-wide call per season.
    #[default]
    Bulk,
    /// One call per known team, for providers without a usable bulk endpoint.
    PerTeam,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TeamFilter {
    #[default]
    All,
    Slug(String),
}

impl TeamFilter {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim().to_ascii_lowercase();
        if trimmed.is_empty() || trimmed == "all" {
            return Ok(TeamFilter::All);
        }
        let valid = trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == ' ');
        if !valid {
            return Err(ValidationError::TeamFilter(raw.to_string()));
        }
        Ok(TeamFilter::Slug(trimmed))
    }

    pub fn matches(&self, slug: &str, name: &str) -> bool {
        match self {
            TeamFilter::All => true,
            TeamFilter::Slug(wanted) => slug == wanted || name.to_lowercase() == *wanted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeasonFixtures {
    pub season: Season,
    /// Kickoff descending.
    pub fixtures: Vec<Fixture>,
    /// Deduplicated by canonical ID, sorted by display name.
    pub roster: Vec<TeamIdentity>,
}

impl SeasonFixtures {
    pub fn for_team(&self, team: TeamId) -> Vec<Fixture> {
        self.fixtures
            .iter()
            .filter(|fixture| fixture.involves(team))
            .cloned()
            .collect()
    }

    pub fn selected_teams(&self, filter: &TeamFilter) -> Vec<TeamIdentity> {
        self.roster
            .iter()
            .filter(|team| filter.matches(&team.slug, &team.name))
            .cloned()
            .collect()
    }
}

pub fn collect_season<P: Provider + ?Sized>(
    provider: &mut P,
    resolver: &TeamResolver,
    season: Season,
    strategy: FixtureStrategy,
    filter: &TeamFilter,
) -> Result<SeasonFixtures, ProviderError> {
    let kind = provider.kind();
    let dialect = provider.dialect();

    let mut raw = Vec::new();
    match strategy {
        FixtureStrategy::Bulk => {
            let path = dialect.season_fixtures_path(season);
            let body = provider.fetch(&path)?;
            raw = dialect
                .parse_fixtures(&body)
                .map_err(|message| ProviderError::Decode { path, message })?;
        }
        FixtureStrategy::PerTeam => {
            let teams = resolver
                .known_teams(kind)
                .into_iter()
                .filter(|team| filter.matches(&team.slug, &team.name))
                .collect::<Vec<_>>();
            for team in teams {
                let Some(provider_id) = resolver.provider_id_for(kind, team.id) else {
                    continue;
                };
                let path = dialect.team_fixtures_path(provider_id, season);
                let body = provider.fetch(&path)?;
                let rows = dialect
                    .parse_fixtures(&body)
                    .map_err(|message| ProviderError::Decode { path, message })?;
                raw.extend(rows);
            }
        }
    }

    let collected = build_season(kind, resolver, season, raw);
    info!(
        season,
        fixtures = collected.fixtures.len(),
        teams = collected.roster.len(),
        "collected finished fixtures"
    );
    Ok(collected)
}

fn build_season(
    kind: ProviderKind,
    resolver: &TeamResolver,
    season: Season,
    raw: Vec<RawFixture>,
) -> SeasonFixtures {
    let mut seen = HashSet::new();
    let mut roster: HashMap<TeamId, TeamIdentity> = HashMap::new();
    let mut fixtures = Vec::with_capacity(raw.len());

    for row in raw {
        if !seen.insert(row.id) {
            continue;
        }
        let Some(fulltime) = row.fulltime else {
            debug!(fixture_id = row.id, "fixture without fulltime score dropped");
            continue;
        };
        let home = resolver.identity(kind, &row.home);
        let away = resolver.identity(kind, &row.away);
        fixtures.push(Fixture {
            id: row.id,
            season,
            kickoff: row.kickoff,
            status: row.status,
            home: side_of(&home),
            away: side_of(&away),
            fulltime,
            halftime: row.halftime,
        });
        roster.entry(home.canonical_id).or_insert(home);
        roster.entry(away.canonical_id).or_insert(away);
    }

    fixtures.sort_by(|a, b| b.kickoff.cmp(&a.kickoff).then(b.id.cmp(&a.id)));
    let mut roster = roster.into_values().collect::<Vec<_>>();
    roster.sort_by(|a, b| a.name.cmp(&b.name).then(a.canonical_id.cmp(&b.canonical_id)));

    SeasonFixtures {
        season,
        fixtures,
        roster,
    }
}

fn side_of(identity: &TeamIdentity) -> TeamSide {
    TeamSide {
        id: identity.canonical_id,
        provider_id: identity.provider_id,
        name: identity.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_filter_parses_all_and_slugs() {
        assert_eq!(TeamFilter::parse("all").unwrap(), TeamFilter::All);
        assert_eq!(TeamFilter::parse("").unwrap(), TeamFilter::All);
        assert_eq!(
            TeamFilter::parse("Liverpool").unwrap(),
            TeamFilter::Slug("liverpool".to_string())
        );
        assert!(TeamFilter::parse("liver/pool").is_err());
    }

    #[test]
    fn team_filter_matches_slug_or_name() {
        let filter = TeamFilter::Slug("nottm forest".to_string());
        assert!(filter.matches("nottingham-forest", "Nottm Forest"));
        let filter = TeamFilter::Slug("nottingham-forest".to_string());
        assert!(filter.matches("nottingham-forest", "Nottm Forest"));
        assert!(!filter.matches("arsenal", "Arsenal"));
    }
}
