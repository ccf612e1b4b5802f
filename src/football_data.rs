use serde_json::Value;

use crate::model::{FixtureId, ScorerRecord, Season, SideStats};
use crate::payload::{as_u32_any, as_u64_any, parse_kickoff, score_pair, str_field};
use crate::provider::{Dialect, RawFixture, RawGoalEvent, RawSide, ScorerPage};

const COMPETITION: &str = "PL";
const SCORER_LIMIT: u32 = 100;

/// football-data.org v4. The free tier has no events, no match statistics and
/// only a competition-wide scorer leaderboard.
pub struct FootballData;

impl Dialect for FootballData {
    fn season_fixtures_path(&self, season: Season) -> String {
        format!("/competitions/{COMPETITION}/matches?season={season}&status=FINISHED")
    }

    fn team_fixtures_path(&self, provider_team_id: u32, season: Season) -> String {
        format!(
            "/teams/{provider_team_id}/matches?season={season}&status=FINISHED&competitions={COMPETITION}"
        )
    }

    fn parse_fixtures(&self, body: &Value) -> Result<Vec<RawFixture>, String> {
        let items = body
            .get("matches")
            .and_then(|v| v.as_array())
            .ok_or_else(|| "missing matches array".to_string())?;
        Ok(items.iter().filter_map(parse_match).collect())
    }

    fn goal_events_path(&self, _fixture_id: FixtureId) -> Option<String> {
        None
    }

    fn parse_goal_events(&self, _body: &Value) -> Vec<RawGoalEvent> {
        Vec::new()
    }

    fn fixture_stats_path(&self, _fixture_id: FixtureId) -> Option<String> {
        None
    }

    fn parse_fixture_stats(&self, _body: &Value) -> Vec<(u32, SideStats)> {
        Vec::new()
    }

    fn scorers_path(&self, _provider_team_id: u32, season: Season, _page: u32) -> String {
        format!("/competitions/{COMPETITION}/scorers?season={season}&limit={SCORER_LIMIT}")
    }

    fn parse_scorer_page(&self, body: &Value, provider_team_id: u32) -> ScorerPage {
        let rows = body
            .get("scorers")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter(|item| {
                        item.get("team")
                            .and_then(|t| t.get("id"))
                            .and_then(as_u32_any)
                            == Some(provider_team_id)
                    })
                    .filter_map(parse_scorer_row)
                    .collect()
            })
            .unwrap_or_default();
        // Single leaderboard, never paged.
        ScorerPage {
            rows,
            current: 1,
            total: 1,
        }
    }

    fn envelope_error(&self, body: &Value) -> Option<String> {
        let code = body.get("errorCode")?;
        let message = str_field(body, "message").unwrap_or_else(|| "unknown error".to_string());
        Some(format!("{code}: {message}"))
    }

    fn logo_url(&self, provider_team_id: u32) -> Option<String> {
        Some(format!("https://crests.football-data.org/{provider_team_id}.png"))
    }
}

fn parse_side(v: &Value) -> Option<RawSide> {
    Some(RawSide {
        id: as_u32_any(v.get("id")?)?,
        name: str_field(v, "name").or_else(|| str_field(v, "shortName"))?,
        logo: str_field(v, "crest"),
    })
}

fn parse_match(v: &Value) -> Option<RawFixture> {
    let id = as_u64_any(v.get("id")?)?;
    let kickoff = parse_kickoff(v.get("utcDate")?.as_str()?)?;
    let status = str_field(v, "status").unwrap_or_default();
    let home = parse_side(v.get("homeTeam")?)?;
    let away = parse_side(v.get("awayTeam")?)?;
    let score = v.get("score");
    let fulltime = score.and_then(|s| s.get("fullTime")).and_then(score_pair);
    let halftime = score.and_then(|s| s.get("halfTime")).and_then(score_pair);
    Some(RawFixture {
        id,
        kickoff,
        status,
        home,
        away,
        fulltime,
        halftime,
    })
}

fn parse_scorer_row(v: &Value) -> Option<ScorerRecord> {
    let player = v.get("player")?;
    let count = |key: &str| v.get(key).and_then(as_u32_any).unwrap_or(0);
    Some(ScorerRecord {
        id: as_u64_any(player.get("id")?)?,
        name: str_field(player, "name")?,
        photo: None,
        goals: count("goals"),
        assists: count("assists"),
        appearances: count("playedMatches"),
    })
}
