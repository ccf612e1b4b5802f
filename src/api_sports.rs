use serde_json::Value;

use crate::model::{FixtureId, ScorerRecord, Season, SideStats};
use crate::payload::{
    as_u32_any, as_u64_any, parse_kickoff, score_pair, stat_value, str_field,
};
use crate::provider::{Dialect, RawFixture, RawGoalEvent, RawSide, ScorerPage};

const PREMIER_LEAGUE_ID: u32 = 39;
const FINISHED_STATUSES: &str = "FT-AET-PEN";
const TEAM_LOGO_URL: &str = "https://media.api-sports.io/football/teams";

/// api-sports.io (api-football v3).
pub struct ApiSports;

impl Dialect for ApiSports {
    fn season_fixtures_path(&self, season: Season) -> String {
        format!("/fixtures?league={PREMIER_LEAGUE_ID}&season={season}&status={FINISHED_STATUSES}")
    }

    fn team_fixtures_path(&self, provider_team_id: u32, season: Season) -> String {
        format!(
            "/fixtures?team={provider_team_id}&league={PREMIER_LEAGUE_ID}&season={season}&status={FINISHED_STATUSES}"
        )
    }

    fn parse_fixtures(&self, body: &Value) -> Result<Vec<RawFixture>, String> {
        let items = body
            .get("response")
            .and_then(|v| v.as_array())
            .ok_or_else(|| "missing response array".to_string())?;
        Ok(items.iter().filter_map(parse_fixture).collect())
    }

    fn goal_events_path(&self, fixture_id: FixtureId) -> Option<String> {
        Some(format!("/fixtures/events?fixture={fixture_id}"))
    }

    fn parse_goal_events(&self, body: &Value) -> Vec<RawGoalEvent> {
        let Some(items) = body.get("response").and_then(|v| v.as_array()) else {
            return Vec::new();
        };
        let goals = items.iter().filter(|item| {
            item.get("type")
                .and_then(|t| t.as_str())
                .is_some_and(|t| t.eq_ignore_ascii_case("goal"))
        });
        let mut out = Vec::new();
        for (seq, item) in goals.enumerate() {
            if let Some(event) = parse_goal_event(item, seq as u32) {
                out.push(event);
            }
        }
        out
    }

    fn fixture_stats_path(&self, fixture_id: FixtureId) -> Option<String> {
        Some(format!("/fixtures/statistics?fixture={fixture_id}"))
    }

    fn parse_fixture_stats(&self, body: &Value) -> Vec<(u32, SideStats)> {
        let Some(items) = body.get("response").and_then(|v| v.as_array()) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|entry| {
                let team_id = as_u32_any(entry.get("team")?.get("id")?)?;
                let stats = entry.get("statistics")?.as_array()?;
                Some((team_id, parse_side_stats(stats)))
            })
            .collect()
    }

    fn scorers_path(&self, provider_team_id: u32, season: Season, page: u32) -> String {
        format!(
            "/players?team={provider_team_id}&season={season}&league={PREMIER_LEAGUE_ID}&page={page}"
        )
    }

    fn parse_scorer_page(&self, body: &Value, _provider_team_id: u32) -> ScorerPage {
        let rows = body
            .get("response")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(parse_player_row).collect())
            .unwrap_or_default();
        let paging = body.get("paging");
        let current = paging
            .and_then(|p| p.get("current"))
            .and_then(as_u32_any)
            .unwrap_or(1);
        let total = paging
            .and_then(|p| p.get("total"))
            .and_then(as_u32_any)
            .unwrap_or(current);
        ScorerPage {
            rows,
            current,
            total,
        }
    }

    fn envelope_error(&self, body: &Value) -> Option<String> {
        // `errors` is `[]` on success and an object keyed by field on failure.
        let errors = body.get("errors")?.as_object()?;
        let (key, value) = errors.iter().next()?;
        let message = value
            .as_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|| value.to_string());
        Some(format!("{key}: {message}"))
    }

    fn logo_url(&self, provider_team_id: u32) -> Option<String> {
        Some(format!("{TEAM_LOGO_URL}/{provider_team_id}.png"))
    }
}

fn parse_side(v: &Value) -> Option<RawSide> {
    Some(RawSide {
        id: as_u32_any(v.get("id")?)?,
        name: str_field(v, "name")?,
        logo: str_field(v, "logo"),
    })
}

fn parse_fixture(v: &Value) -> Option<RawFixture> {
    let fixture = v.get("fixture")?;
    let id = as_u64_any(fixture.get("id")?)?;
    let kickoff = parse_kickoff(fixture.get("date")?.as_str()?)?;
    let status = fixture
        .get("status")
        .and_then(|s| str_field(s, "short"))
        .unwrap_or_default();

    let teams = v.get("teams")?;
    let home = parse_side(teams.get("home")?)?;
    let away = parse_side(teams.get("away")?)?;

    let score = v.get("score");
    let fulltime = v
        .get("goals")
        .and_then(score_pair)
        .or_else(|| score.and_then(|s| s.get("fulltime")).and_then(score_pair));
    let halftime = score.and_then(|s| s.get("halftime")).and_then(score_pair);

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

fn parse_goal_event(v: &Value, seq: u32) -> Option<RawGoalEvent> {
    let time = v.get("time")?;
    let minute = u16::try_from(as_u64_any(time.get("elapsed")?)?).ok()?;
    let extra = time
        .get("extra")
        .and_then(as_u64_any)
        .and_then(|n| u16::try_from(n).ok());
    let team = v.get("team")?;
    Some(RawGoalEvent {
        seq,
        provider_team_id: as_u32_any(team.get("id")?)?,
        team_name: str_field(team, "name").unwrap_or_default(),
        minute,
        extra,
        detail: str_field(v, "detail").unwrap_or_default(),
        player: v.get("player").and_then(|p| str_field(p, "name")),
    })
}

fn parse_side_stats(stats: &[Value]) -> SideStats {
    let get = |kind: &str| {
        stats
            .iter()
            .find(|s| s.get("type").and_then(|t| t.as_str()) == Some(kind))
            .and_then(|s| s.get("value"))
            .and_then(stat_value)
    };
    SideStats {
        shots_on_goal: get("Shots on Goal"),
        shots_off_goal: get("Shots off Goal"),
        total_shots: get("Total Shots"),
        blocked_shots: get("Blocked Shots"),
        corners: get("Corner Kicks"),
        possession: get("Ball Possession"),
        fouls: get("Fouls"),
        yellow_cards: get("Yellow Cards"),
        red_cards: get("Red Cards"),
        saves: get("Goalkeeper Saves"),
        total_passes: get("Total passes"),
        pass_accuracy: get("Passes %"),
    }
}

fn parse_player_row(v: &Value) -> Option<ScorerRecord> {
    let player = v.get("player")?;
    let stats = v.get("statistics").and_then(|s| s.as_array());
    // A player can carry several competitions; prefer the league entry.
    let entry = stats.and_then(|arr| {
        arr.iter()
            .find(|s| {
                s.get("league")
                    .and_then(|l| l.get("id"))
                    .and_then(as_u32_any)
                    == Some(PREMIER_LEAGUE_ID)
            })
            .or_else(|| arr.first())
    });
    let count = |section: &str, key: &str| {
        entry
            .and_then(|e| e.get(section))
            .and_then(|s| s.get(key))
            .and_then(as_u32_any)
            .unwrap_or(0)
    };
    Some(ScorerRecord {
        id: as_u64_any(player.get("id")?)?,
        name: str_field(player, "name")?,
        photo: str_field(player, "photo"),
        goals: count("goals", "total"),
        assists: count("goals", "assists"),
        appearances: count("games", "appearences"),
    })
}
