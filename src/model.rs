use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical, provider-independent club identifier.
pub type TeamId = u32;
pub type FixtureId = u64;
/// Calendar year the season starts in (2024 = 2024-25).
pub type Season = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}

impl Score {
    pub fn new(home: u8, away: u8) -> Self {
        Self { home, away }
    }

    /// `(for, against)` seen from `venue`.
    pub fn from_side(&self, venue: Venue) -> (u32, u32) {
        match venue {
            Venue::Home => (u32::from(self.home), u32::from(self.away)),
            Venue::Away => (u32::from(self.away), u32::from(self.home)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamSide {
    pub id: TeamId,
    pub provider_id: u32,
    pub name: String,
}

/// One finished match, with both sides already mapped to canonical IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub id: FixtureId,
    pub season: Season,
    pub kickoff: DateTime<Utc>,
    pub status: String,
    pub home: TeamSide,
    pub away: TeamSide,
    pub fulltime: Score,
    pub halftime: Option<Score>,
}

impl Fixture {
    pub fn venue_of(&self, team: TeamId) -> Option<Venue> {
        if self.home.id == team {
            Some(Venue::Home)
        } else if self.away.id == team {
            Some(Venue::Away)
        } else {
            None
        }
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.venue_of(team).is_some()
    }

    pub fn side(&self, venue: Venue) -> &TeamSide {
        match venue {
            Venue::Home => &self.home,
            Venue::Away => &self.away,
        }
    }

    pub fn result_for(&self, team: TeamId) -> Option<FormResult> {
        let venue = self.venue_of(team)?;
        let (scored, conceded) = self.fulltime.from_side(venue);
        Some(FormResult::from_goals(scored, conceded))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GoalKind {
    Normal,
    Penalty,
    Other(String),
}

impl GoalKind {
    pub fn from_detail(detail: &str) -> Self {
        match detail.trim().to_ascii_lowercase().as_str() {
            "normal goal" | "goal" | "regular" => GoalKind::Normal,
            "penalty" => GoalKind::Penalty,
            _ => GoalKind::Other(detail.trim().to_string()),
        }
    }

    /// Allow-list: only these kinds count toward aggregation.
    pub fn is_counted(&self) -> bool {
        matches!(self, GoalKind::Normal | GoalKind::Penalty)
    }

    pub fn as_str(&self) -> &str {
        match self {
            GoalKind::Normal => "normal",
            GoalKind::Penalty => "penalty",
            GoalKind::Other(_) => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalEvent {
    pub fixture_id: FixtureId,
    /// Position among the fixture's goal-typed events, stable across re-runs.
    pub seq: u32,
    pub team_id: TeamId,
    pub minute: u16,
    pub extra: Option<u16>,
    pub kind: GoalKind,
    pub detail: String,
    pub player: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "L")]
    Loss,
}

impl FormResult {
    pub fn from_goals(scored: u32, conceded: u32) -> Self {
        if scored > conceded {
            FormResult::Win
        } else if scored < conceded {
            FormResult::Loss
        } else {
            FormResult::Draw
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamIdentity {
    pub canonical_id: TeamId,
    pub provider_id: u32,
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
    pub goals: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub appearances: u32,
}

/// Per-side match statistics, all optional because providers omit fields freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideStats {
    pub shots_on_goal: Option<u32>,
    pub shots_off_goal: Option<u32>,
    pub total_shots: Option<u32>,
    pub blocked_shots: Option<u32>,
    pub corners: Option<u32>,
    pub possession: Option<u32>,
    pub fouls: Option<u32>,
    pub yellow_cards: Option<u32>,
    pub red_cards: Option<u32>,
    pub saves: Option<u32>,
    pub total_passes: Option<u32>,
    pub pass_accuracy: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureStats {
    pub home: Option<SideStats>,
    pub away: Option<SideStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_kind_allow_list() {
        assert_eq!(GoalKind::from_detail("Normal Goal"), GoalKind::Normal);
        assert_eq!(GoalKind::from_detail("Penalty"), GoalKind::Penalty);
        assert!(!GoalKind::from_detail("Own Goal").is_counted());
        assert!(!GoalKind::from_detail("Missed Penalty").is_counted());
        assert_eq!(
            GoalKind::from_detail("Own Goal"),
            GoalKind::Other("Own Goal".to_string())
        );
    }

    #[test]
    fn form_from_goals() {
        assert_eq!(FormResult::from_goals(2, 1), FormResult::Win);
        assert_eq!(FormResult::from_goals(1, 1), FormResult::Draw);
        assert_eq!(FormResult::from_goals(0, 3), FormResult::Loss);
    }

    #[test]
    fn score_from_side_swaps_for_away() {
        let score = Score::new(3, 1);
        assert_eq!(score.from_side(Venue::Home), (3, 1));
        assert_eq!(score.from_side(Venue::Away), (1, 3));
    }
}
