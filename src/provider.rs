use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api_sports::ApiSports;
use crate::error::{ConfigError, ProviderError};
use crate::football_data::FootballData;
use crate::http_client::http_client;
use crate::model::{FixtureId, Score, ScorerRecord, Season, SideStats};
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    ApiSports,
    FootballData,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ApiSports => "api-sports",
            ProviderKind::FootballData => "football-data",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            ProviderKind::ApiSports => "https://v3.football.api-sports.io",
            ProviderKind::FootballData => "https://api.football-data.org/v4",
        }
    }

    pub fn auth_header(&self) -> &'static str {
        match self {
            ProviderKind::ApiSports => "x-apisports-key",
            ProviderKind::FootballData => "X-Auth-Token",
        }
    }

    /// Environment variable holding this provider's credential.
    pub fn key_var(&self) -> &'static str {
        match self {
            ProviderKind::ApiSports => "APISPORTS_KEY",
            ProviderKind::FootballData => "FOOTBALL_DATA_KEY",
        }
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            ProviderKind::ApiSports => &ApiSports,
            ProviderKind::FootballData => &FootballData,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api-sports" | "apisports" | "api-football" => Ok(ProviderKind::ApiSports),
            "football-data" | "footballdata" | "football-data.org" => {
                Ok(ProviderKind::FootballData)
            }
            _ => Err(ConfigError::InvalidVar {
                key: "PL_PROVIDER",
                value: s.to_string(),
            }),
        }
    }
}

/// Team as it appears in a provider payload, before identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSide {
    pub id: u32,
    pub name: String,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFixture {
    pub id: FixtureId,
    pub kickoff: DateTime<Utc>,
    pub status: String,
    pub home: RawSide,
    pub away: RawSide,
    pub fulltime: Option<Score>,
    pub halftime: Option<Score>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGoalEvent {
    pub seq: u32,
    pub provider_team_id: u32,
    pub team_name: String,
    pub minute: u16,
    pub extra: Option<u16>,
    pub detail: String,
    pub player: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScorerPage {
    pub rows: Vec<ScorerRecord>,
    pub current: u32,
    pub total: u32,
}

impl ScorerPage {
    pub fn has_more(&self) -> bool {
        self.current < self.total
    }
}

/// Endpoint layout and payload shapes of one provider.
pub trait Dialect: Sync {
    fn season_fixtures_path(&self, season: Season) -> String;

    fn team_fixtures_path(&self, provider_team_id: u32, season: Season) -> String;

    fn parse_fixtures(&self, body: &Value) -> Result<Vec<RawFixture>, String>;

    /// `None` when the provider exposes no event-level data.
    fn goal_events_path(&self, fixture_id: FixtureId) -> Option<String>;

    fn parse_goal_events(&self, body: &Value) -> Vec<RawGoalEvent>;

    fn fixture_stats_path(&self, fixture_id: FixtureId) -> Option<String>;

    fn parse_fixture_stats(&self, body: &Value) -> Vec<(u32, SideStats)>;

    fn scorers_path(&self, provider_team_id: u32, season: Season, page: u32) -> String;

    fn parse_scorer_page(&self, body: &Value, provider_team_id: u32) -> ScorerPage;

    /// Error message embedded in an otherwise successful response.
    fn envelope_error(&self, body: &Value) -> Option<String>;

    fn logo_url(&self, provider_team_id: u32) -> Option<String>;
}

pub trait Provider {
    fn kind(&self) -> ProviderKind;

    fn fetch(&mut self, path: &str) -> Result<Value, ProviderError>;

    /// Number of calls issued so far, failed ones included.
    fn calls(&self) -> usize;

    fn dialect(&self) -> &'static dyn Dialect {
        self.kind().dialect()
    }
}

impl<P: Provider + ?Sized> Provider for &mut P {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    fn fetch(&mut self, path: &str) -> Result<Value, ProviderError> {
        (**self).fetch(path)
    }

    fn calls(&self) -> usize {
        (**self).calls()
    }
}

pub struct HttpProvider<L: RateLimiter> {
    client: &'static Client,
    kind: ProviderKind,
    base_url: String,
    api_key: String,
    limiter: L,
    calls: usize,
}

impl<L: RateLimiter> HttpProvider<L> {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>, limiter: L) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            kind,
            base_url: kind.base_url().to_string(),
            api_key: api_key.into(),
            limiter,
            calls: 0,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl<L: RateLimiter> Provider for HttpProvider<L> {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn fetch(&mut self, path: &str) -> Result<Value, ProviderError> {
        self.limiter.acquire();
        self.calls += 1;
        debug!(provider = %self.kind, path, "provider call");

        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .header(self.kind.auth_header(), &self.api_key)
            .send()
            .map_err(|source| ProviderError::Transport {
                path: path.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        let body = resp.json::<Value>().map_err(|err| ProviderError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        check_envelope(self.kind, path, body)
    }

    fn calls(&self) -> usize {
        self.calls
    }
}

/// Turns a 200 response that carries a provider error envelope into an error.
pub fn check_envelope(kind: ProviderKind, path: &str, body: Value) -> Result<Value, ProviderError> {
    match kind.dialect().envelope_error(&body) {
        Some(message) => {
            warn!(provider = %kind, path, %message, "provider error envelope");
            Err(ProviderError::Envelope {
                path: path.to_string(),
                message,
            })
        }
        None => Ok(body),
    }
}
