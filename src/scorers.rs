use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::model::{ScorerRecord, Season, TeamIdentity};
use crate::provider::Provider;

/// Hard ceiling on pages, whatever the provider reports as its page count.
pub const SCORER_PAGE_CAP: u32 = 3;
pub const TOP_SCORERS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerSource {
    Fresh,
    PreviousSnapshot,
    Empty,
}

#[derive(Debug, Clone)]
pub struct ScorerOutcome {
    pub records: Vec<ScorerRecord>,
    pub source: ScorerSource,
}

impl ScorerOutcome {
    /// Empty result with nothing to fall back on.
    pub fn is_soft_warning(&self) -> bool {
        self.source == ScorerSource::Empty
    }
}

/// `previous` is only invoked when the provider yields no scorers.
pub fn top_scorers<P, F>(
    provider: &mut P,
    team: &TeamIdentity,
    season: Season,
    previous: F,
) -> ScorerOutcome
where
    P: Provider + ?Sized,
    F: FnOnce() -> Option<Vec<ScorerRecord>>,
{
    let rows = fetch_scorer_rows(provider, team, season);
    let ranked = rank_scorers(rows);
    if !ranked.is_empty() {
        return ScorerOutcome {
            records: ranked,
            source: ScorerSource::Fresh,
        };
    }

    match previous() {
        Some(records) if !records.is_empty() => {
            info!(team = %team.slug, season, count = records.len(), "reusing scorers from previous snapshot");
            ScorerOutcome {
                records,
                source: ScorerSource::PreviousSnapshot,
            }
        }
        _ => {
            warn!(team = %team.slug, season, "no scorers from provider and no previous snapshot");
            ScorerOutcome {
                records: Vec::new(),
                source: ScorerSource::Empty,
            }
        }
    }
}

/// Paging stops at the first failed page; rows from earlier pages are kept.
fn fetch_scorer_rows<P: Provider + ?Sized>(
    provider: &mut P,
    team: &TeamIdentity,
    season: Season,
) -> Vec<ScorerRecord> {
    let dialect = provider.dialect();
    let mut rows = Vec::new();
    let mut page = 1u32;
    while page <= SCORER_PAGE_CAP {
        let path = dialect.scorers_path(team.provider_id, season, page);
        let body = match provider.fetch(&path) {
            Ok(body) => body,
            Err(err) => {
                warn!(team = %team.slug, season, page, kept = rows.len(), error = %err, "scorer fetch failed");
                break;
            }
        };
        let parsed = dialect.parse_scorer_page(&body, team.provider_id);
        debug!(page, rows = parsed.rows.len(), total_pages = parsed.total, "scorer page");
        let has_more = parsed.has_more();
        rows.extend(parsed.rows);
        if !has_more {
            break;
        }
        page += 1;
    }
    rows
}

/// Goals > 0, most goals first, top fifteen.
pub fn rank_scorers(rows: Vec<ScorerRecord>) -> Vec<ScorerRecord> {
    let mut seen = HashSet::new();
    let mut ranked = rows
        .into_iter()
        .filter(|row| row.goals > 0)
        .filter(|row| seen.insert(row.id))
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| {
        b.goals
            .cmp(&a.goals)
            .then(b.assists.cmp(&a.assists))
            .then(a.name.cmp(&b.name))
    });
    ranked.truncate(TOP_SCORERS);
    ranked
}
