use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::model::{TeamId, TeamIdentity};
use crate::provider::{ProviderKind, RawSide};

pub const BUILTIN_TABLE_VERSION: u32 = 3;

/// Trailing words dropped by the generic slug rule.
const SUFFIX_WORDS: &[&str] = &[
    "fc", "afc", "city", "united", "town", "rovers", "athletic", "wanderers", "hotspur",
    "albion", "palace", "villa", "forest", "county",
];

const FALLBACK_SLUG: &str = "team";

/// Teams the table does not know get an ID from here up, one block per
/// provider. Canonical IDs stay below this line.
pub const UNMAPPED_ID_BASE: TeamId = 0x8000_0000;
const UNMAPPED_BLOCK: TeamId = 0x1000_0000;

/// Display-name variants seen across providers and seasons.
const SLUG_OVERRIDES: &[(&str, &str)] = &[
    ("Manchester United", "manchester-united"),
    ("Manchester City", "manchester-city"),
    ("Nottingham Forest", "nottingham-forest"),
    ("Nottm Forest", "nottingham-forest"),
    ("Brighton", "brighton"),
    ("Brighton & Hove Albion", "brighton"),
    ("West Ham", "west-ham"),
    ("West Ham United", "west-ham"),
    ("Tottenham", "tottenham"),
    ("Tottenham Hotspur", "tottenham"),
    ("Leicester", "leicester"),
    ("Leicester City", "leicester"),
    ("Leeds", "leeds"),
    ("Leeds United", "leeds"),
    ("Sheffield Utd", "sheffield-united"),
    ("Sheffield United", "sheffield-united"),
    ("Aston Villa", "aston-villa"),
    ("Crystal Palace", "crystal-palace"),
    ("Wolverhampton Wanderers", "wolverhampton"),
    ("Wolves", "wolverhampton"),
    ("Ipswich", "ipswich"),
    ("Ipswich Town", "ipswich"),
    ("Luton", "luton"),
    ("Luton Town", "luton"),
    ("Burnley", "burnley"),
    ("Huddersfield", "huddersfield"),
    ("Huddersfield Town", "huddersfield"),
    ("Stoke", "stoke"),
    ("Stoke City", "stoke"),
    ("Sunderland", "sunderland"),
    ("Swansea", "swansea"),
    ("Swansea City", "swansea"),
    ("Watford", "watford"),
    ("West Brom", "west-brom"),
    ("West Bromwich Albion", "west-brom"),
    ("Wigan", "wigan"),
    ("Reading", "reading"),
    ("Middlesbrough", "middlesbrough"),
    ("Hull", "hull"),
    ("Hull City", "hull"),
    ("Cardiff", "cardiff"),
    ("Cardiff City", "cardiff"),
    ("Norwich", "norwich"),
    ("Norwich City", "norwich"),
    ("Blackburn", "blackburn"),
    ("Blackburn Rovers", "blackburn"),
    ("Queens Park Rangers", "qpr"),
    ("QPR", "qpr"),
];

/// Canonical clubs; canonical IDs follow api-sports numbering.
const CANONICAL_TEAMS: &[(TeamId, &str, &str)] = &[
    (42, "arsenal", "Arsenal"),
    (66, "aston-villa", "Aston Villa"),
    (35, "bournemouth", "Bournemouth"),
    (55, "brentford", "Brentford"),
    (51, "brighton", "Brighton"),
    (44, "burnley", "Burnley"),
    (49, "chelsea", "Chelsea"),
    (52, "crystal-palace", "Crystal Palace"),
    (45, "everton", "Everton"),
    (36, "fulham", "Fulham"),
    (63, "leeds", "Leeds United"),
    (40, "liverpool", "Liverpool"),
    (50, "manchester-city", "Manchester City"),
    (33, "manchester-united", "Manchester United"),
    (34, "newcastle", "Newcastle"),
    (65, "nottingham-forest", "Nottm Forest"),
    (746, "sunderland", "Sunderland"),
    (47, "tottenham", "Tottenham"),
    (48, "west-ham", "West Ham"),
    (39, "wolverhampton", "Wolves"),
    (57, "ipswich", "Ipswich Town"),
    (46, "leicester", "Leicester City"),
    (41, "southampton", "Southampton"),
    (71, "norwich", "Norwich City"),
    (62, "sheffield-united", "Sheffield United"),
    (1359, "luton", "Luton Town"),
    (38, "watford", "Watford"),
    (60, "west-brom", "West Brom"),
    (76, "swansea", "Swansea City"),
    (75, "stoke", "Stoke City"),
    (70, "middlesbrough", "Middlesbrough"),
    (64, "hull", "Hull City"),
    (37, "huddersfield", "Huddersfield"),
    (43, "cardiff", "Cardiff City"),
];

/// football-data.org team ID -> canonical ID.
const FOOTBALL_DATA_IDS: &[(u32, TeamId)] = &[
    (57, 42),
    (58, 66),
    (1044, 35),
    (402, 55),
    (397, 51),
    (328, 44),
    (61, 49),
    (354, 52),
    (62, 45),
    (63, 36),
    (341, 63),
    (64, 40),
    (65, 50),
    (66, 33),
    (67, 34),
    (351, 65),
    (71, 746),
    (73, 47),
    (563, 48),
    (76, 39),
    (349, 57),
    (338, 46),
    (340, 41),
    (68, 71),
    (356, 62),
    (389, 1359),
    (346, 38),
    (74, 60),
    (72, 76),
    (70, 75),
    (343, 70),
    (322, 64),
    (394, 37),
    (715, 43),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTeam {
    pub id: TeamId,
    pub slug: String,
    pub name: String,
}

/// Immutable identity dataset handed to [`TeamResolver::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityTable {
    pub version: u32,
    #[serde(default)]
    pub slug_overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub teams: Vec<CanonicalTeam>,
    /// Keyed by provider name (`api-sports`, `football-data`).
    #[serde(default)]
    pub provider_ids: BTreeMap<String, BTreeMap<u32, TeamId>>,
}

impl IdentityTable {
    pub fn builtin() -> Self {
        let slug_overrides = SLUG_OVERRIDES
            .iter()
            .map(|(name, slug)| (name.to_string(), slug.to_string()))
            .collect();
        let teams = CANONICAL_TEAMS
            .iter()
            .map(|(id, slug, name)| CanonicalTeam {
                id: *id,
                slug: slug.to_string(),
                name: name.to_string(),
            })
            .collect();

        let mut provider_ids = BTreeMap::new();
        provider_ids.insert(
            ProviderKind::ApiSports.as_str().to_string(),
            CANONICAL_TEAMS.iter().map(|(id, _, _)| (*id, *id)).collect(),
        );
        provider_ids.insert(
            ProviderKind::FootballData.as_str().to_string(),
            FOOTBALL_DATA_IDS.iter().copied().collect(),
        );

        Self {
            version: BUILTIN_TABLE_VERSION,
            slug_overrides,
            teams,
            provider_ids,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|err| ConfigError::IdentityTable {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|err| ConfigError::IdentityTable {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }
}

pub struct TeamResolver {
    table: IdentityTable,
    by_slug: HashMap<String, TeamId>,
    forward: HashMap<(ProviderKind, u32), TeamId>,
    reverse: HashMap<(ProviderKind, TeamId), u32>,
}

impl TeamResolver {
    pub fn new(table: IdentityTable) -> Self {
        let by_slug = table
            .teams
            .iter()
            .map(|team| (team.slug.clone(), team.id))
            .collect();

        let mut forward = HashMap::new();
        let mut reverse = HashMap::new();
        for team in table.teams.iter().filter(|team| is_unmapped(team.id)) {
            warn!(id = team.id, slug = %team.slug, "canonical id falls in the unmapped range");
        }
        for (provider, ids) in &table.provider_ids {
            let Ok(kind) = provider.parse::<ProviderKind>() else {
                warn!(%provider, "identity table names an unknown provider");
                continue;
            };
            for (provider_id, canonical_id) in ids {
                forward.insert((kind, *provider_id), *canonical_id);
                reverse.insert((kind, *canonical_id), *provider_id);
            }
        }

        Self {
            table,
            by_slug,
            forward,
            reverse,
        }
    }

    pub fn table_version(&self) -> u32 {
        self.table.version
    }

    pub fn slug_of(&self, display_name: &str) -> String {
        if let Some(slug) = self.table.slug_overrides.get(display_name) {
            return slug.clone();
        }
        slugify(display_name)
    }

    pub fn resolve(&self, provider: ProviderKind, provider_id: u32, display_name: &str) -> TeamId {
        self.lookup(provider, provider_id, display_name)
            .unwrap_or_else(|| self.unmapped(provider, provider_id, display_name))
    }

    /// Table match only: explicit provider mapping, then display-name slug.
    fn lookup(&self, provider: ProviderKind, provider_id: u32, display_name: &str) -> Option<TeamId> {
        self.forward
            .get(&(provider, provider_id))
            .or_else(|| self.by_slug.get(&self.slug_of(display_name)))
            .copied()
    }

    fn unmapped(&self, provider: ProviderKind, provider_id: u32, display_name: &str) -> TeamId {
        let id = unmapped_id(provider, provider_id);
        debug!(%provider, provider_id, display_name, id, "no canonical mapping, using reserved id");
        id
    }

    pub fn provider_id_for(&self, provider: ProviderKind, canonical_id: TeamId) -> Option<u32> {
        self.reverse
            .get(&(provider, canonical_id))
            .copied()
            .or_else(|| unmapped_provider_id(provider, canonical_id))
    }

    pub fn canonical_team(&self, canonical_id: TeamId) -> Option<&CanonicalTeam> {
        self.table.teams.iter().find(|team| team.id == canonical_id)
    }

    /// Canonical teams the given provider has an ID for.
    pub fn known_teams(&self, provider: ProviderKind) -> Vec<&CanonicalTeam> {
        self.table
            .teams
            .iter()
            .filter(|team| self.reverse.contains_key(&(provider, team.id)))
            .collect()
    }

    /// Snapshot keys use the canonical slug so name variants collapse to one
    /// key. Unmapped teams are keyed by their own display name.
    pub fn identity(&self, provider: ProviderKind, side: &RawSide) -> TeamIdentity {
        let (canonical_id, slug) = match self.lookup(provider, side.id, &side.name) {
            Some(id) => {
                let slug = self
                    .canonical_team(id)
                    .map(|team| team.slug.clone())
                    .unwrap_or_else(|| self.slug_of(&side.name));
                (id, slug)
            }
            None => (
                self.unmapped(provider, side.id, &side.name),
                self.slug_of(&side.name),
            ),
        };
        TeamIdentity {
            canonical_id,
            provider_id: side.id,
            name: side.name.clone(),
            slug,
            logo: side
                .logo
                .clone()
                .or_else(|| provider.dialect().logo_url(side.id)),
        }
    }
}

fn provider_block(provider: ProviderKind) -> TeamId {
    match provider {
        ProviderKind::ApiSports => 0,
        ProviderKind::FootballData => 1,
    }
}

/// Deterministic stand-in ID for a provider team missing from the table.
pub fn unmapped_id(provider: ProviderKind, provider_id: u32) -> TeamId {
    UNMAPPED_ID_BASE + provider_block(provider) * UNMAPPED_BLOCK + provider_id % UNMAPPED_BLOCK
}

pub fn is_unmapped(id: TeamId) -> bool {
    id >= UNMAPPED_ID_BASE
}

fn unmapped_provider_id(provider: ProviderKind, id: TeamId) -> Option<u32> {
    let offset = id.checked_sub(UNMAPPED_ID_BASE + provider_block(provider) * UNMAPPED_BLOCK)?;
    (offset < UNMAPPED_BLOCK).then_some(offset)
}

/// Generic slug rule, applied when no override matches. Never fails.
pub fn slugify(display_name: &str) -> String {
    let lower = display_name.trim().to_lowercase();
    let stem = strip_suffix_word(&lower).replace('&', "and");

    let mut out = String::with_capacity(stem.len());
    let mut pending_hyphen = false;
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    if out.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        out
    }
}

fn strip_suffix_word(lower: &str) -> &str {
    for suffix in SUFFIX_WORDS {
        let Some(head) = lower.strip_suffix(suffix) else {
            continue;
        };
        if !head.ends_with(char::is_whitespace) {
            continue;
        }
        let head = head.trim_end();
        if !head.is_empty() {
            return head;
        }
    }
    lower
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TeamResolver {
        TeamResolver::new(IdentityTable::builtin())
    }

    #[test]
    fn overrides_win_over_generic_rule() {
        let r = resolver();
        for (name, slug) in SLUG_OVERRIDES {
            assert_eq!(r.slug_of(name), *slug, "override for {name}");
        }
        assert_eq!(r.slug_of("Brighton & Hove Albion"), "brighton");
        assert_eq!(slugify("Brighton & Hove Albion"), "brighton-and-hove");
    }

    #[test]
    fn generic_rule_strips_one_trailing_suffix() {
        assert_eq!(slugify("Bristol City"), "bristol");
        assert_eq!(slugify("Wycombe Wanderers"), "wycombe");
        assert_eq!(slugify("Manchester United FC"), "manchester-united");
        assert_eq!(slugify("AFC Wimbledon"), "afc-wimbledon");
        assert_eq!(slugify("Villa"), "villa");
        assert_eq!(slugify("Port Vale"), "port-vale");
    }

    #[test]
    fn generic_rule_is_total() {
        assert_eq!(slugify(""), "team");
        assert_eq!(slugify("!!!"), "team");
        assert_eq!(slugify("  --Bayern   München-- "), "bayern-m-nchen");
        assert_eq!(slugify("Newcastle"), slugify("Newcastle"));
    }

    #[test]
    fn provider_ids_map_per_provider() {
        let r = resolver();
        // 65 is Nottingham Forest on api-sports but Manchester City on football-data.
        assert_eq!(r.resolve(ProviderKind::ApiSports, 65, "Nottingham Forest"), 65);
        assert_eq!(r.resolve(ProviderKind::FootballData, 65, "Manchester City FC"), 50);
        assert_eq!(r.provider_id_for(ProviderKind::FootballData, 40), Some(64));
    }

    #[test]
    fn unknown_ids_fall_back_to_slug_then_reserved_range() {
        let r = resolver();
        assert_eq!(r.resolve(ProviderKind::FootballData, 9999, "Liverpool FC"), 40);

        let wrexham = r.resolve(ProviderKind::ApiSports, 1234, "Wrexham");
        assert_eq!(wrexham, unmapped_id(ProviderKind::ApiSports, 1234));
        assert!(is_unmapped(wrexham));
        assert!(r.canonical_team(wrexham).is_none());
        assert_eq!(r.provider_id_for(ProviderKind::ApiSports, wrexham), Some(1234));
        assert_eq!(r.provider_id_for(ProviderKind::FootballData, wrexham), None);
    }

    #[test]
    fn unmapped_id_never_lands_on_a_canonical_team() {
        let r = resolver();
        // 42 is Arsenal's canonical ID but means nothing on football-data.
        let identity = r.identity(
            ProviderKind::FootballData,
            &RawSide {
                id: 42,
                name: "Wrexham AFC".to_string(),
                logo: None,
            },
        );
        assert_ne!(identity.canonical_id, 42);
        assert!(is_unmapped(identity.canonical_id));
        assert_eq!(identity.provider_id, 42);
        assert_eq!(identity.slug, "wrexham");
        assert_ne!(
            unmapped_id(ProviderKind::FootballData, 42),
            unmapped_id(ProviderKind::ApiSports, 42)
        );
    }

    #[test]
    fn substitute_table_is_honoured() {
        let mut table = IdentityTable {
            version: 1,
            slug_overrides: BTreeMap::new(),
            teams: vec![CanonicalTeam {
                id: 7,
                slug: "reds".to_string(),
                name: "Reds".to_string(),
            }],
            provider_ids: BTreeMap::new(),
        };
        table
            .slug_overrides
            .insert("The Reds".to_string(), "reds".to_string());
        table.provider_ids.insert(
            "api-sports".to_string(),
            BTreeMap::from([(40, 7)]),
        );
        let r = TeamResolver::new(table);
        let identity = r.identity(
            ProviderKind::ApiSports,
            &RawSide {
                id: 40,
                name: "Liverpool".to_string(),
                logo: None,
            },
        );
        assert_eq!(identity.canonical_id, 7);
        assert_eq!(identity.slug, "reds");
        assert_eq!(r.slug_of("The Reds"), "reds");
        assert_eq!(r.table_version(), 1);
    }
}
