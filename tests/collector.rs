use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};

use pl_goals::fixtures::{FixtureStrategy, TeamFilter, collect_season};
use pl_goals::identity::{CanonicalTeam, IdentityTable, TeamResolver, is_unmapped, unmapped_id};
use pl_goals::provider::ProviderKind;
use pl_goals::testing::ScriptedProvider;

const API_SPORTS_SEASON_2024: &str = "/fixtures?league=39&season=2024&status=FT-AET-PEN";

fn read_fixture(name: &str) -> Value {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    serde_json::from_str(&raw).expect("fixture should be valid json")
}

#[test]
fn bulk_collection_derives_sorted_roster_and_drops_unscored() {
    let mut provider = ScriptedProvider::new(ProviderKind::ApiSports)
        .respond(API_SPORTS_SEASON_2024, read_fixture("apisports_fixtures_2024.json"));
    let resolver = TeamResolver::new(IdentityTable::builtin());

    let season = collect_season(
        &mut provider,
        &resolver,
        2024,
        FixtureStrategy::Bulk,
        &TeamFilter::All,
    )
    .expect("season should collect");

    assert_eq!(provider.requests().len(), 1);
    let ids = season.fixtures.iter().map(|f| f.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![1003, 1002, 1001], "kickoff descending, postponed dropped");

    let names = season
        .roster
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Arsenal", "Chelsea", "Liverpool"]);
    let liverpool = &season.roster[2];
    assert_eq!(liverpool.canonical_id, 40);
    assert_eq!(liverpool.slug, "liverpool");

    let first = &season.fixtures[2];
    assert_eq!(first.halftime.map(|s| (s.home, s.away)), Some((1, 0)));
    assert_eq!(season.for_team(40).len(), 2);
}

#[test]
fn football_data_ids_map_to_canonical_ids() {
    let mut provider = ScriptedProvider::new(ProviderKind::FootballData).respond(
        "/competitions/PL/matches?season=2024&status=FINISHED",
        read_fixture("football_data_matches_2024.json"),
    );
    let resolver = TeamResolver::new(IdentityTable::builtin());

    let season = collect_season(
        &mut provider,
        &resolver,
        2024,
        FixtureStrategy::Bulk,
        &TeamFilter::All,
    )
    .unwrap();

    let ids = season
        .roster
        .iter()
        .map(|t| (t.canonical_id, t.provider_id, t.slug.as_str()))
        .collect::<Vec<_>>();
    // football-data 65 is Manchester City; canonical 65 is Nottingham Forest.
    assert_eq!(
        ids,
        vec![
            (42, 57, "arsenal"),
            (40, 64, "liverpool"),
            (50, 65, "manchester-city"),
            (65, 351, "nottingham-forest"),
        ]
    );
    let last = &season.fixtures[0];
    assert_eq!(last.id, 497433);
    assert!(last.halftime.is_none());
}

#[test]
fn unmapped_football_data_team_keeps_out_of_canonical_ids() {
    let body = json!({
        "matches": [{
            "id": 500001,
            "utcDate": "2024-08-20T19:00:00Z",
            "status": "FINISHED",
            "homeTeam": { "id": 57, "name": "Arsenal FC" },
            "awayTeam": { "id": 42, "name": "Wrexham AFC" },
            "score": { "fullTime": { "home": 3, "away": 0 }, "halfTime": { "home": 1, "away": 0 } }
        }]
    });
    let mut provider = ScriptedProvider::new(ProviderKind::FootballData)
        .respond("/competitions/PL/matches?season=2024&status=FINISHED", body);
    let resolver = TeamResolver::new(IdentityTable::builtin());

    let season = collect_season(
        &mut provider,
        &resolver,
        2024,
        FixtureStrategy::Bulk,
        &TeamFilter::All,
    )
    .unwrap();

    let roster = season
        .roster
        .iter()
        .map(|t| (t.canonical_id, t.slug.as_str()))
        .collect::<Vec<_>>();
    let wrexham = unmapped_id(ProviderKind::FootballData, 42);
    assert_eq!(roster, vec![(42, "arsenal"), (wrexham, "wrexham")]);
    assert!(is_unmapped(wrexham));
    assert_eq!(season.fixtures[0].away.id, wrexham);
    assert_eq!(season.fixtures[0].away.provider_id, 42);
    assert_eq!(season.for_team(42).len(), 1);
}

fn two_team_table() -> IdentityTable {
    IdentityTable {
        version: 1,
        slug_overrides: BTreeMap::new(),
        teams: vec![
            CanonicalTeam {
                id: 40,
                slug: "liverpool".to_string(),
                name: "Liverpool".to_string(),
            },
            CanonicalTeam {
                id: 42,
                slug: "arsenal".to_string(),
                name: "Arsenal".to_string(),
            },
        ],
        provider_ids: BTreeMap::from([(
            "api-sports".to_string(),
            BTreeMap::from([(40, 40), (42, 42)]),
        )]),
    }
}

fn shared_fixture() -> Value {
    json!({
        "fixture": { "id": 1001, "date": "2024-08-17T14:00:00+00:00", "status": { "short": "FT" } },
        "teams": { "home": { "id": 40, "name": "Liverpool" }, "away": { "id": 42, "name": "Arsenal" } },
        "goals": { "home": 2, "away": 1 },
        "score": { "halftime": { "home": 1, "away": 0 } }
    })
}

#[test]
fn per_team_collection_deduplicates_shared_fixtures() {
    let liverpool_only = json!({
        "fixture": { "id": 1002, "date": "2024-08-24T16:30:00+00:00", "status": { "short": "FT" } },
        "teams": { "home": { "id": 49, "name": "Chelsea" }, "away": { "id": 40, "name": "Liverpool" } },
        "goals": { "home": 1, "away": 1 },
        "score": {}
    });
    let mut provider = ScriptedProvider::new(ProviderKind::ApiSports)
        .respond(
            "/fixtures?team=40&league=39&season=2024&status=FT-AET-PEN",
            json!({ "errors": [], "response": [shared_fixture(), liverpool_only] }),
        )
        .respond(
            "/fixtures?team=42&league=39&season=2024&status=FT-AET-PEN",
            json!({ "errors": [], "response": [shared_fixture()] }),
        );
    let resolver = TeamResolver::new(two_team_table());

    let season = collect_season(
        &mut provider,
        &resolver,
        2024,
        FixtureStrategy::PerTeam,
        &TeamFilter::All,
    )
    .unwrap();

    assert_eq!(provider.requests().len(), 2);
    assert_eq!(season.fixtures.len(), 2);
    // Chelsea is not in the table, so it gets a reserved ID.
    let roster = season
        .roster
        .iter()
        .map(|t| t.canonical_id)
        .collect::<Vec<_>>();
    assert_eq!(roster, vec![42, unmapped_id(ProviderKind::ApiSports, 49), 40]);
}

#[test]
fn per_team_collection_honours_team_filter() {
    let mut provider = ScriptedProvider::new(ProviderKind::ApiSports).respond(
        "/fixtures?team=42&league=39&season=2024&status=FT-AET-PEN",
        json!({ "errors": [], "response": [shared_fixture()] }),
    );
    let resolver = TeamResolver::new(two_team_table());
    let filter = TeamFilter::parse("arsenal").unwrap();

    let season =
        collect_season(&mut provider, &resolver, 2024, FixtureStrategy::PerTeam, &filter).unwrap();

    assert_eq!(provider.requests().len(), 1);
    assert_eq!(season.selected_teams(&filter).len(), 1);
}

#[test]
fn error_envelope_fails_the_season() {
    let mut provider = ScriptedProvider::new(ProviderKind::ApiSports).respond(
        API_SPORTS_SEASON_2024,
        json!({ "errors": { "requests": "You have reached the request limit for the day" }, "response": [] }),
    );
    let resolver = TeamResolver::new(IdentityTable::builtin());

    let err = collect_season(
        &mut provider,
        &resolver,
        2024,
        FixtureStrategy::Bulk,
        &TeamFilter::All,
    )
    .unwrap_err();
    assert_eq!(err.path(), API_SPORTS_SEASON_2024);
}
