use std::collections::HashMap;
use std::fs;

use chrono::Utc;

use pl_goals::aggregate::aggregate_unit;
use pl_goals::model::{FixtureStats, ScorerRecord, SideStats, TeamIdentity};
use pl_goals::pipeline::RunSummary;
use pl_goals::provider::ProviderKind;
use pl_goals::sink::PersistenceSink;
use pl_goals::snapshot::{SnapshotWriter, TeamSeasonSnapshot};
use pl_goals::store::{FixtureRow, GoalEventRow, RowStore, SqliteStore};
use pl_goals::testing::{MapEventSource, MemoryStore, fixture, goal};

fn liverpool() -> TeamIdentity {
    TeamIdentity {
        canonical_id: 40,
        provider_id: 40,
        name: "Liverpool".to_string(),
        slug: "liverpool".to_string(),
        logo: Some("https://media.api-sports.io/football/teams/40.png".to_string()),
    }
}

fn salah() -> ScorerRecord {
    ScorerRecord {
        id: 306,
        name: "Mohamed Salah".to_string(),
        photo: None,
        goals: 29,
        assists: 18,
        appearances: 38,
    }
}

fn timed_snapshot() -> TeamSeasonSnapshot {
    let fixtures = vec![
        fixture(1002, 8, (49, "Chelsea"), (40, "Liverpool"), (1, 1), Some((0, 1))),
        fixture(1001, 1, (40, "Liverpool"), (42, "Arsenal"), (2, 1), Some((1, 0))),
    ];
    let mut source = MapEventSource::new()
        .with(1001, vec![goal(1001, 0, 40, 12), goal(1001, 1, 42, 77), goal(1001, 2, 40, 90)])
        .with(1002, vec![goal(1002, 0, 40, 30), goal(1002, 1, 49, 61)]);
    let unit = aggregate_unit(40, &fixtures, Some(&mut source));
    TeamSeasonSnapshot {
        team: liverpool(),
        season: 2024,
        aggregate: unit.aggregate,
        fixtures,
        scorers: vec![salah()],
        goal_events: unit.goal_events,
        stats: HashMap::new(),
    }
}

fn totals_snapshot() -> TeamSeasonSnapshot {
    let fixtures = vec![fixture(1001, 1, (40, "Liverpool"), (42, "Arsenal"), (2, 1), Some((1, 0)))];
    let unit = aggregate_unit(40, &fixtures, None);
    let mut stats = HashMap::new();
    stats.insert(
        1001,
        FixtureStats {
            home: Some(SideStats {
                possession: Some(58),
                corners: Some(7),
                ..SideStats::default()
            }),
            away: None,
        },
    );
    TeamSeasonSnapshot {
        team: liverpool(),
        season: 2024,
        aggregate: unit.aggregate,
        fixtures,
        scorers: Vec::new(),
        goal_events: unit.goal_events,
        stats,
    }
}

fn run_summary() -> RunSummary {
    RunSummary {
        provider: ProviderKind::ApiSports,
        started_at: Utc::now(),
        seasons_total: 1,
        seasons_skipped: 0,
        units_written: 1,
        units_skipped: 0,
        files_written: 2,
        fixture_rows: 2,
        event_rows: 5,
        api_calls: 4,
        warnings: vec!["arsenal 2024: no scorers available".to_string()],
    }
}

#[test]
fn replaying_row_upserts_is_idempotent() {
    let snapshot = timed_snapshot();
    let fixtures = snapshot
        .fixtures
        .iter()
        .map(|f| FixtureRow::for_team(f, 40))
        .collect::<Vec<_>>();
    let events = snapshot
        .goal_events
        .iter()
        .map(GoalEventRow::from)
        .collect::<Vec<_>>();

    let mut store = SqliteStore::open_in_memory().unwrap();
    store.upsert_fixtures(&fixtures).unwrap();
    store.upsert_goal_events(&events).unwrap();
    let fixtures_once = store.load_fixtures(2024).unwrap();
    let events_once = store.load_goal_events(1001).unwrap();

    store.upsert_fixtures(&fixtures).unwrap();
    store.upsert_goal_events(&events).unwrap();

    assert_eq!(store.fixture_count().unwrap(), 2);
    assert_eq!(store.goal_event_count().unwrap(), 5);
    assert_eq!(store.load_fixtures(2024).unwrap(), fixtures_once);
    assert_eq!(store.load_goal_events(1001).unwrap(), events_once);
    assert_eq!(events_once.len(), 3);
    assert_eq!(events_once[2].minute, 90);
    assert_eq!(fixtures_once[0], fixtures[0]);
}

#[test]
fn sqlite_store_persists_rows_and_runs_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("pl.sqlite");
    {
        let mut store = SqliteStore::open(&path).unwrap();
        let snapshot = timed_snapshot();
        let rows = snapshot
            .fixtures
            .iter()
            .map(|f| FixtureRow::for_team(f, 40))
            .collect::<Vec<_>>();
        store.upsert_fixtures(&rows).unwrap();
        store.record_run(&run_summary()).unwrap();
    }
    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.fixture_count().unwrap(), 2);
    assert_eq!(store.run_count().unwrap(), 1);
}

#[test]
fn sink_writes_snapshot_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let mut sink = PersistenceSink::new(
        SnapshotWriter::new(dir.path()),
        Some(Box::new(store.clone())),
    );

    let report = sink.persist(&timed_snapshot()).unwrap();

    assert_eq!(report.snapshot, dir.path().join("liverpool-2024.json"));
    assert!(report.snapshot.exists());
    assert_eq!((report.fixture_rows, report.event_rows), (2, 5));
    assert!(report.row_error.is_none());
    assert_eq!(store.fixture_count(), 2);
    assert_eq!(store.event_count(), 5);
    assert_eq!(store.fixture(1001).unwrap().goals_home, 2);
    assert_eq!(store.fixture(1001).unwrap().team_id, 40);
}

#[test]
fn row_failure_does_not_block_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = PersistenceSink::new(
        SnapshotWriter::new(dir.path()),
        Some(Box::new(MemoryStore::failing())),
    );

    let report = sink.persist(&timed_snapshot()).unwrap();

    assert!(report.snapshot.exists());
    assert!(report.row_error.is_some());
    assert_eq!(report.fixture_rows, 0);
}

#[test]
fn snapshot_failure_fails_the_unit_before_rows() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "occupied").unwrap();
    let store = MemoryStore::new();
    let mut sink = PersistenceSink::new(
        SnapshotWriter::new(blocker.join("data")),
        Some(Box::new(store.clone())),
    );

    assert!(sink.persist(&timed_snapshot()).is_err());
    assert_eq!(store.fixture_count(), 0);
}

#[test]
fn snapshot_document_carries_buckets_only_when_timed() {
    let dir = tempfile::tempdir().unwrap();
    let writer = SnapshotWriter::new(dir.path());

    writer.write(&timed_snapshot()).unwrap();
    let doc = writer.read_document("liverpool", 2024).unwrap();
    assert!(doc.by_time_available);
    assert_eq!(doc.periods.len(), 6);
    assert_eq!(doc.periods[5], "76-90+");
    assert_eq!(doc.scored.total, Some(3));
    assert_eq!(doc.scored.by_time, Some([1, 1, 0, 0, 0, 1]));
    assert_eq!(doc.home.conceded.by_time, Some([0, 0, 0, 0, 0, 1]));
    assert_eq!(doc.away.conceded.by_time, Some([0, 0, 0, 0, 1, 0]));
    assert!(doc.halves.is_none());
    assert_eq!(doc.fixtures.len(), 2);
    assert_eq!(doc.fixtures[0].id, 1002);
    assert_eq!(doc.scorers, vec![salah()]);

    writer.write(&totals_snapshot()).unwrap();
    let raw = fs::read_to_string(writer.snapshot_path("liverpool", 2024)).unwrap();
    assert!(raw.contains("\"byTimeAvailable\": false"));
    assert!(raw.contains("\"byTime\": null"));

    let doc = writer.read_document("liverpool", 2024).unwrap();
    assert!(!doc.by_time_available);
    assert_eq!(doc.scored.total, Some(2));
    assert_eq!(doc.conceded.total, Some(1));
    assert_eq!(doc.scored.by_time, None);
    assert_eq!(doc.home.scored.total, None);
    let halves = doc.halves.unwrap();
    assert_eq!(halves.scored, [1, 1]);
    assert_eq!(halves.conceded, [0, 1]);
    assert_eq!(doc.fixtures[0].stats_home.as_ref().unwrap().possession, Some(58));
    assert!(doc.fixtures[0].stats_away.is_none());
}

#[test]
fn previous_scorers_are_read_leniently() {
    let dir = tempfile::tempdir().unwrap();
    let writer = SnapshotWriter::new(dir.path());

    assert!(writer.read_scorers("liverpool", 2024).is_none());

    writer.write(&timed_snapshot()).unwrap();
    assert_eq!(writer.read_scorers("liverpool", 2024), Some(vec![salah()]));

    fs::write(writer.snapshot_path("arsenal", 2024), "{ not json").unwrap();
    assert!(writer.read_scorers("arsenal", 2024).is_none());
}

#[test]
fn roster_document_lists_teams() {
    let dir = tempfile::tempdir().unwrap();
    let writer = SnapshotWriter::new(dir.path());

    let path = writer.write_roster(2024, &[liverpool()]).unwrap();

    assert_eq!(path, dir.path().join("pl-teams-2024.json"));
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(raw[0]["id"], 40);
    assert_eq!(raw[0]["slug"], "liverpool");
    assert_eq!(raw[0]["hasData"], true);
}
