use std::fs;
use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, Transaction, params};

use crate::error::PersistenceError;
use crate::model::{Fixture, FixtureId, GoalEvent, Season, TeamId};
use crate::pipeline::RunSummary;

/// Flat shape of one finished fixture as stored in the `fixtures` table.
/// `team_id` is the team whose unit last wrote the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRow {
    pub fixture_id: FixtureId,
    pub season: Season,
    pub team_id: TeamId,
    pub kickoff: String,
    pub status: String,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_team: String,
    pub away_team: String,
    pub goals_home: u8,
    pub goals_away: u8,
    pub ht_home: Option<u8>,
    pub ht_away: Option<u8>,
}

impl FixtureRow {
    pub fn for_team(fixture: &Fixture, team_id: TeamId) -> Self {
        Self {
            fixture_id: fixture.id,
            season: fixture.season,
            team_id,
            kickoff: fixture.kickoff.to_rfc3339(),
            status: fixture.status.clone(),
            home_team_id: fixture.home.id,
            away_team_id: fixture.away.id,
            home_team: fixture.home.name.clone(),
            away_team: fixture.away.name.clone(),
            goals_home: fixture.fulltime.home,
            goals_away: fixture.fulltime.away,
            ht_home: fixture.halftime.map(|s| s.home),
            ht_away: fixture.halftime.map(|s| s.away),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalEventRow {
    pub fixture_id: FixtureId,
    pub seq: u32,
    pub team_id: TeamId,
    pub minute: u16,
    pub extra: Option<u16>,
    pub kind: String,
    pub detail: String,
    pub player: Option<String>,
}

impl From<&GoalEvent> for GoalEventRow {
    fn from(event: &GoalEvent) -> Self {
        Self {
            fixture_id: event.fixture_id,
            seq: event.seq,
            team_id: event.team_id,
            minute: event.minute,
            extra: event.extra,
            kind: event.kind.as_str().to_string(),
            detail: event.detail.clone(),
            player: event.player.clone(),
        }
    }
}

/// Keyed, idempotent row writes. Replaying a batch leaves the store unchanged.
pub trait RowStore {
    fn upsert_fixtures(&mut self, rows: &[FixtureRow]) -> Result<usize, PersistenceError>;

    fn upsert_goal_events(&mut self, rows: &[GoalEventRow]) -> Result<usize, PersistenceError>;

    fn record_run(&mut self, _summary: &RunSummary) -> Result<(), PersistenceError> {
        Ok(())
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn fixture_count(&self) -> Result<usize, PersistenceError> {
        self.count("SELECT COUNT(*) FROM fixtures")
    }

    pub fn goal_event_count(&self) -> Result<usize, PersistenceError> {
        self.count("SELECT COUNT(*) FROM goal_events")
    }

    pub fn run_count(&self) -> Result<usize, PersistenceError> {
        self.count("SELECT COUNT(*) FROM ingest_runs")
    }

    fn count(&self, sql: &str) -> Result<usize, PersistenceError> {
        let n = self.conn.query_row(sql, [], |row| row.get::<_, i64>(0))?;
        Ok(n.max(0) as usize)
    }

    pub fn load_fixtures(&self, season: Season) -> Result<Vec<FixtureRow>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                fixture_id, season, team_id, kickoff, status,
                home_team_id, away_team_id, home_team, away_team,
                goals_home, goals_away, ht_home, ht_away
            FROM fixtures
            WHERE season = ?1
            ORDER BY kickoff DESC, fixture_id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![season as i64], |row| {
            Ok(FixtureRow {
                fixture_id: row.get::<_, u64>(0)?,
                season: row.get::<_, u16>(1)?,
                team_id: row.get::<_, u32>(2)?,
                kickoff: row.get(3)?,
                status: row.get(4)?,
                home_team_id: row.get::<_, u32>(5)?,
                away_team_id: row.get::<_, u32>(6)?,
                home_team: row.get(7)?,
                away_team: row.get(8)?,
                goals_home: row.get::<_, u8>(9)?,
                goals_away: row.get::<_, u8>(10)?,
                ht_home: row.get(11)?,
                ht_away: row.get(12)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn load_goal_events(
        &self,
        fixture_id: FixtureId,
    ) -> Result<Vec<GoalEventRow>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT fixture_id, seq, team_id, minute, extra, kind, detail, player
            FROM goal_events
            WHERE fixture_id = ?1
            ORDER BY seq ASC
            "#,
        )?;
        let rows = stmt.query_map(params![fixture_id as i64], |row| {
            Ok(GoalEventRow {
                fixture_id: row.get::<_, u64>(0)?,
                seq: row.get::<_, u32>(1)?,
                team_id: row.get::<_, u32>(2)?,
                minute: row.get::<_, u16>(3)?,
                extra: row.get(4)?,
                kind: row.get(5)?,
                detail: row.get(6)?,
                player: row.get(7)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl RowStore for SqliteStore {
    fn upsert_fixtures(&mut self, rows: &[FixtureRow]) -> Result<usize, PersistenceError> {
        let updated_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for row in rows {
            upsert_fixture(&tx, row, &updated_at)?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn upsert_goal_events(&mut self, rows: &[GoalEventRow]) -> Result<usize, PersistenceError> {
        let tx = self.conn.transaction()?;
        for row in rows {
            upsert_goal_event(&tx, row)?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn record_run(&mut self, summary: &RunSummary) -> Result<(), PersistenceError> {
        let warnings_json = serde_json::to_string(&summary.warnings)?;
        self.conn.execute(
            "INSERT INTO ingest_runs(
                started_at, finished_at, provider, seasons_total, seasons_skipped,
                units_written, units_skipped, fixture_rows, event_rows, api_calls, warnings_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                summary.started_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
                summary.provider.as_str(),
                summary.seasons_total as i64,
                summary.seasons_skipped as i64,
                summary.units_written as i64,
                summary.units_skipped as i64,
                summary.fixture_rows as i64,
                summary.event_rows as i64,
                summary.api_calls as i64,
                warnings_json,
            ],
        )?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS fixtures (
            fixture_id INTEGER PRIMARY KEY,
            season INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            kickoff TEXT NOT NULL,
            status TEXT NOT NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            goals_home INTEGER NOT NULL,
            goals_away INTEGER NOT NULL,
            ht_home INTEGER NULL,
            ht_away INTEGER NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_fixtures_season ON fixtures(season);
        CREATE INDEX IF NOT EXISTS idx_fixtures_home ON fixtures(home_team_id);
        CREATE INDEX IF NOT EXISTS idx_fixtures_away ON fixtures(away_team_id);

        CREATE TABLE IF NOT EXISTS goal_events (
            fixture_id INTEGER NOT NULL REFERENCES fixtures(fixture_id),
            seq INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            minute INTEGER NOT NULL,
            extra INTEGER NULL,
            kind TEXT NOT NULL,
            detail TEXT NOT NULL,
            player TEXT NULL,
            PRIMARY KEY (fixture_id, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_goal_events_team ON goal_events(team_id);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            provider TEXT NOT NULL,
            seasons_total INTEGER NOT NULL,
            seasons_skipped INTEGER NOT NULL,
            units_written INTEGER NOT NULL,
            units_skipped INTEGER NOT NULL,
            fixture_rows INTEGER NOT NULL,
            event_rows INTEGER NOT NULL,
            api_calls INTEGER NOT NULL,
            warnings_json TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn upsert_fixture(
    tx: &Transaction<'_>,
    row: &FixtureRow,
    updated_at: &str,
) -> Result<(), PersistenceError> {
    tx.execute(
        r#"
        INSERT INTO fixtures (
            fixture_id, season, team_id, kickoff, status,
            home_team_id, away_team_id, home_team, away_team,
            goals_home, goals_away, ht_home, ht_away, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13, ?14
        )
        ON CONFLICT(fixture_id) DO UPDATE SET
            season = excluded.season,
            team_id = excluded.team_id,
            kickoff = excluded.kickoff,
            status = excluded.status,
            home_team_id = excluded.home_team_id,
            away_team_id = excluded.away_team_id,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            goals_home = excluded.goals_home,
            goals_away = excluded.goals_away,
            ht_home = excluded.ht_home,
            ht_away = excluded.ht_away,
            updated_at = excluded.updated_at
        "#,
        params![
            row.fixture_id as i64,
            row.season as i64,
            row.team_id as i64,
            row.kickoff,
            row.status,
            row.home_team_id as i64,
            row.away_team_id as i64,
            row.home_team,
            row.away_team,
            row.goals_home as i64,
            row.goals_away as i64,
            row.ht_home.map(i64::from),
            row.ht_away.map(i64::from),
            updated_at,
        ],
    )?;
    Ok(())
}

fn upsert_goal_event(tx: &Transaction<'_>, row: &GoalEventRow) -> Result<(), PersistenceError> {
    tx.execute(
        r#"
        INSERT INTO goal_events (
            fixture_id, seq, team_id, minute, extra, kind, detail, player
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(fixture_id, seq) DO UPDATE SET
            team_id = excluded.team_id,
            minute = excluded.minute,
            extra = excluded.extra,
            kind = excluded.kind,
            detail = excluded.detail,
            player = excluded.player
        "#,
        params![
            row.fixture_id as i64,
            row.seq as i64,
            row.team_id as i64,
            row.minute as i64,
            row.extra.map(i64::from),
            row.kind,
            row.detail,
            row.player,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_row(id: u64, goals_home: u8) -> FixtureRow {
        FixtureRow {
            fixture_id: id,
            season: 2024,
            team_id: 40,
            kickoff: "2024-09-01T15:00:00+00:00".to_string(),
            status: "FT".to_string(),
            home_team_id: 40,
            away_team_id: 42,
            home_team: "Liverpool".to_string(),
            away_team: "Arsenal".to_string(),
            goals_home,
            goals_away: 1,
            ht_home: Some(1),
            ht_away: None,
        }
    }

    #[test]
    fn fixture_upsert_overwrites_by_key() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.upsert_fixtures(&[fixture_row(7, 2)]).unwrap();
        store.upsert_fixtures(&[fixture_row(7, 3)]).unwrap();

        let rows = store.load_fixtures(2024).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].goals_home, 3);
        assert_eq!(rows[0].ht_home, Some(1));
        assert_eq!(rows[0].ht_away, None);
    }

    #[test]
    fn fixture_row_keeps_the_last_writing_team() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.upsert_fixtures(&[fixture_row(7, 2)]).unwrap();
        let arsenal_side = FixtureRow {
            team_id: 42,
            ..fixture_row(7, 2)
        };
        store.upsert_fixtures(&[arsenal_side]).unwrap();

        let rows = store.load_fixtures(2024).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].team_id, 42);
    }

    #[test]
    fn goal_event_without_fixture_is_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let orphan = GoalEventRow {
            fixture_id: 99,
            seq: 0,
            team_id: 40,
            minute: 12,
            extra: None,
            kind: "normal".to_string(),
            detail: "Normal Goal".to_string(),
            player: None,
        };
        assert!(store.upsert_goal_events(&[orphan]).is_err());
        assert_eq!(store.goal_event_count().unwrap(), 0);
    }
}
