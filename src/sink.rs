use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::pipeline::RunSummary;
use crate::snapshot::{SnapshotWriter, TeamSeasonSnapshot};
use crate::store::{FixtureRow, GoalEventRow, RowStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub snapshot: PathBuf,
    pub fixture_rows: usize,
    pub event_rows: usize,
    /// Set when the row upsert failed after the snapshot was written.
    pub row_error: Option<String>,
}

/// Writes a unit's two outputs: the snapshot document, then the keyed rows.
pub struct PersistenceSink {
    snapshots: SnapshotWriter,
    store: Option<Box<dyn RowStore>>,
}

impl PersistenceSink {
    pub fn new(snapshots: SnapshotWriter, store: Option<Box<dyn RowStore>>) -> Self {
        Self { snapshots, store }
    }

    pub fn snapshots(&self) -> &SnapshotWriter {
        &self.snapshots
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// A snapshot failure fails the unit. A row failure is reported but the
    /// snapshot stays written.
    pub fn persist(
        &mut self,
        snapshot: &TeamSeasonSnapshot,
    ) -> Result<SinkReport, PersistenceError> {
        let path = self.snapshots.write(snapshot)?;
        debug!(path = %path.display(), "snapshot written");

        let mut report = SinkReport {
            snapshot: path,
            ..SinkReport::default()
        };
        let Some(store) = self.store.as_mut() else {
            return Ok(report);
        };

        let team_id = snapshot.team.canonical_id;
        let fixtures = snapshot
            .fixtures
            .iter()
            .map(|fixture| FixtureRow::for_team(fixture, team_id))
            .collect::<Vec<_>>();
        let events = snapshot
            .goal_events
            .iter()
            .map(GoalEventRow::from)
            .collect::<Vec<_>>();
        let upserted = store
            .upsert_fixtures(&fixtures)
            .and_then(|f| store.upsert_goal_events(&events).map(|e| (f, e)));
        match upserted {
            Ok((fixture_rows, event_rows)) => {
                report.fixture_rows = fixture_rows;
                report.event_rows = event_rows;
            }
            Err(err) => {
                warn!(team = %snapshot.team.slug, season = snapshot.season, error = %err, "row upsert failed");
                report.row_error = Some(err.to_string());
            }
        }
        Ok(report)
    }

    pub fn record_run(&mut self, summary: &RunSummary) {
        if let Some(store) = self.store.as_mut()
            && let Err(err) = store.record_run(summary)
        {
            warn!(error = %err, "could not record ingest run");
        }
    }
}
