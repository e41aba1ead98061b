use chrono::{DateTime, Utc};
use poise::serenity_prelude::GuildId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::attendance::{evaluate, AttendanceVerdict, ClassWindow, DurationMode};
use crate::error::Result;
use crate::models::{AttendanceEvent, Student};
use crate::sheets::{ensure_sheet, write_statuses, ColumnWrite, EnsuredSheet, SheetsApi};
use crate::state::{SharedEventStore, SharedSessionRegistry};

/// Outcome of one evaluate-and-write pass
#[derive(Debug, Clone)]
pub struct PassReport {
    pub sheet: EnsuredSheet,
    pub column: ColumnWrite,
    pub students: usize,
    /// Students whose status could not be computed this pass
    pub unknown: usize,
}

/// Evaluates the roster of a guild and writes the results to a sheet
pub struct AttendancePublisher {
    store: SharedEventStore,
    sessions: SharedSessionRegistry,
    mode: DurationMode,
}

impl AttendancePublisher {
    pub fn new(store: SharedEventStore, sessions: SharedSessionRegistry, mode: DurationMode) -> Self {
        Self {
            store,
            sessions,
            mode,
        }
    }

    /// Verdict for one student; errors mean the status is unknown
    pub async fn verdict_for(
        &self,
        guild_id: GuildId,
        student: &Student,
        window: &ClassWindow,
        now: DateTime<Utc>,
    ) -> Result<AttendanceVerdict> {
        let rows = self
            .store
            .history_in_window(guild_id, &student.user_id, window.start, window.end)
            .await?;
        let history = rows
            .into_iter()
            .map(AttendanceEvent::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(evaluate(&history, window, now, self.mode))
    }

    /// Cell text for every student, in roster order
    pub async fn evaluate_roster(
        &self,
        guild_id: GuildId,
        roster: &[Student],
        window: &ClassWindow,
        now: DateTime<Utc>,
    ) -> Vec<Option<String>> {
        let mut statuses = Vec::with_capacity(roster.len());
        for student in roster {
            match self.verdict_for(guild_id, student, window, now).await {
                Ok(verdict) => {
                    if verdict.is_late() {
                        debug!("{} joined late: {}", student.username, verdict);
                    }
                    statuses.push(Some(verdict.to_string()));
                }
                Err(e) => {
                    warn!(
                        "Attendance for {} ({}) in guild {} is unknown: {}",
                        student.username, student.user_id, guild_id, e
                    );
                    statuses.push(None);
                }
            }
        }
        statuses
    }

    /// One full pass: roster, window, sheet, column
    pub async fn publish(
        &self,
        api: &dyn SheetsApi,
        guild_id: GuildId,
        sheet_title: &str,
        now: DateTime<Utc>,
    ) -> Result<PassReport> {
        let window = self.sessions.window_for(guild_id, now)?;
        let roster = self.store.students(guild_id).await?;
        let today = window.day();

        debug!(
            "Class window for guild {}: {} .. {}",
            guild_id,
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        );

        let sheet = ensure_sheet(api, sheet_title, today, &roster).await?;
        let statuses = self.evaluate_roster(guild_id, &roster, &window, now).await;
        let unknown = statuses.iter().filter(|s| s.is_none()).count();
        let column = write_statuses(api, sheet_title, today, &statuses).await?;

        info!(
            "Sheet '{}' updated with {} attendance marks ({} unknown)",
            sheet_title, column.written, unknown
        );

        Ok(PassReport {
            sheet,
            column,
            students: roster.len(),
            unknown,
        })
    }
}

pub type SharedPublisher = Arc<AttendancePublisher>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassConfig;
    use crate::sheets::memory::MemorySheets;
    use crate::state::{EventStore, SessionRegistry};
    use chrono::{Duration, NaiveTime, TimeZone};
    use poise::serenity_prelude::UserId;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
    }

    fn guild() -> GuildId {
        GuildId::new(1)
    }

    async fn setup() -> (SharedEventStore, SharedSessionRegistry, AttendancePublisher) {
        let store = Arc::new(EventStore::in_memory().await.unwrap());
        let sessions = Arc::new(SessionRegistry::new(ClassConfig::default()));
        let publisher = AttendancePublisher::new(store.clone(), sessions.clone(), DurationMode::Clipped);
        (store, sessions, publisher)
    }

    async fn stay(store: &EventStore, user: u64, join: DateTime<Utc>, leave: DateTime<Utc>) {
        let id = store.record_join(guild(), UserId::new(user), join, "backend").await.unwrap();
        store.record_leave(id, leave).await.unwrap();
    }

    #[tokio::test]
    async fn test_roster_of_three_with_one_absent() {
        let (store, sessions, publisher) = setup().await;
        for (id, name) in [(1, "ann"), (2, "bob"), (3, "cat")] {
            store.upsert_student(guild(), UserId::new(id), name).await.unwrap();
        }
        stay(&store, 1, at(8, 50), at(9, 5)).await;
        stay(&store, 2, at(9, 10), at(9, 40)).await;
        sessions.start_session_now(guild(), at(8, 45));

        let sheets = MemorySheets::new();
        let report = publisher
            .publish(&sheets, guild(), "Backend", at(11, 0))
            .await
            .unwrap();

        assert!(report.sheet.created);
        assert_eq!(report.students, 3);
        assert_eq!(report.unknown, 0);
        assert_eq!(report.column.column, 2);
        assert_eq!(
            sheets.column("Backend", 2),
            vec![
                Some("X 16%".to_string()),
                Some("L 25m0s 33%".to_string()),
                Some("A 0%".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_early_stop_uses_stop_time_as_end() {
        let (store, sessions, publisher) = setup().await;
        store.upsert_student(guild(), UserId::new(1), "ann").await.unwrap();
        stay(&store, 1, at(8, 35), at(10, 15)).await;
        sessions.start_session_now(guild(), at(8, 45));
        sessions.stop_session(guild(), at(10, 0));

        let window = sessions.window_for(guild(), at(10, 0)).unwrap();
        assert_eq!(window.end, at(9, 55));
        assert_eq!(window.class_duration, Duration::minutes(80));

        let sheets = MemorySheets::new();
        publisher.publish(&sheets, guild(), "Backend", at(10, 0)).await.unwrap();
        assert_eq!(sheets.column("Backend", 2), vec![Some("X 100%".to_string())]);
    }

    #[tokio::test]
    async fn test_corrupt_row_only_affects_one_student() {
        let (store, sessions, publisher) = setup().await;
        store.upsert_student(guild(), UserId::new(1), "ann").await.unwrap();
        store.upsert_student(guild(), UserId::new(2), "bob").await.unwrap();
        stay(&store, 1, at(8, 50), at(9, 5)).await;
        store
            .insert_raw(guild(), "2", "2024-05-06T09:00:00.000000Z", Some("garbage"))
            .await
            .unwrap();
        sessions.start_session_now(guild(), at(8, 45));

        let sheets = MemorySheets::with_sheet("Backend", &["Number", "Username", "Mark 2024-05-06"]);
        let report = publisher.publish(&sheets, guild(), "Backend", at(11, 0)).await.unwrap();

        assert_eq!(report.unknown, 1);
        assert_eq!(report.column.written, 1);
        assert_eq!(sheets.column("Backend", 2), vec![Some("X 16%".to_string())]);
    }

    #[tokio::test]
    async fn test_class_across_midnight_keeps_one_column() {
        let (store, sessions, publisher) = setup().await;
        store.upsert_student(guild(), UserId::new(1), "ann").await.unwrap();
        let next_day = |h, m| Utc.with_ymd_and_hms(2024, 5, 7, h, m, 0).unwrap();
        stay(&store, 1, at(23, 50), next_day(0, 20)).await;
        // 07:10 at UTC+7 is stored as 23:53 UTC the evening before
        sessions.set_class_time(guild(), NaiveTime::from_hms_opt(7, 10, 0).unwrap(), at(22, 0));

        let sheets = MemorySheets::new();
        publisher.publish(&sheets, guild(), "Backend", at(23, 59)).await.unwrap();
        let report = publisher
            .publish(&sheets, guild(), "Backend", next_day(0, 30))
            .await
            .unwrap();

        assert_eq!(report.column.column, 2);
        assert_eq!(sheets.header("Backend"), vec!["Number", "Username", "Mark 2024-05-06"]);
        assert_eq!(sheets.column("Backend", 2), vec![Some("X 33%".to_string())]);
    }

    #[tokio::test]
    async fn test_publish_without_class_time_fails() {
        let (_store, _sessions, publisher) = setup().await;
        let sheets = MemorySheets::new();
        let err = publisher
            .publish(&sheets, guild(), "Backend", at(11, 0))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Class time not found.");
        assert!(sheets.list_sheets().await.unwrap().is_empty());
    }
}
