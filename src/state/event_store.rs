use chrono::{DateTime, Utc};
use poise::serenity_prelude::{GuildId, UserId};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{to_db_timestamp, AttendanceRow, ReactionRoleBinding, Student};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Join/leave log, student roster and reaction-role bindings
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Open (creating if missing) the database at `database_url` and migrate it
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Opening database: {}", database_url);
        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database, for tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection to :memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        MIGRATOR.run(&pool).await?;
        debug!("Migrations applied");
        Ok(Self { pool })
    }

    /// Open a new event for a member joining a voice channel; returns its id
    pub async fn record_join(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        join_time: DateTime<Utc>,
        voice_channel: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO attendance (guild_id, user_id, join_time, voice_channel) VALUES (?, ?, ?, ?)",
        )
        .bind(guild_id.to_string())
        .bind(user_id.to_string())
        .bind(to_db_timestamp(join_time))
        .bind(voice_channel)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Close an open event. Returns false when no open event has that id.
    pub async fn record_leave(&self, event_id: i64, leave_time: DateTime<Utc>) -> Result<bool> {
        let result =
            sqlx::query("UPDATE attendance SET leave_time = ? WHERE id = ? AND leave_time IS NULL")
                .bind(to_db_timestamp(leave_time))
                .bind(event_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Events of one member overlapping `[start, end)`, earliest first
    pub async fn history_in_window(
        &self,
        guild_id: GuildId,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRow>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT id, guild_id, user_id, join_time, leave_time, voice_channel
             FROM attendance
             WHERE guild_id = ? AND user_id = ? AND join_time < ? AND (leave_time IS NULL OR leave_time > ?)
             ORDER BY join_time ASC",
        )
        .bind(guild_id.to_string())
        .bind(user_id)
        .bind(to_db_timestamp(end))
        .bind(to_db_timestamp(start))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Members who joined `voice_channel` within `[from, to]`, in order of first join
    pub async fn joined_channel_between(
        &self,
        guild_id: GuildId,
        voice_channel: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT user_id FROM attendance
             WHERE guild_id = ? AND voice_channel = ? AND join_time >= ? AND join_time <= ?
             GROUP BY user_id
             ORDER BY MIN(join_time) ASC",
        )
        .bind(guild_id.to_string())
        .bind(voice_channel)
        .bind(to_db_timestamp(from))
        .bind(to_db_timestamp(to))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Add a student or refresh their username. The row keeps its position.
    pub async fn upsert_student(&self, guild_id: GuildId, user_id: UserId, username: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO students (guild_id, user_id, username) VALUES (?, ?, ?)
             ON CONFLICT (guild_id, user_id) DO UPDATE SET username = excluded.username",
        )
        .bind(guild_id.to_string())
        .bind(user_id.to_string())
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Roster of a guild in insertion order
    pub async fn students(&self, guild_id: GuildId) -> Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT user_id, username FROM students WHERE guild_id = ? ORDER BY id ASC",
        )
        .bind(guild_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }

    pub async fn save_reaction_role(&self, binding: &ReactionRoleBinding) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO reaction_roles (message_id, guild_id, channel_id, role_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&binding.message_id)
        .bind(&binding.guild_id)
        .bind(&binding.channel_id)
        .bind(&binding.role_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn reaction_roles(&self) -> Result<Vec<ReactionRoleBinding>> {
        let bindings = sqlx::query_as::<_, ReactionRoleBinding>(
            "SELECT message_id, guild_id, channel_id, role_id FROM reaction_roles",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(bindings)
    }

    #[cfg(test)]
    pub async fn insert_raw(&self, guild_id: GuildId, user_id: &str, join: &str, leave: Option<&str>) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO attendance (guild_id, user_id, join_time, leave_time, voice_channel) VALUES (?, ?, ?, ?, 'raw')",
        )
        .bind(guild_id.to_string())
        .bind(user_id)
        .bind(join)
        .bind(leave)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

/// Shared event store type
pub type SharedEventStore = Arc<EventStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
    }

    fn guild() -> GuildId {
        GuildId::new(1)
    }

    #[tokio::test]
    async fn test_join_and_leave() {
        let store = EventStore::in_memory().await.unwrap();
        let user = UserId::new(10);

        let id = store.record_join(guild(), user, at(8, 50), "backend").await.unwrap();
        assert!(store.record_leave(id, at(9, 5)).await.unwrap());
        // Already closed
        assert!(!store.record_leave(id, at(9, 6)).await.unwrap());

        let rows = store
            .history_in_window(guild(), "10", at(8, 35), at(10, 15))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].voice_channel, "backend");
        assert_eq!(rows[0].leave_time.as_deref(), Some("2024-05-06T09:05:00.000000Z"));
    }

    #[tokio::test]
    async fn test_history_window_filter() {
        let store = EventStore::in_memory().await.unwrap();
        let user = UserId::new(10);

        // Before the window
        let early = store.record_join(guild(), user, at(7, 0), "a").await.unwrap();
        store.record_leave(early, at(8, 0)).await.unwrap();
        // Overlapping the start
        let overlap = store.record_join(guild(), user, at(8, 30), "a").await.unwrap();
        store.record_leave(overlap, at(8, 40)).await.unwrap();
        // Still open
        store.record_join(guild(), user, at(9, 0), "a").await.unwrap();
        // After the window
        store.record_join(guild(), user, at(10, 30), "a").await.unwrap();
        // Someone else
        store.record_join(guild(), UserId::new(11), at(9, 0), "a").await.unwrap();

        let rows = store
            .history_in_window(guild(), "10", at(8, 35), at(10, 15))
            .await
            .unwrap();
        let joins: Vec<_> = rows.iter().map(|r| r.join_time.clone()).collect();
        assert_eq!(
            joins,
            vec![to_db_timestamp(at(8, 30)), to_db_timestamp(at(9, 0))]
        );
    }

    #[tokio::test]
    async fn test_joined_channel_between() {
        let store = EventStore::in_memory().await.unwrap();
        let t = at(8, 45);
        store.record_join(guild(), UserId::new(2), t, "backend").await.unwrap();
        store.record_join(guild(), UserId::new(1), t + Duration::minutes(1), "backend").await.unwrap();
        store.record_join(guild(), UserId::new(2), t + Duration::minutes(2), "backend").await.unwrap();
        store.record_join(guild(), UserId::new(3), t, "frontend").await.unwrap();
        store.record_join(guild(), UserId::new(4), t + Duration::hours(3), "backend").await.unwrap();

        let users = store
            .joined_channel_between(guild(), "backend", t - Duration::minutes(10), t + Duration::minutes(90))
            .await
            .unwrap();
        assert_eq!(users, vec!["2".to_string(), "1".to_string()]);
    }

    #[tokio::test]
    async fn test_student_upsert_keeps_order() {
        let store = EventStore::in_memory().await.unwrap();
        store.upsert_student(guild(), UserId::new(5), "ann").await.unwrap();
        store.upsert_student(guild(), UserId::new(6), "bob").await.unwrap();
        store.upsert_student(guild(), UserId::new(5), "ann2").await.unwrap();
        store.upsert_student(GuildId::new(2), UserId::new(7), "cat").await.unwrap();

        let students = store.students(guild()).await.unwrap();
        assert_eq!(
            students,
            vec![
                Student { user_id: "5".to_string(), username: "ann2".to_string() },
                Student { user_id: "6".to_string(), username: "bob".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_reaction_role_bindings() {
        let store = EventStore::in_memory().await.unwrap();
        let binding = ReactionRoleBinding {
            message_id: "100".to_string(),
            guild_id: "1".to_string(),
            channel_id: "2".to_string(),
            role_id: "3".to_string(),
        };
        store.save_reaction_role(&binding).await.unwrap();
        store.save_reaction_role(&binding).await.unwrap();
        assert_eq!(store.reaction_roles().await.unwrap(), vec![binding]);
    }
}
