use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike, Utc};
use dashmap::DashMap;
use poise::serenity_prelude::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

use crate::attendance::ClassWindow;
use crate::config::ClassConfig;
use crate::error::{BotError, Result};

/// How far a stop command backdates the end of the class
pub fn stop_backdate() -> Duration {
    Duration::minutes(5)
}

/// Per-guild class session. Lives only in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassSession {
    /// Class start, minute precision, UTC
    pub class_start: Option<DateTime<Utc>>,
    /// Set by an explicit stop; replaces start + default duration as the end
    pub end_override: Option<DateTime<Utc>>,
    /// While true the sync task keeps publishing
    pub sync_active: bool,
}

/// All class sessions, one per guild.
///
/// Every operation locks just the guild's entry, so a stop command and a
/// sync tick for the same guild never interleave halfway.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, ClassSession>,
    class: ClassConfig,
}

impl SessionRegistry {
    pub fn new(class: ClassConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            class,
        }
    }

    /// Parse an `HH:MM` argument
    pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map_err(|_| BotError::invalid_input("Invalid time format. Please use format HH:MM."))
    }

    /// Store a class time given in the local timezone.
    ///
    /// The stored instant is shifted back by the configured correction; the
    /// same amount is added back when the time is shown.
    pub fn set_class_time(
        &self,
        guild_id: GuildId,
        local_time: NaiveTime,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let local_today = now.with_timezone(&self.class.utc_offset).date_naive();
        let local = local_today.and_time(local_time);
        let utc = self
            .class
            .utc_offset
            .from_local_datetime(&local)
            .single()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local))
            - self.class.time_correction;

        self.set_class_start(guild_id, utc);
        info!("Class time for guild {} set to {} UTC", guild_id, utc.format("%H:%M"));
        utc
    }

    /// Overwrite the class start with an exact instant
    pub fn set_class_start(&self, guild_id: GuildId, start: DateTime<Utc>) {
        let mut session = self.sessions.entry(guild_id).or_default();
        session.class_start = Some(start);
        session.end_override = None;
    }

    /// Class time in the local timezone, as originally entered
    pub fn show_class_time(&self, guild_id: GuildId) -> Option<NaiveTime> {
        let start = self.sessions.get(&guild_id)?.class_start?;
        Some((start.with_timezone(&self.class.utc_offset) + self.class.time_correction).time())
    }

    /// Clear the class time. Returns false when none was set.
    pub fn delete_class_time(&self, guild_id: GuildId) -> bool {
        match self.sessions.get_mut(&guild_id) {
            Some(mut session) if session.class_start.is_some() => {
                session.class_start = None;
                debug!("Class time for guild {} deleted", guild_id);
                true
            }
            _ => false,
        }
    }

    /// Start a class right now and turn sync on
    pub fn start_session_now(&self, guild_id: GuildId, now: DateTime<Utc>) -> DateTime<Utc> {
        let start = truncate_to_minute(now);
        let mut session = self.sessions.entry(guild_id).or_default();
        session.class_start = Some(start);
        session.end_override = None;
        session.sync_active = true;
        info!("Class for guild {} started now ({} UTC)", guild_id, start.format("%H:%M"));
        start
    }

    /// Turn sync on for an already configured class time
    pub fn activate_sync(&self, guild_id: GuildId) -> Result<ClassSession> {
        let mut session = self
            .sessions
            .get_mut(&guild_id)
            .filter(|s| s.class_start.is_some())
            .ok_or(BotError::ClassTimeNotSet)?;
        session.sync_active = true;
        session.end_override = None;
        Ok(*session)
    }

    /// Stop syncing and close the class a few minutes in the past
    pub fn stop_session(&self, guild_id: GuildId, now: DateTime<Utc>) -> DateTime<Utc> {
        let end = now - stop_backdate();
        let mut session = self.sessions.entry(guild_id).or_default();
        session.sync_active = false;
        session.end_override = Some(end);
        info!("Sync for guild {} stopped, class end set to {}", guild_id, end);
        end
    }

    pub fn snapshot(&self, guild_id: GuildId) -> Option<ClassSession> {
        self.sessions.get(&guild_id).map(|s| *s)
    }

    pub fn is_sync_active(&self, guild_id: GuildId) -> bool {
        self.sessions
            .get(&guild_id)
            .map(|s| s.sync_active)
            .unwrap_or(false)
    }

    /// Scheduled end of the class nearest `now`: start + default duration,
    /// or the stop time
    pub fn class_end(&self, guild_id: GuildId, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window_for(guild_id, now).ok().map(|window| window.end)
    }

    /// Window for the guild's class occurrence nearest `now`
    pub fn window_for(&self, guild_id: GuildId, now: DateTime<Utc>) -> Result<ClassWindow> {
        let session = self.snapshot(guild_id).ok_or(BotError::ClassTimeNotSet)?;
        let start = session.class_start.ok_or(BotError::ClassTimeNotSet)?;
        Ok(ClassWindow::nearest(
            start,
            session.end_override,
            now,
            self.class.default_duration,
        ))
    }
}

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Shared session registry type
pub type SharedSessionRegistry = Arc<SessionRegistry>;

pub fn create_shared_session_registry(class: ClassConfig) -> SharedSessionRegistry {
    Arc::new(SessionRegistry::new(class))
}
