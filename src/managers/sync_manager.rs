//! Periodic sheet sync.
//!
//! Each guild has at most one sync task. A task publishes on every interval
//! tick until either the class reaches its scheduled end or the session's
//! sync flag is cleared, in which case it publishes one last time first.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use poise::serenity_prelude::{ChannelId, GuildId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::notifier::SharedNotifier;
use super::publisher::{PassReport, SharedPublisher};
use crate::error::{BotError, Result};
use crate::sheets::SharedSheetsApi;
use crate::state::SharedSessionRegistry;

/// Where a sync session publishes to and reports back
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub sheet_title: String,
}

/// Result of starting a sync session
#[derive(Debug, Clone)]
pub struct SyncStarted {
    pub session_id: Uuid,
    /// Report of the immediate first pass; `None` when it failed and the
    /// failure was reported to the channel
    pub report: Option<PassReport>,
    /// End of periodic updates; `None` when only the first pass ran
    pub until: Option<DateTime<Utc>>,
}

struct SyncTask {
    session_id: Uuid,
    handle: JoinHandle<()>,
}

type TaskTable = Arc<Mutex<HashMap<GuildId, SyncTask>>>;

pub struct SyncManager {
    publisher: SharedPublisher,
    sessions: SharedSessionRegistry,
    sheets: Option<SharedSheetsApi>,
    notifier: SharedNotifier,
    interval: Duration,
    tasks: TaskTable,
}

impl SyncManager {
    pub fn new(
        publisher: SharedPublisher,
        sessions: SharedSessionRegistry,
        sheets: Option<SharedSheetsApi>,
        notifier: SharedNotifier,
        interval: Duration,
    ) -> Self {
        Self {
            publisher,
            sessions,
            sheets,
            notifier,
            interval,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fails when no spreadsheet is configured
    pub fn ensure_configured(&self) -> Result<SharedSheetsApi> {
        self.sheets.clone().ok_or_else(|| BotError::ConfigMissing {
            name: "SPREADSHEET_ID".to_string(),
        })
    }

    /// Publish once, then keep publishing until the class ends.
    ///
    /// Any task already running for the guild is aborted. A failed first
    /// pass is reported to the channel and retried on the next tick; it only
    /// fails the call when no ticks would follow.
    pub async fn start(&self, request: SyncRequest, now: DateTime<Utc>) -> Result<SyncStarted> {
        let api = self.ensure_configured()?;
        if request.sheet_title.trim().is_empty() {
            return Err(BotError::SheetNameEmpty);
        }
        let guild_id = request.guild_id;
        let until = self
            .sessions
            .class_end(guild_id, now)
            .ok_or(BotError::ClassTimeNotSet)?;

        self.cancel(guild_id);

        let session_id = Uuid::new_v4();
        info!(
            "Starting sync session {} for guild {} into sheet '{}'",
            session_id, guild_id, request.sheet_title
        );

        let first_pass = self
            .publisher
            .publish(api.as_ref(), guild_id, &request.sheet_title, now)
            .await;
        let remaining = until - now;
        let keep_syncing =
            self.sessions.is_sync_active(guild_id) && remaining > chrono::Duration::zero();

        let report = match first_pass {
            Ok(report) => Some(report),
            Err(e @ BotError::ClassTimeNotSet) => return Err(e),
            Err(e) if !keep_syncing => return Err(e),
            Err(e) => {
                error!("Sync session {} failed its first pass: {}", session_id, e);
                self.notifier
                    .say(request.channel_id, &format!("Failed to update sheet: {}", e))
                    .await;
                None
            }
        };

        if !keep_syncing {
            info!(
                "Class for guild {} already over, sync session {} ran a single pass",
                guild_id, session_id
            );
            return Ok(SyncStarted {
                session_id,
                report,
                until: None,
            });
        }
        let remaining = remaining.to_std().unwrap_or_default();

        let sync_loop = SyncLoop {
            session_id,
            request,
            api,
            publisher: self.publisher.clone(),
            sessions: self.sessions.clone(),
            notifier: self.notifier.clone(),
            interval: self.interval,
            tasks: self.tasks.clone(),
        };

        // Hold the table while spawning so the task cannot clear itself
        // before it is registered.
        let mut tasks = self.tasks.lock();
        let handle = tokio::spawn(sync_loop.run(remaining));
        if let Some(replaced) = tasks.insert(guild_id, SyncTask { session_id, handle }) {
            replaced.handle.abort();
            info!(
                "Sync session {} for guild {} replaced by {}",
                replaced.session_id, guild_id, session_id
            );
        }

        Ok(SyncStarted {
            session_id,
            report,
            until: Some(until),
        })
    }

    /// Abort the guild's sync task. Returns false when none was running.
    pub fn cancel(&self, guild_id: GuildId) -> bool {
        match self.tasks.lock().remove(&guild_id) {
            Some(task) => {
                let was_running = !task.handle.is_finished();
                task.handle.abort();
                if was_running {
                    info!("Aborted sync session {} for guild {}", task.session_id, guild_id);
                }
                was_running
            }
            None => false,
        }
    }

    pub fn is_running(&self, guild_id: GuildId) -> bool {
        self.tasks
            .lock()
            .get(&guild_id)
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }
}

/// State moved into a spawned sync task
struct SyncLoop {
    session_id: Uuid,
    request: SyncRequest,
    api: SharedSheetsApi,
    publisher: SharedPublisher,
    sessions: SharedSessionRegistry,
    notifier: SharedNotifier,
    interval: Duration,
    tasks: TaskTable,
}

impl SyncLoop {
    async fn run(self, remaining: Duration) {
        let guild_id = self.request.guild_id;
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep(remaining);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stopping = !self.sessions.is_sync_active(guild_id);
                    self.pass().await;
                    if stopping {
                        info!("Sync session {} halted by stop command", self.session_id);
                        break;
                    }
                }
                _ = &mut deadline => {
                    info!("Class ended, sync session {} stopping attendance updates", self.session_id);
                    break;
                }
            }
        }

        let mut tasks = self.tasks.lock();
        if tasks.get(&guild_id).map(|t| t.session_id) == Some(self.session_id) {
            tasks.remove(&guild_id);
        }
    }

    async fn pass(&self) {
        let result = self
            .publisher
            .publish(
                self.api.as_ref(),
                self.request.guild_id,
                &self.request.sheet_title,
                Utc::now(),
            )
            .await;

        match result {
            Ok(report) => debug!(
                "Sync session {} wrote {} marks into column {}",
                self.session_id, report.column.written, report.column.column
            ),
            Err(e @ BotError::ClassTimeNotSet) => {
                warn!("Sync session {}: {}", self.session_id, e);
                self.notifier.say(self.request.channel_id, &e.to_string()).await;
            }
            Err(e) => {
                error!("Sync session {} failed to update sheet: {}", self.session_id, e);
                self.notifier
                    .say(self.request.channel_id, &format!("Failed to update sheet: {}", e))
                    .await;
            }
        }
    }
}

pub type SharedSyncManager = Arc<SyncManager>;
