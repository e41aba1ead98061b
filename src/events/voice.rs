use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::state::{EventStore, OpenStay, VoicePresence};

/// What a voice state update means for attendance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    Joined(ChannelId),
    Left(ChannelId),
    Switched { from: ChannelId, to: ChannelId },
    /// Mute, deafen or similar on the same channel
    Unchanged,
}

/// Classify a voice update from the tracked channel and the reported one
pub fn voice_transition(previous: Option<ChannelId>, current: Option<ChannelId>) -> VoiceTransition {
    match (previous, current) {
        (None, Some(to)) => VoiceTransition::Joined(to),
        (Some(from), None) => VoiceTransition::Left(from),
        (Some(from), Some(to)) if from != to => VoiceTransition::Switched { from, to },
        _ => VoiceTransition::Unchanged,
    }
}

/// Open an attendance event, closing any stay still open for the member
pub async fn member_joined(
    store: &EventStore,
    presence: &VoicePresence,
    guild_id: GuildId,
    user_id: UserId,
    channel_id: ChannelId,
    channel_name: &str,
    at: DateTime<Utc>,
) -> Result<i64> {
    if presence.current(guild_id, user_id).is_some() {
        member_left(store, presence, guild_id, user_id, at).await?;
    }

    let event_id = store.record_join(guild_id, user_id, at, channel_name).await?;
    presence.open(guild_id, user_id, OpenStay { event_id, channel_id });
    info!("User {} joined voice channel '{}' in guild {}", user_id, channel_name, guild_id);
    Ok(event_id)
}

/// Close the member's open attendance event. Returns false when there was none.
pub async fn member_left(
    store: &EventStore,
    presence: &VoicePresence,
    guild_id: GuildId,
    user_id: UserId,
    at: DateTime<Utc>,
) -> Result<bool> {
    let Some(stay) = presence.close(guild_id, user_id) else {
        debug!("Ignoring leave of user {} with no recorded join", user_id);
        return Ok(false);
    };

    if !store.record_leave(stay.event_id, at).await? {
        warn!("Attendance event {} was already closed", stay.event_id);
        return Ok(false);
    }
    info!("User {} left voice channel {} in guild {}", user_id, stay.channel_id, guild_id);
    Ok(true)
}
