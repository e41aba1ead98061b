use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use std::sync::Arc;

/// A member's current stay in a voice channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenStay {
    pub event_id: i64,
    pub channel_id: ChannelId,
}

/// Open attendance events by member, so a leave closes the right row
#[derive(Default)]
pub struct VoicePresence {
    open: DashMap<(GuildId, UserId), OpenStay>,
}

impl VoicePresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, guild_id: GuildId, user_id: UserId) -> Option<OpenStay> {
        self.open.get(&(guild_id, user_id)).map(|s| *s)
    }

    /// Remember a new stay; returns the one it replaces
    pub fn open(&self, guild_id: GuildId, user_id: UserId, stay: OpenStay) -> Option<OpenStay> {
        self.open.insert((guild_id, user_id), stay)
    }

    pub fn close(&self, guild_id: GuildId, user_id: UserId) -> Option<OpenStay> {
        self.open.remove(&(guild_id, user_id)).map(|(_, stay)| stay)
    }
}

pub type SharedVoicePresence = Arc<VoicePresence>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_close() {
        let presence = VoicePresence::new();
        let (g, u) = (GuildId::new(1), UserId::new(2));
        let first = OpenStay { event_id: 1, channel_id: ChannelId::new(3) };
        let second = OpenStay { event_id: 2, channel_id: ChannelId::new(4) };

        assert_eq!(presence.open(g, u, first), None);
        assert_eq!(presence.open(g, u, second), Some(first));
        assert_eq!(presence.current(g, u), Some(second));
        assert_eq!(presence.close(g, u), Some(second));
        assert_eq!(presence.close(g, u), None);
    }
}
