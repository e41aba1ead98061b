use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, Http};
use std::sync::Arc;
use tracing::error;

/// Posts plain text into a channel. Background tasks report through this.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn say(&self, channel_id: ChannelId, text: &str);
}

pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn say(&self, channel_id: ChannelId, text: &str) {
        if let Err(e) = channel_id.say(&*self.http, text).await {
            error!("Failed to send message to channel {}: {}", channel_id, e);
        }
    }
}

pub type SharedNotifier = Arc<dyn Notifier>;

#[cfg(test)]
pub mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Keeps every message instead of sending it
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub messages: Mutex<Vec<(ChannelId, String)>>,
    }

    impl RecordingNotifier {
        pub fn texts(&self) -> Vec<String> {
            self.messages.lock().iter().map(|(_, t)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn say(&self, channel_id: ChannelId, text: &str) {
            self.messages.lock().push((channel_id, text.to_string()));
        }
    }
}
