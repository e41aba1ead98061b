//! Gateway events reduced to the few things the bot reacts to.

pub mod reaction;
pub mod voice;

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{self as serenity, ChannelId, FullEvent, GuildId, Reaction, ReactionType, UserId};
use tracing::{debug, info};

use crate::error::Result;
use crate::state::VoicePresence;
use crate::Data;

pub use reaction::ReactionChange;
pub use voice::{voice_transition, VoiceTransition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    MemberJoinedVoice {
        guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
        channel_name: String,
        at: DateTime<Utc>,
    },
    MemberLeftVoice {
        guild_id: GuildId,
        user_id: UserId,
        at: DateTime<Utc>,
    },
    CommandReceived {
        guild_id: Option<GuildId>,
        user_id: UserId,
        name: String,
    },
    ReactionChanged(ReactionChange),
}

/// Domain events carried by a gateway event, in the order they happened
pub async fn translate(ctx: &serenity::Context, event: &FullEvent, presence: &VoicePresence) -> Vec<DomainEvent> {
    match event {
        FullEvent::VoiceStateUpdate { new, .. } => {
            let Some(guild_id) = new.guild_id else {
                return Vec::new();
            };
            let user_id = new.user_id;
            let previous = presence.current(guild_id, user_id).map(|s| s.channel_id);
            let at = Utc::now();

            match voice_transition(previous, new.channel_id) {
                VoiceTransition::Joined(to) => vec![joined(ctx, guild_id, user_id, to, at).await],
                VoiceTransition::Left(_) => vec![DomainEvent::MemberLeftVoice { guild_id, user_id, at }],
                VoiceTransition::Switched { to, .. } => vec![
                    DomainEvent::MemberLeftVoice { guild_id, user_id, at },
                    joined(ctx, guild_id, user_id, to, at).await,
                ],
                VoiceTransition::Unchanged => Vec::new(),
            }
        }
        FullEvent::ReactionAdd { add_reaction } => reaction_change(add_reaction, true)
            .map(DomainEvent::ReactionChanged)
            .into_iter()
            .collect(),
        FullEvent::ReactionRemove { removed_reaction } => reaction_change(removed_reaction, false)
            .map(DomainEvent::ReactionChanged)
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

async fn joined(
    ctx: &serenity::Context,
    guild_id: GuildId,
    user_id: UserId,
    channel_id: ChannelId,
    at: DateTime<Utc>,
) -> DomainEvent {
    let channel_name = match channel_id.to_channel(ctx).await {
        Ok(channel) => channel
            .guild()
            .map(|c| c.name)
            .unwrap_or_else(|| channel_id.to_string()),
        Err(e) => {
            debug!("Could not resolve channel {}: {}", channel_id, e);
            channel_id.to_string()
        }
    };
    DomainEvent::MemberJoinedVoice {
        guild_id,
        user_id,
        channel_id,
        channel_name,
        at,
    }
}

fn reaction_change(reaction: &Reaction, added: bool) -> Option<ReactionChange> {
    let emoji = match &reaction.emoji {
        ReactionType::Unicode(s) => s.clone(),
        other => other.to_string(),
    };
    Some(ReactionChange {
        channel_id: reaction.channel_id,
        message_id: reaction.message_id,
        user_id: reaction.user_id?,
        emoji,
        added,
    })
}

/// Apply one domain event
pub async fn dispatch(ctx: &serenity::Context, data: &Data, event: DomainEvent) -> Result<()> {
    match event {
        DomainEvent::MemberJoinedVoice {
            guild_id,
            user_id,
            channel_id,
            channel_name,
            at,
        } => {
            voice::member_joined(&data.store, &data.presence, guild_id, user_id, channel_id, &channel_name, at)
                .await?;
        }
        DomainEvent::MemberLeftVoice { guild_id, user_id, at } => {
            voice::member_left(&data.store, &data.presence, guild_id, user_id, at).await?;
        }
        DomainEvent::CommandReceived { guild_id, user_id, name } => {
            info!(
                "Command '{}' invoked by {} in {}",
                name,
                user_id,
                guild_id.map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
            );
        }
        DomainEvent::ReactionChanged(change) => {
            let bot_id = ctx.cache.current_user().id;
            reaction::handle_reaction(&ctx.http, &data.role_manager, data.notifier.as_ref(), &change, bot_id)
                .await?;
        }
    }
    Ok(())
}
