use poise::serenity_prelude::{ChannelId, Http, MessageId, UserId};
use tracing::{debug, error};

use crate::error::Result;
use crate::managers::{Notifier, RoleBinding, RoleManager, REACTION_EMOJI};

/// A reaction added to or removed from a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionChange {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
    pub added: bool,
}

/// Role change requested by a reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Assign(RoleBinding),
    Remove(RoleBinding),
}

/// Decide what a reaction does. Only ✅ by someone other than the bot counts.
pub fn reaction_action(
    binding: Option<RoleBinding>,
    emoji: &str,
    user_id: UserId,
    bot_id: UserId,
    added: bool,
) -> Option<RoleAction> {
    if emoji != REACTION_EMOJI || user_id == bot_id {
        return None;
    }
    let binding = binding?;
    Some(if added {
        RoleAction::Assign(binding)
    } else {
        RoleAction::Remove(binding)
    })
}

/// Apply a reaction to a bound message; failures go to the bound channel
pub async fn handle_reaction(
    http: &Http,
    roles: &RoleManager,
    notifier: &dyn Notifier,
    change: &ReactionChange,
    bot_id: UserId,
) -> Result<()> {
    let binding = roles.binding_for(change.message_id);
    let Some(action) = reaction_action(binding, &change.emoji, change.user_id, bot_id, change.added) else {
        return Ok(());
    };

    let user_id = change.user_id;
    let (binding, result) = match action {
        RoleAction::Assign(b) => (b, roles.assign_role(http, b.guild_id, user_id, b.role_id).await),
        RoleAction::Remove(b) => (b, roles.remove_role(http, b.guild_id, user_id, b.role_id).await),
    };

    match result {
        Ok(()) => {
            debug!("Reaction role {:?} applied for user {}", action, user_id);
            Ok(())
        }
        Err(e) => {
            let verb = if change.added { "assign" } else { "remove" };
            error!("Failed to {} role {} for user {}: {}", verb, binding.role_id, user_id, e);
            notifier
                .say(binding.channel_id, &format!("Failed to {} role: {}", verb, e))
                .await;
            Err(e)
        }
    }
}
