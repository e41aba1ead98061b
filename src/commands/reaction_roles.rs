use poise::serenity_prelude::ReactionType;

use super::require_guild;
use crate::error::BotError;
use crate::managers::{RoleBinding, REACTION_EMOJI};
use crate::messages::REACROLE_USAGE;
use crate::{Context, Error};

/// Split `<role> <message…>`; the message keeps its own spacing
pub fn split_role_and_message(args: &str) -> Option<(&str, &str)> {
    let (role, message) = args.trim_start().split_once(char::is_whitespace)?;
    let message = message.trim();
    if role.is_empty() || message.is_empty() {
        return None;
    }
    Some((role, message))
}

/// Post a message whose ✅ reaction grants a role
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn reacrole(
    ctx: Context<'_>,
    #[rest]
    #[description = "Role name followed by the message to post"]
    args: Option<String>,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    let args = args.unwrap_or_default();
    let Some((role_name, text)) = split_role_and_message(&args) else {
        ctx.say(REACROLE_USAGE).await?;
        return Ok(());
    };

    let roles = &ctx.data().role_manager;
    let role_id = match roles.get_role_id(ctx.http(), guild_id, role_name).await {
        Ok(id) => id,
        Err(BotError::RoleNotFound { .. }) => {
            ctx.say(format!("Role '{}' not found.", role_name)).await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let message = ctx.channel_id().say(ctx.http(), text).await?;
    message
        .react(ctx.http(), ReactionType::Unicode(REACTION_EMOJI.to_string()))
        .await?;

    roles
        .bind_reaction_role(
            message.id,
            RoleBinding {
                guild_id,
                channel_id: message.channel_id,
                role_id,
            },
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_role_and_message() {
        assert_eq!(
            split_role_and_message("4year For 4th year students!  React below"),
            Some(("4year", "For 4th year students!  React below"))
        );
        assert_eq!(split_role_and_message("4year"), None);
        assert_eq!(split_role_and_message("4year   "), None);
        assert_eq!(split_role_and_message(""), None);
    }
}
