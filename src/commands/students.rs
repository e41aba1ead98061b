use tracing::error;

use super::require_guild;
use crate::error::BotError;
use crate::messages::students_added_message;
use crate::{Context, Error};

/// Put every member with a role on the class roster
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn setstudent(
    ctx: Context<'_>,
    #[rest]
    #[description = "Role name"]
    role: Option<String>,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    let Some(role_name) = role.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) else {
        ctx.say("Usage: !setstudent [role name]").await?;
        return Ok(());
    };

    let data = ctx.data();
    match data
        .role_manager
        .enroll_students(ctx.http(), guild_id, &role_name)
        .await
    {
        Ok(count) => {
            ctx.say(students_added_message(count, &role_name)).await?;
        }
        Err(BotError::RoleNotFound { .. }) => {
            ctx.say("Role not found.").await?;
        }
        Err(e) => {
            error!("Failed to enroll students with role '{}': {}", role_name, e);
            ctx.say("Failed to fetch members.").await?;
        }
    }
    Ok(())
}
