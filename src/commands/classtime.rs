use chrono::{NaiveTime, Utc};
use tracing::info;

use super::require_guild;
use crate::messages::class_time_message;
use crate::state::SessionRegistry;
use crate::{Context, Error};

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Set the class start time (HH:MM, local time)
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn setclasstime(
    ctx: Context<'_>,
    #[description = "Class start time, HH:MM"] time: String,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    let local = SessionRegistry::parse_time_of_day(&time)?;

    let sessions = &ctx.data().sessions;
    let stored = sessions.set_class_time(guild_id, local, Utc::now());
    info!("Class time {} stored as {} UTC for guild {}", time, stored.format("%H:%M"), guild_id);

    let shown = sessions.show_class_time(guild_id).unwrap_or(local);
    ctx.say(class_time_message(&format_time(shown))).await?;
    Ok(())
}

/// Show the class start time
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn classtime(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    let text = match ctx.data().sessions.show_class_time(guild_id) {
        Some(time) => class_time_message(&format_time(time)),
        None => "No class time is set.".to_string(),
    };
    ctx.say(text).await?;
    Ok(())
}

/// Delete the class start time
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn delclasstime(
    ctx: Context<'_>,
    #[description = "Class start time, HH:MM"] time: String,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    SessionRegistry::parse_time_of_day(&time)?;

    let text = if ctx.data().sessions.delete_class_time(guild_id) {
        "Class time deleted."
    } else {
        "Class time is not set."
    };
    ctx.say(text).await?;
    Ok(())
}
