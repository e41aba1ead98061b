use poise::serenity_prelude as serenity;
use std::time::Instant;
use tracing::debug;

use crate::messages::{command_help, COMMANDS, UNKNOWN_COMMAND};
use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let started = Instant::now();
    let reply = ctx.say("Pong!").await?;
    let elapsed = started.elapsed().as_millis();
    debug!("Ping round trip took {} ms", elapsed);

    reply
        .edit(
            ctx,
            poise::CreateReply::default().content(format!("Pong! ({} ms)", elapsed)),
        )
        .await?;
    Ok(())
}

/// Show help information
#[poise::command(prefix_command, slash_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to explain"] command: Option<String>,
) -> Result<(), Error> {
    if let Some(name) = command {
        let text = command_help(&name)
            .map(|c| c.description)
            .unwrap_or(UNKNOWN_COMMAND);
        ctx.say(text).await?;
        return Ok(());
    }

    let embed = COMMANDS.iter().fold(
        serenity::CreateEmbed::new()
            .title("Available Commands")
            .description("Use the following commands to interact with the bot:")
            .color(0x00ff00),
        |embed, c| embed.field(format!("- {}", c.usage), c.description, false),
    );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
