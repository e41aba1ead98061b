use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot that tracks voice-channel attendance and publishes it to Google Sheets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands to all guilds (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,

    /// Database URL, overrides DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,
}

mod attendance;
mod commands;
mod config;
mod error;
mod events;
mod logging;
mod managers;
mod messages;
mod models;
mod sheets;
mod state;

use attendance::DurationMode;
use config::BotConfig;
use managers::{
    create_shared_role_manager, AttendancePublisher, DiscordNotifier, SharedNotifier,
    SharedRoleManager, SharedSyncManager, SyncManager,
};
use sheets::{GoogleSheetsClient, SharedSheetsApi};
use state::{
    create_shared_session_registry, EventStore, SharedEventStore, SharedSessionRegistry,
    SharedVoicePresence, VoicePresence,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: BotConfig,
    pub sessions: SharedSessionRegistry,
    pub store: SharedEventStore,
    pub presence: SharedVoicePresence,
    pub role_manager: SharedRoleManager,
    pub sync_manager: SharedSyncManager,
    pub notifier: SharedNotifier,
    pub sheets: Option<SharedSheetsApi>,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    for domain_event in events::translate(ctx, event, &data.presence).await {
        if let Err(e) = events::dispatch(ctx, data, domain_event).await {
            error!("Failed to handle {} event: {}", event.snake_case_name(), e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let mut config = BotConfig::from_env()?;
    let level = logging::init(&config.log_level);
    info!("Logging at level {}", level);

    if let Some(url) = args.database_url.clone() {
        config.database_url = url;
    }

    let store: SharedEventStore = Arc::new(EventStore::connect(&config.database_url).await?);
    let sessions = create_shared_session_registry(config.class.clone());
    let presence: SharedVoicePresence = Arc::new(VoicePresence::new());

    let role_manager = create_shared_role_manager(store.clone());
    if let Err(e) = role_manager.load_bindings().await {
        error!("Failed to load reaction-role bindings: {}", e);
    }

    let sheets: Option<SharedSheetsApi> = GoogleSheetsClient::from_config(&config.sheets)
        .map(|client| Arc::new(client) as SharedSheetsApi);
    if sheets.is_none() {
        warn!("SPREADSHEET_ID not set: marksheet will be unavailable");
    }

    let publisher = Arc::new(AttendancePublisher::new(
        store.clone(),
        sessions.clone(),
        DurationMode::from_clip_flag(config.class.clip_to_window),
    ));

    // Extract CLI flags for use in setup
    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if sync_commands {
        info!("--sync-commands: Will force re-register slash commands");
    }
    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }
    if let Some(gid) = target_guild_id {
        info!("--guild-id: Targeting specific guild {}", gid);
    }

    let token = config.discord_token.clone();

    // Build framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    let received = events::DomainEvent::CommandReceived {
                        guild_id: ctx.guild_id(),
                        user_id: ctx.author().id,
                        name: ctx.command().qualified_name.clone(),
                    };
                    if let Err(e) = events::dispatch(ctx.serenity_context(), ctx.data(), received).await {
                        warn!("Failed to record command: {}", e);
                    }
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say(error.to_string()).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                            let usage = messages::command_help(&ctx.command().name)
                                .map(|c| format!("Usage: {}", c.usage))
                                .unwrap_or_else(|| messages::UNKNOWN_COMMAND.to_string());
                            let _ = ctx.say(usage).await;
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say(format!("Bot is missing permissions: {:?}", missing_permissions)).await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            error!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                // Determine which guilds to register commands for
                let guilds_to_register: Vec<serenity::GuildId> = if let Some(gid) = target_guild_id {
                    vec![serenity::GuildId::new(gid)]
                } else {
                    ready.guilds.iter().map(|g| g.id).collect()
                };

                if guild_commands || sync_commands {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!("Successfully registered {} commands for guild {}",
                                  framework.options().commands.len(), guild_id);
                        }
                    }
                } else {
                    info!("Registering commands globally...");
                    if let Err(e) = poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    ).await {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                              framework.options().commands.len());
                    }
                }

                let notifier: SharedNotifier = Arc::new(DiscordNotifier::new(ctx.http.clone()));
                let sync_manager = Arc::new(SyncManager::new(
                    publisher,
                    sessions.clone(),
                    sheets.clone(),
                    notifier.clone(),
                    config.class.sync_interval,
                ));

                Ok(Data {
                    config,
                    sessions,
                    store,
                    presence,
                    role_manager,
                    sync_manager,
                    notifier,
                    sheets,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let privileged_intents: Vec<&str> = [
        (serenity::GatewayIntents::MESSAGE_CONTENT, "MESSAGE_CONTENT"),
        (serenity::GatewayIntents::GUILD_MEMBERS, "GUILD_MEMBERS"),
    ]
    .into_iter()
    .filter(|(intent, _)| intents.contains(*intent))
    .map(|(_, name)| name)
    .collect();

    info!("Requesting privileged intents: {:?}", privileged_intents);

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("The following privileged intents need to be enabled in the Discord Developer Portal:");
            for intent in &privileged_intents {
                error!("  - {}", intent);
            }
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents. Enable these in Discord Developer Portal: {:?}",
                privileged_intents
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
