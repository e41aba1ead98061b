use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use poise::serenity_prelude::{self as serenity, GuildId, UserId};
use tracing::{info, warn};

use super::require_guild;
use crate::attendance::window::lead_in;
use crate::managers::SyncRequest;
use crate::messages::{sheet_created_message, sheet_updated_message, MARKLIST_USAGE, MARKSHEET_USAGE};
use crate::sheets::sheet_url;
use crate::state::SessionRegistry;
use crate::{Context, Error};

/// What a `marksheet` invocation asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarksheetRequest {
    Stop,
    /// Start the class now, then sync
    StartNow { sheet: String },
    /// Sync against the configured class time
    Start { sheet: String },
}

impl MarksheetRequest {
    /// Parse the words after the command. `None` means show the usage.
    pub fn parse(args: &str) -> Option<Self> {
        let words: Vec<&str> = args.split_whitespace().collect();
        match words.as_slice() {
            ["stop"] => Some(Self::Stop),
            ["now", rest @ ..] if !rest.is_empty() => Some(Self::StartNow {
                sheet: rest.join(" "),
            }),
            [first, ..] if *first != "now" => Some(Self::Start {
                sheet: words.join(" "),
            }),
            _ => None,
        }
    }
}

/// Write attendance marks into a sheet and keep them updated
#[poise::command(prefix_command, slash_command, guild_only, aliases("ms"))]
pub async fn marksheet(
    ctx: Context<'_>,
    #[rest]
    #[description = "Sheet name, `now <sheet name>` or `stop`"]
    args: Option<String>,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    let Some(request) = MarksheetRequest::parse(args.as_deref().unwrap_or_default()) else {
        ctx.say(MARKSHEET_USAGE).await?;
        return Ok(());
    };

    let data = ctx.data();
    let now = Utc::now();
    match request {
        MarksheetRequest::Stop => {
            data.sessions.stop_session(guild_id, now);
            if !data.sync_manager.is_running(guild_id) {
                info!("Stop requested for guild {} with no running sync", guild_id);
            }
            ctx.say("Attendance updates have been stopped.").await?;
        }
        MarksheetRequest::StartNow { sheet } => {
            data.sync_manager.ensure_configured()?;
            let start = data.sessions.start_session_now(guild_id, now);
            publish(ctx, guild_id, &sheet, now).await?;
            ctx.say(format!(
                "Class time for '{}' updated to current time: {}",
                sheet,
                start.format("%H:%M UTC")
            ))
            .await?;
        }
        MarksheetRequest::Start { sheet } => {
            data.sync_manager.ensure_configured()?;
            data.sessions.activate_sync(guild_id)?;
            publish(ctx, guild_id, &sheet, now).await?;
        }
    }
    Ok(())
}

async fn publish(ctx: Context<'_>, guild_id: GuildId, sheet: &str, now: DateTime<Utc>) -> Result<(), Error> {
    let data = ctx.data();
    let request = SyncRequest {
        guild_id,
        channel_id: ctx.channel_id(),
        sheet_title: sheet.to_string(),
    };
    let started = data.sync_manager.start(request, now).await?;

    if let Some(report) = &started.report {
        if report.sheet.created {
            if let Some(api) = &data.sheets {
                let url = sheet_url(api.spreadsheet_id(), report.sheet.info.sheet_id);
                ctx.say(sheet_created_message(sheet, &url)).await?;
            }
        }
        ctx.say(sheet_updated_message(sheet)).await?;

        if report.unknown > 0 {
            ctx.say(format!(
                "Attendance for {} of {} students could not be computed; their cells were left unchanged.",
                report.unknown, report.students
            ))
            .await?;
        }
    }
    match started.until {
        Some(until) => info!(
            "Sync session {} for '{}' runs until {}",
            started.session_id,
            sheet,
            until.format("%H:%M UTC")
        ),
        None => info!("Sync session {} for '{}' finished after one pass", started.session_id, sheet),
    }
    Ok(())
}

/// Join range searched by `marklistnow` for a class starting at `time` on `date`
pub fn marklist_range(date: NaiveDate, time: NaiveTime, class_duration: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(time).and_utc();
    (start - lead_in(), start + class_duration)
}

/// List who joined a voice channel around a class time (HH:MM, UTC)
#[poise::command(prefix_command, slash_command, guild_only, aliases("mn"))]
pub async fn marklistnow(
    ctx: Context<'_>,
    #[description = "Voice channel name"] channel: Option<String>,
    #[description = "Class time, HH:MM UTC"] time: Option<String>,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    let (Some(channel), Some(time)) = (channel, time) else {
        ctx.say(MARKLIST_USAGE).await?;
        return Ok(());
    };
    let time = SessionRegistry::parse_time_of_day(&time)?;

    let data = ctx.data();
    let (from, to) = marklist_range(
        Utc::now().date_naive(),
        time,
        data.config.class.default_duration,
    );
    let user_ids = data
        .store
        .joined_channel_between(guild_id, &channel, from, to)
        .await?;

    if user_ids.is_empty() {
        ctx.say("No users found in the specified time range.").await?;
        return Ok(());
    }

    let mut names = Vec::with_capacity(user_ids.len());
    for raw in &user_ids {
        let Some(user_id) = raw.parse::<u64>().ok().filter(|id| *id != 0).map(UserId::new) else {
            warn!("Skipping stored user id '{}'", raw);
            continue;
        };
        match user_id.to_user(ctx).await {
            Ok(user) => names.push(user.name),
            Err(e) => warn!("Could not look up user {}: {}", user_id, e),
        }
    }

    let embed = serenity::CreateEmbed::new()
        .title("Attendance List")
        .color(0x00ff00)
        .field("Users Present", names.join("\n"), false);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sheet(name: &str) -> String {
        name.to_string()
    }

    #[test]
    fn test_parse_stop() {
        assert_eq!(MarksheetRequest::parse("stop"), Some(MarksheetRequest::Stop));
        assert_eq!(MarksheetRequest::parse("  stop "), Some(MarksheetRequest::Stop));
        // Only a lone `stop` stops; otherwise it is part of the name
        assert_eq!(
            MarksheetRequest::parse("stop motion"),
            Some(MarksheetRequest::Start { sheet: sheet("stop motion") })
        );
    }

    #[test]
    fn test_parse_sheet_names() {
        assert_eq!(
            MarksheetRequest::parse("Backend   2024"),
            Some(MarksheetRequest::Start { sheet: sheet("Backend 2024") })
        );
        assert_eq!(
            MarksheetRequest::parse("now Backend 2024"),
            Some(MarksheetRequest::StartNow { sheet: sheet("Backend 2024") })
        );
    }

    #[test]
    fn test_parse_usage() {
        assert_eq!(MarksheetRequest::parse(""), None);
        assert_eq!(MarksheetRequest::parse("now"), None);
    }

    #[test]
    fn test_marklist_range() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let time = NaiveTime::from_hms_opt(8, 45, 0).unwrap();
        let (from, to) = marklist_range(date, time, Duration::minutes(90));
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 5, 6, 8, 35, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 5, 6, 10, 15, 0).unwrap());
    }
}
