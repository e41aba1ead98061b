use chrono::{Duration, FixedOffset};
use std::str::FromStr;

use crate::error::{BotError, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite://classroom.db";
const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Runtime settings, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub database_url: String,
    pub log_level: String,
    pub sheets: SheetsConfig,
    pub class: ClassConfig,
}

/// Where and how to reach the attendance spreadsheet
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Target spreadsheet; `marksheet` reports an error when unset
    pub spreadsheet_id: Option<String>,
    pub api_base: String,
    /// Static bearer token. Takes precedence over `token_file`.
    pub access_token: Option<String>,
    pub token_file: String,
    pub max_retries: u32,
}

/// Timing rules for class sessions
#[derive(Debug, Clone)]
pub struct ClassConfig {
    /// Fixed local timezone class times are entered in
    pub utc_offset: FixedOffset,
    /// Stored times are shifted back by this amount and shown shifted forward
    pub time_correction: Duration,
    pub default_duration: Duration,
    pub sync_interval: std::time::Duration,
    /// Clip each event to the class window before summing
    pub clip_to_window: bool,
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            utc_offset: FixedOffset::east_opt(7 * 3600).expect("UTC+7 is a valid offset"),
            time_correction: Duration::minutes(17),
            default_duration: Duration::minutes(90),
            sync_interval: std::time::Duration::from_secs(60),
            clip_to_window: true,
        }
    }
}

impl BotConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let discord_token = required("DISCORD_TOKEN")?;
        let database_url = optional("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let log_level = optional("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let sheets = SheetsConfig {
            spreadsheet_id: optional("SPREADSHEET_ID"),
            api_base: optional("SHEETS_API_BASE")
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
            access_token: optional("SHEETS_ACCESS_TOKEN"),
            token_file: optional("SHEETS_TOKEN_FILE")
                .unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string()),
            max_retries: parse_or("SHEETS_MAX_RETRIES", 2)?,
        };

        let offset_hours: i32 = parse_or("CLASS_UTC_OFFSET_HOURS", 7)?;
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            BotError::ConfigValidation {
                message: format!("CLASS_UTC_OFFSET_HOURS out of range: {}", offset_hours),
            }
        })?;

        let duration_minutes: i64 = parse_or("CLASS_DURATION_MINUTES", 90)?;
        if duration_minutes <= 0 {
            return Err(BotError::ConfigValidation {
                message: "CLASS_DURATION_MINUTES must be positive".to_string(),
            });
        }

        let interval_secs: u64 = parse_or("SYNC_INTERVAL_SECS", 60)?;
        if interval_secs == 0 {
            return Err(BotError::ConfigValidation {
                message: "SYNC_INTERVAL_SECS must be positive".to_string(),
            });
        }

        let class = ClassConfig {
            utc_offset,
            time_correction: Duration::minutes(parse_or("CLASS_TIME_CORRECTION_MINUTES", 17)?),
            default_duration: Duration::minutes(duration_minutes),
            sync_interval: std::time::Duration::from_secs(interval_secs),
            clip_to_window: parse_or("ATTENDANCE_CLIP_TO_WINDOW", true)?,
        };

        Ok(Self {
            discord_token,
            database_url,
            log_level,
            sheets,
            class,
        })
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &str) -> Result<String> {
    optional(name).ok_or_else(|| BotError::ConfigMissing {
        name: name.to_string(),
    })
}

fn parse_or<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| BotError::ConfigValidation {
            message: format!("{}={:?}: {}", name, raw, e),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_config_defaults() {
        let class = ClassConfig::default();
        assert_eq!(class.utc_offset.local_minus_utc(), 7 * 3600);
        assert_eq!(class.time_correction, Duration::minutes(17));
        assert_eq!(class.default_duration, Duration::minutes(90));
        assert_eq!(class.sync_interval, std::time::Duration::from_secs(60));
        assert!(class.clip_to_window);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        std::env::set_var("ROLLCALL_TEST_PARSE_OR", "abc");
        let parsed: Result<u64> = parse_or("ROLLCALL_TEST_PARSE_OR", 5);
        assert!(matches!(parsed, Err(BotError::ConfigValidation { .. })));

        std::env::set_var("ROLLCALL_TEST_PARSE_OR", " 42 ");
        let parsed: u64 = parse_or("ROLLCALL_TEST_PARSE_OR", 5).unwrap();
        assert_eq!(parsed, 42);

        std::env::remove_var("ROLLCALL_TEST_PARSE_OR");
        let parsed: u64 = parse_or("ROLLCALL_TEST_PARSE_OR", 5).unwrap();
        assert_eq!(parsed, 5);
    }
}
