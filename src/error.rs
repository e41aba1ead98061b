use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Input validation errors
    #[error("{message}")]
    InvalidInput { message: String },

    #[error("Sheet name cannot be empty.")]
    SheetNameEmpty,

    #[error("Class time not found.")]
    ClassTimeNotSet,

    // Configuration errors
    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    #[error("Missing required setting: {name}")]
    ConfigMissing { name: String },

    // Storage errors
    #[error("Database error: {source}")]
    Database {
        #[source]
        source: sqlx::Error,
    },

    #[error("Migration error: {source}")]
    Migration {
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    #[error("Stored record {id} is corrupt: {message}")]
    DataIntegrity { id: i64, message: String },

    // External spreadsheet errors
    #[error("Sheets API error: {message}")]
    Sheets { message: String },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    #[error("Role not found: {name}")]
    RoleNotFound { name: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        BotError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn sheets(message: impl Into<String>) -> Self {
        BotError::Sheets {
            message: message.into(),
        }
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for BotError {
    fn from(err: sqlx::Error) -> Self {
        BotError::Database { source: err }
    }
}

impl From<sqlx::migrate::MigrateError> for BotError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        BotError::Migration { source: err }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Sheets {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;
