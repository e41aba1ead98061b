pub mod settings;

pub use settings::{BotConfig, ClassConfig, SheetsConfig};
