pub mod client;
pub mod google;
#[cfg(test)]
pub mod memory;
pub mod projection;

pub use client::{sheet_url, SharedSheetsApi, SheetsApi};
pub use google::GoogleSheetsClient;
pub use projection::{ensure_sheet, write_statuses, ColumnWrite, EnsuredSheet};
