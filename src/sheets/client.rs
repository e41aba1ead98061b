use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

/// One tab of the spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub title: String,
    pub sheet_id: i64,
}

/// Zero-based cell position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1 name of the cell, e.g. `C2`
    pub fn a1(&self) -> String {
        format!("{}{}", column_letters(self.col), self.row + 1)
    }
}

/// Operations on the external spreadsheet used by the projection.
///
/// `Value::Null` in a written block leaves that cell untouched.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    fn spreadsheet_id(&self) -> &str;

    async fn list_sheets(&self) -> Result<Vec<SheetInfo>>;

    async fn add_sheet(&self, title: &str) -> Result<SheetInfo>;

    /// Values of the first row; empty when the row is blank
    async fn read_header(&self, sheet: &str) -> Result<Vec<String>>;

    /// Write a block of rows whose top-left corner is `origin`
    async fn write_cells(&self, sheet: &str, origin: CellRef, rows: Vec<Vec<Value>>) -> Result<()>;
}

pub type SharedSheetsApi = Arc<dyn SheetsApi>;

/// Spreadsheet column name: 0 -> A, 25 -> Z, 26 -> AA
pub fn column_letters(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Sheet title quoted for A1 notation
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// A1 range covering `rows` x `cols` cells from `origin`
pub fn a1_range(sheet: &str, origin: CellRef, rows: u32, cols: u32) -> String {
    let end = CellRef::new(
        origin.row + rows.max(1) - 1,
        origin.col + cols.max(1) - 1,
    );
    format!("{}!{}:{}", quote_sheet(sheet), origin.a1(), end.a1())
}

/// Browser link to one tab
pub fn sheet_url(spreadsheet_id: &str, sheet_id: i64) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/edit#gid={}",
        spreadsheet_id, sheet_id
    )
}

/// Cell text as shown in the sheet
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(2), "C");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_a1_range() {
        assert_eq!(
            a1_range("Backend 101", CellRef::new(1, 3), 3, 1),
            "'Backend 101'!D2:D4"
        );
        assert_eq!(a1_range("Bob's", CellRef::new(0, 0), 1, 3), "'Bob''s'!A1:C1");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Value::String("Mark 2024-05-06".into())), "Mark 2024-05-06");
        assert_eq!(cell_text(&serde_json::json!(3)), "3");
        assert_eq!(cell_text(&Value::Null), "");
    }
}
