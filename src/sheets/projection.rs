//! Maps attendance onto the sheet layout.
//!
//! Layout of a class sheet:
//!
//! | Number | Username | Mark 2024-05-06 | Mark 2024-05-13 | ... |
//! |--------|----------|-----------------|-----------------|-----|
//! | 1      | ann      | X 100%          | L 12m3s 80%     |     |
//!
//! Rows follow roster order. Each class day gets its own column, appended at
//! the first free header cell the first time that day is published.

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::{CellRef, SheetInfo, SheetsApi};
use crate::error::Result;
use crate::models::Student;

/// Header of the status column for `date`
pub fn date_header(date: NaiveDate) -> String {
    format!("Mark {}", date.format("%Y-%m-%d"))
}

/// Result of making sure the class sheet exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredSheet {
    pub info: SheetInfo,
    pub created: bool,
}

/// Result of one column write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnWrite {
    /// Zero-based column index of today's column
    pub column: u32,
    /// Cells actually written (unknown statuses are skipped)
    pub written: usize,
}

/// Find the sheet, or create it with a header row and one row per student
pub async fn ensure_sheet(
    api: &dyn SheetsApi,
    title: &str,
    date: NaiveDate,
    roster: &[Student],
) -> Result<EnsuredSheet> {
    if let Some(info) = api.list_sheets().await?.into_iter().find(|s| s.title == title) {
        debug!("Found sheet '{}' ({})", title, info.sheet_id);
        return Ok(EnsuredSheet { info, created: false });
    }

    info!("Sheet not found, creating a new one: {}", title);
    let info = api.add_sheet(title).await?;

    api.write_cells(title, CellRef::new(0, 0), vec![header_row(date)])
        .await?;

    if !roster.is_empty() {
        let rows = roster
            .iter()
            .enumerate()
            .map(|(i, student)| vec![json!(i + 1), json!(student.username)])
            .collect();
        api.write_cells(title, CellRef::new(1, 0), rows).await?;
    }

    Ok(EnsuredSheet { info, created: true })
}

/// Index of the column for `date`, adding its header if missing
pub async fn locate_date_column(api: &dyn SheetsApi, title: &str, date: NaiveDate) -> Result<u32> {
    let wanted = date_header(date);
    let header = api.read_header(title).await?;

    if header.is_empty() {
        // Blank first row: lay down the whole header
        api.write_cells(title, CellRef::new(0, 0), vec![header_row(date)])
            .await?;
        return Ok(2);
    }

    if let Some(index) = header.iter().position(|h| h.trim() == wanted) {
        return Ok(index as u32);
    }

    let column = header.len() as u32;
    debug!("Adding column '{}' to sheet '{}' at {}", wanted, title, column);
    api.write_cells(title, CellRef::new(0, column), vec![vec![json!(wanted)]])
        .await?;
    Ok(column)
}

/// Write one status per student into today's column, in roster order.
///
/// `None` marks a status that could not be computed; that cell is left as is.
pub async fn write_statuses(
    api: &dyn SheetsApi,
    title: &str,
    date: NaiveDate,
    statuses: &[Option<String>],
) -> Result<ColumnWrite> {
    let column = locate_date_column(api, title, date).await?;

    if statuses.is_empty() {
        return Ok(ColumnWrite { column, written: 0 });
    }

    let rows: Vec<Vec<Value>> = statuses
        .iter()
        .map(|s| vec![s.as_ref().map_or(Value::Null, |text| json!(text))])
        .collect();
    api.write_cells(title, CellRef::new(1, column), rows).await?;

    Ok(ColumnWrite {
        column,
        written: statuses.iter().filter(|s| s.is_some()).count(),
    })
}

fn header_row(date: NaiveDate) -> Vec<Value> {
    vec![json!("Number"), json!("Username"), json!(date_header(date))]
}
