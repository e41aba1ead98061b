//! In-memory spreadsheet used by tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::client::{cell_text, CellRef, SheetInfo, SheetsApi};
use crate::error::{BotError, Result};

#[derive(Default)]
struct MemorySheet {
    info: Option<SheetInfo>,
    cells: BTreeMap<CellRef, String>,
}

#[derive(Default)]
pub struct MemorySheets {
    sheets: Mutex<Vec<MemorySheet>>,
    /// Number of successful `write_cells` calls
    pub writes: AtomicUsize,
    /// Make every call fail until cleared
    pub fail: AtomicBool,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(title: &str, header: &[&str]) -> Self {
        let sheets = Self::new();
        {
            let mut all = sheets.sheets.lock();
            let mut sheet = MemorySheet {
                info: Some(SheetInfo { title: title.to_string(), sheet_id: 1 }),
                cells: BTreeMap::new(),
            };
            for (col, value) in header.iter().enumerate() {
                sheet.cells.insert(CellRef::new(0, col as u32), value.to_string());
            }
            all.push(sheet);
        }
        sheets
    }

    pub fn cell(&self, title: &str, row: u32, col: u32) -> Option<String> {
        let all = self.sheets.lock();
        let sheet = all.iter().find(|s| s.info.as_ref().map(|i| i.title.as_str()) == Some(title))?;
        sheet.cells.get(&CellRef::new(row, col)).cloned()
    }

    /// Filled cells of one column below the header
    pub fn column(&self, title: &str, col: u32) -> Vec<Option<String>> {
        let all = self.sheets.lock();
        let Some(sheet) = all.iter().find(|s| s.info.as_ref().map(|i| i.title.as_str()) == Some(title)) else {
            return Vec::new();
        };
        let last_row = sheet.cells.keys().map(|c| c.row).max().unwrap_or(0);
        (1..=last_row)
            .map(|row| sheet.cells.get(&CellRef::new(row, col)).cloned())
            .collect()
    }

    pub fn header(&self, title: &str) -> Vec<String> {
        let all = self.sheets.lock();
        all.iter()
            .find(|s| s.info.as_ref().map(|i| i.title.as_str()) == Some(title))
            .map(|s| {
                s.cells
                    .iter()
                    .filter(|(c, _)| c.row == 0)
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BotError::sheets("simulated outage"));
        }
        Ok(())
    }
}

#[async_trait]
impl SheetsApi for MemorySheets {
    fn spreadsheet_id(&self) -> &str {
        "memory"
    }

    async fn list_sheets(&self) -> Result<Vec<SheetInfo>> {
        self.check()?;
        Ok(self.sheets.lock().iter().filter_map(|s| s.info.clone()).collect())
    }

    async fn add_sheet(&self, title: &str) -> Result<SheetInfo> {
        self.check()?;
        let mut all = self.sheets.lock();
        if all.iter().any(|s| s.info.as_ref().map(|i| i.title.as_str()) == Some(title)) {
            return Err(BotError::sheets(format!("sheet '{}' already exists", title)));
        }
        let info = SheetInfo {
            title: title.to_string(),
            sheet_id: 100 + all.len() as i64,
        };
        all.push(MemorySheet {
            info: Some(info.clone()),
            cells: BTreeMap::new(),
        });
        Ok(info)
    }

    async fn read_header(&self, sheet: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.header(sheet))
    }

    async fn write_cells(&self, sheet: &str, origin: CellRef, rows: Vec<Vec<Value>>) -> Result<()> {
        self.check()?;
        let mut all = self.sheets.lock();
        let target = all
            .iter_mut()
            .find(|s| s.info.as_ref().map(|i| i.title.as_str()) == Some(sheet))
            .ok_or_else(|| BotError::sheets(format!("no sheet '{}'", sheet)))?;
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_null() {
                    continue;
                }
                target.cells.insert(
                    CellRef::new(origin.row + r as u32, origin.col + c as u32),
                    cell_text(value),
                );
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
