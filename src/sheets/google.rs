//! Google Sheets v4 REST client.
//!
//! Credentials are not managed here: the bearer token comes either from the
//! environment or from an OAuth token file that something else keeps fresh.
//! The file is re-read for every request.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use super::client::{a1_range, cell_text, quote_sheet, CellRef, SheetInfo, SheetsApi};
use crate::config::SheetsConfig;
use crate::error::{BotError, Result};

/// Where the bearer token comes from
#[derive(Debug, Clone)]
pub enum TokenSource {
    Static(String),
    File(PathBuf),
}

#[derive(Deserialize)]
struct TokenFile {
    access_token: String,
}

impl TokenSource {
    async fn bearer(&self) -> Result<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::File(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    BotError::sheets(format!("cannot read token file {}: {}", path.display(), e))
                })?;
                let token: TokenFile = serde_json::from_str(&content).map_err(|e| {
                    BotError::sheets(format!("cannot parse token file {}: {}", path.display(), e))
                })?;
                Ok(token.access_token)
            }
        }
    }
}

#[derive(Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchReply {
    add_sheet: Option<SheetEntry>,
}

#[derive(Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct GoogleSheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    token: TokenSource,
    max_retries: u32,
}

impl GoogleSheetsClient {
    pub fn new(spreadsheet_id: &str, base_url: &str, token: TokenSource, max_retries: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
            max_retries,
        }
    }

    /// Client for the configured spreadsheet, if one is configured
    pub fn from_config(config: &SheetsConfig) -> Option<Self> {
        let spreadsheet_id = config.spreadsheet_id.as_deref()?;
        let token = match &config.access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::File(PathBuf::from(&config.token_file)),
        };
        Some(Self::new(spreadsheet_id, &config.api_base, token, config.max_retries))
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/v4/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(range))
    }

    /// Send a request, retrying transient failures with a growing delay
    async fn send<F>(&self, what: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying Sheets request '{}' after transient error", what);
                tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
            }

            let token = self.token.bearer().await?;
            let response = match build(&self.http).bearer_auth(token).send().await {
                Ok(response) => response,
                Err(e) if attempt < self.max_retries && (e.is_timeout() || e.is_connect()) => {
                    last_error = Some(BotError::sheets(format!("{}: {}", what, e)));
                    continue;
                }
                Err(e) => return Err(BotError::sheets(format!("{}: {}", what, e))),
            };

            let status = response.status();
            debug!(status = %status, attempt, "Sheets response for '{}'", what);

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("{} failed ({}): {}", what, status, api_err.error.message),
                Err(_) => format!("{} failed ({}): {}", what, status, body),
            };

            if is_transient_error(status) && attempt < self.max_retries {
                warn!("{}", message);
                last_error = Some(BotError::sheets(message));
                continue;
            }

            return Err(BotError::sheets(message));
        }

        Err(last_error.unwrap_or_else(|| BotError::sheets(format!("{} failed after retries", what))))
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    async fn list_sheets(&self) -> Result<Vec<SheetInfo>> {
        let url = self.spreadsheet_url();
        let response = self
            .send("get spreadsheet", |http| {
                http.get(&url)
                    .query(&[("fields", "sheets.properties(sheetId,title)")])
            })
            .await?;
        let spreadsheet: SpreadsheetResponse = response.json().await?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| SheetInfo {
                title: s.properties.title,
                sheet_id: s.properties.sheet_id,
            })
            .collect())
    }

    async fn add_sheet(&self, title: &str) -> Result<SheetInfo> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        let response = self
            .send("add sheet", |http| http.post(&url).json(&body))
            .await?;
        let update: BatchUpdateResponse = response.json().await?;
        let added = update
            .replies
            .into_iter()
            .find_map(|r| r.add_sheet)
            .ok_or_else(|| BotError::sheets("add sheet: no sheet in reply"))?;
        Ok(SheetInfo {
            title: added.properties.title,
            sheet_id: added.properties.sheet_id,
        })
    }

    async fn read_header(&self, sheet: &str) -> Result<Vec<String>> {
        let url = self.values_url(&format!("{}!1:1", quote_sheet(sheet)));
        let response = self.send("read header row", |http| http.get(&url)).await?;
        let range: ValueRangeResponse = response.json().await?;
        Ok(range
            .values
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .map(cell_text)
            .collect())
    }

    async fn write_cells(&self, sheet: &str, origin: CellRef, rows: Vec<Vec<Value>>) -> Result<()> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let range = a1_range(sheet, origin, height, width);
        let url = self.values_url(&range);
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });
        self.send("write cells", |http| {
            http.put(&url)
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&body)
        })
        .await?;
        Ok(())
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}
