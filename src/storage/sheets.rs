//! Google Sheets storage backend
//!
//! Persists records to the first sheet of a spreadsheet through the Sheets
//! REST API v4. Authentication uses a service account: an RS256-signed JWT
//! is exchanged for a bearer token when the backend is constructed, so bad
//! credentials fail the run before anything is fetched or written.
//!
//! ## Operator edits
//!
//! The sheet is operator-visible output and may be touched by hand. A header
//! row that does not match the expected format is reported as a warning,
//! never an error, and rows that do not start with a date are skipped during
//! lookups instead of failing them.

use async_trait::async_trait;
use chrono::NaiveDate;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};
use crate::record::GrowthRecord;

const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Cell range covering the four record columns of the first sheet.
const RECORD_RANGE: &str = "A:D";

const EXPECTED_HEADER: [&str; 4] = ["date", "followers_count", "delta", "rate"];

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    /// Absent entirely when the requested range is empty.
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    properties: SpreadsheetProperties,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

/// Google Sheets storage backend
#[derive(Debug)]
pub struct SheetsBackend {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsBackend {
    /// Authenticate with a service account and verify spreadsheet access
    #[instrument(skip_all)]
    pub async fn connect(
        spreadsheet_id: impl Into<String>,
        service_account_json: &str,
    ) -> StorageResult<Self> {
        let key: ServiceAccountKey = serde_json::from_str(service_account_json).map_err(|e| {
            StorageError::Init(format!("invalid service account credentials: {e}"))
        })?;

        let client = Client::new();
        let access_token = obtain_access_token(&client, &key).await?;

        let backend = Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            access_token,
        };

        let title = backend.fetch_spreadsheet_title().await?;
        info!("connected to spreadsheet: {title}");
        Ok(backend)
    }

    async fn fetch_spreadsheet_title(&self) -> StorageResult<String> {
        let url = format!(
            "{}/v4/spreadsheets/{}?fields=properties.title",
            self.api_base, self.spreadsheet_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StorageError::Init(format!("failed to reach the Sheets API: {e}")))?;

        if !response.status().is_success() {
            return Err(StorageError::Init(format!(
                "spreadsheet lookup failed with status {}",
                response.status()
            )));
        }

        let info: SpreadsheetInfo = response
            .json()
            .await
            .map_err(|e| StorageError::Init(format!("unexpected Sheets API response: {e}")))?;
        Ok(info.properties.title)
    }

    /// Read every row of the record range
    ///
    /// Returns a plain error message; the caller wraps it in the variant
    /// matching the operation it is performing.
    async fn read_rows(&self) -> Result<Vec<Vec<String>>, String> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.api_base, self.spreadsheet_id, RECORD_RANGE
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| format!("failed to reach the Sheets API: {e}"))?;

        if !response.status().is_success() {
            return Err(format!(
                "value lookup failed with status {}",
                response.status()
            ));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| format!("unexpected Sheets API response: {e}"))?;
        Ok(range.values)
    }

    async fn append_row(&self, cells: serde_json::Value) -> Result<(), String> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=RAW",
            self.api_base, self.spreadsheet_id, RECORD_RANGE
        );
        let body = json!({ "values": [cells] });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("failed to reach the Sheets API: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("append failed with status {}", response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for SheetsBackend {
    #[instrument(skip(self))]
    async fn initialize(&self) -> StorageResult<()> {
        let rows = self.read_rows().await.map_err(StorageError::Init)?;

        if rows.is_empty() {
            self.append_row(json!(EXPECTED_HEADER))
                .await
                .map_err(StorageError::Init)?;
            info!("initialized sheet with header row");
            return Ok(());
        }

        let first: Vec<&str> = rows[0].iter().map(String::as_str).collect();
        if first != EXPECTED_HEADER {
            warn!("sheet header does not match the expected format, continuing anyway");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_last_value(&self, as_of: NaiveDate) -> StorageResult<u64> {
        let rows = self.read_rows().await.map_err(StorageError::Read)?;

        for row in rows.iter().rev() {
            let Some(cell) = row.first() else { continue };
            let Ok(date) = NaiveDate::parse_from_str(cell.trim(), "%Y-%m-%d") else {
                debug!("skipping row without a leading date: {row:?}");
                continue;
            };
            if date >= as_of {
                continue;
            }

            let count = row
                .get(1)
                .ok_or_else(|| {
                    StorageError::Read(format!("row is missing a follower count: {row:?}"))
                })?
                .trim()
                .parse::<u64>()
                .map_err(|e| {
                    StorageError::Read(format!("invalid follower count in row {row:?}: {e}"))
                })?;

            info!("loaded last record: {count} followers on {date}");
            return Ok(count);
        }

        info!("no historical data found (first run)");
        Ok(0)
    }

    #[instrument(skip(self, record), fields(date = %record.date))]
    async fn save_record(&self, record: &GrowthRecord) -> StorageResult<()> {
        let cells = json!([
            record.date.to_string(),
            record.followers,
            record.delta,
            record.formatted_rate(),
        ]);

        self.append_row(cells).await.map_err(StorageError::Write)?;

        info!(
            "saved record to sheet: {}, {} followers (delta {:+}, rate {})",
            record.date,
            record.followers,
            record.delta,
            record.formatted_rate()
        );
        Ok(())
    }
}

/// Exchange a signed service-account assertion for a bearer token
async fn obtain_access_token(client: &Client, key: &ServiceAccountKey) -> StorageResult<String> {
    let issued_at = chrono::Utc::now().timestamp();
    let claims = TokenClaims {
        iss: &key.client_email,
        scope: SHEETS_SCOPE,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + 3600,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| StorageError::Init(format!("invalid service account private key: {e}")))?;
    let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| StorageError::Init(format!("failed to sign token request: {e}")))?;

    let response = client
        .post(&key.token_uri)
        .form(&[
            ("grant_type", JWT_BEARER_GRANT),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await
        .map_err(|e| StorageError::Init(format!("failed to reach the token endpoint: {e}")))?;

    if !response.status().is_success() {
        return Err(StorageError::Init(format!(
            "token exchange failed with status {}",
            response.status()
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| StorageError::Init(format!("unexpected token endpoint response: {e}")))?;
    Ok(token.access_token)
}
