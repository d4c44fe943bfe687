//! Notion database storage backend
//!
//! Persists records as pages in a Notion database. Unlike the file-backed
//! backends, "most recent prior record" is not a last-row read: the search
//! API returns pages in last-edited order, so the lookup filters them to the
//! target database, drops same-day pages, and sorts by the stored `Date`
//! property.
//!
//! ## Parent id schema drift
//!
//! Depending on the API schema version, a page's parent carries the
//! collection id under `database_id` or `data_source_id`. Both field names
//! are treated as equally authoritative when matching pages to the
//! configured database.
//!
//! ## Failure policy
//!
//! The read path degrades to "no history" with a warning instead of aborting
//! the run. A failed write aborts it: losing an append silently would
//! corrupt the historical series.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};
use crate::record::GrowthRecord;

const DEFAULT_API_BASE: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// Upper bound on candidate pages fetched per lookup.
const SEARCH_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    parent: Option<PageParent>,
    #[serde(default)]
    properties: PageProperties,
}

#[derive(Debug, Deserialize)]
struct PageParent {
    database_id: Option<String>,
    data_source_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PageProperties {
    #[serde(rename = "Date")]
    date: Option<DateProperty>,
    #[serde(rename = "Followers Count")]
    followers: Option<NumberProperty>,
}

#[derive(Debug, Deserialize)]
struct DateProperty {
    date: Option<DateValue>,
}

#[derive(Debug, Deserialize)]
struct DateValue {
    start: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NumberProperty {
    number: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Database {
    #[serde(default)]
    title: Vec<TitleText>,
}

#[derive(Debug, Deserialize)]
struct TitleText {
    plain_text: Option<String>,
}

impl Page {
    /// The calendar date stored in the page's `Date` property
    ///
    /// Notion date starts may carry a time suffix; only the leading
    /// `YYYY-MM-DD` is significant here.
    fn record_date(&self) -> Option<NaiveDate> {
        let start = self.properties.date.as_ref()?.date.as_ref()?.start.as_deref()?;
        let day = start.get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    fn follower_count(&self) -> u64 {
        self.properties
            .followers
            .as_ref()
            .and_then(|property| property.number)
            .map(|number| number as u64)
            .unwrap_or(0)
    }
}

/// Notion database storage backend
pub struct NotionBackend {
    client: Client,
    api_base: String,
    token: String,
    database_id: String,
}

impl NotionBackend {
    /// Verify the integration can reach the configured database
    #[instrument(skip(token))]
    pub async fn connect(token: &str, database_id: &str) -> StorageResult<Self> {
        let backend = Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.to_string(),
            database_id: database_id.to_string(),
        };

        let title = backend
            .retrieve_database()
            .await
            .map_err(StorageError::Init)?;
        info!("connected to Notion database: {title}");
        Ok(backend)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn retrieve_database(&self) -> Result<String, String> {
        let url = format!("{}/v1/databases/{}", self.api_base, self.database_id);

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| format!("failed to reach the Notion API: {e}"))?;

        if !response.status().is_success() {
            return Err(format!(
                "database lookup failed with status {}",
                response.status()
            ));
        }

        let database: Database = response
            .json()
            .await
            .map_err(|e| format!("unexpected Notion API response: {e}"))?;

        let title: String = database
            .title
            .into_iter()
            .filter_map(|text| text.plain_text)
            .collect();
        Ok(if title.is_empty() {
            "Untitled".to_string()
        } else {
            title
        })
    }

    async fn search_pages(&self) -> Result<Vec<Page>, String> {
        let url = format!("{}/v1/search", self.api_base);
        let body = json!({
            "filter": { "property": "object", "value": "page" },
            "sort": { "direction": "descending", "timestamp": "last_edited_time" },
            "page_size": SEARCH_PAGE_SIZE,
        });

        let response = self
            .request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("failed to reach the Notion API: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("search failed with status {}", response.status()));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| format!("unexpected Notion API response: {e}"))?;
        Ok(search.results)
    }

    fn belongs_to_database(&self, page: &Page) -> bool {
        let Some(parent) = &page.parent else {
            return false;
        };
        parent.database_id.as_deref() == Some(self.database_id.as_str())
            || parent.data_source_id.as_deref() == Some(self.database_id.as_str())
    }

    async fn last_value_before(&self, as_of: NaiveDate) -> Result<Option<(NaiveDate, u64)>, String> {
        let pages = self.search_pages().await?;
        debug!("search returned {} pages", pages.len());

        let mut dated: Vec<(NaiveDate, &Page)> = pages
            .iter()
            .filter(|page| self.belongs_to_database(page))
            .filter_map(|page| page.record_date().map(|date| (date, page)))
            .filter(|(date, _)| *date < as_of)
            .collect();
        debug!("{} pages in the database dated before {as_of}", dated.len());

        dated.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(dated
            .first()
            .map(|(date, page)| (*date, page.follower_count())))
    }
}

#[async_trait]
impl StorageBackend for NotionBackend {
    #[instrument(skip(self))]
    async fn initialize(&self) -> StorageResult<()> {
        self.retrieve_database().await.map_err(StorageError::Init)?;
        debug!("Notion database connection verified");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_last_value(&self, as_of: NaiveDate) -> StorageResult<u64> {
        match self.last_value_before(as_of).await {
            Ok(Some((date, count))) => {
                info!("loaded last record from Notion: {count} followers on {date}");
                Ok(count)
            }
            Ok(None) => {
                info!("no historical data found in Notion (first run)");
                Ok(0)
            }
            Err(e) => {
                warn!("failed to load last record from Notion, treating as first run: {e}");
                Ok(0)
            }
        }
    }

    #[instrument(skip(self, record), fields(date = %record.date))]
    async fn save_record(&self, record: &GrowthRecord) -> StorageResult<()> {
        let url = format!("{}/v1/pages", self.api_base);
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                "Date": { "date": { "start": record.date.to_string() } },
                "Followers Count": { "number": record.followers },
                "Delta": { "number": record.delta },
                "Rate": {
                    "rich_text": [{ "text": { "content": record.formatted_rate() } }]
                },
            },
        });

        let response = self
            .request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::Write(format!("failed to reach the Notion API: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Write(format!(
                "page creation failed with status {status}: {message}"
            )));
        }

        info!(
            "saved record to Notion: {}, {} followers (delta {:+}, rate {})",
            record.date,
            record.followers,
            record.delta,
            record.formatted_rate()
        );
        Ok(())
    }
}
