//! Configuration loading and validation
//!
//! All settings come from environment variables (usually via a `.env` file)
//! and are resolved into an explicit [`Config`] struct before any I/O
//! happens. Missing variables are reported as a [`ConfigError`] naming every
//! absent name, so an operator can fix a broken deployment in one pass.

use std::fmt;
use std::path::PathBuf;

use tracing::trace;

const X_BEARER_TOKEN: &str = "X_BEARER_TOKEN";
const X_USERNAME: &str = "X_USERNAME";
const STORAGE_TYPE: &str = "STORAGE_TYPE";
const CSV_FILE_PATH: &str = "CSV_FILE_PATH";
const GOOGLE_SHEETS_ID: &str = "GOOGLE_SHEETS_ID";
const GOOGLE_SERVICE_ACCOUNT_JSON: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";
const NOTION_TOKEN: &str = "NOTION_TOKEN";
const NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";

const DEFAULT_CSV_PATH: &str = "followers_log.csv";

/// Errors raised while resolving the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required environment variables are absent or empty
    Missing(Vec<&'static str>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(names) => write!(
                f,
                "missing required environment variable(s): {}",
                names.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Storage backend configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Local CSV file (default)
    Csv {
        /// Path to the log file
        path: PathBuf,
    },

    /// First sheet of a Google spreadsheet
    Sheets {
        /// Spreadsheet id from the document URL
        spreadsheet_id: String,

        /// Service account credentials as a JSON string
        service_account_json: String,
    },

    /// Notion database of pages
    Notion {
        /// Integration token
        token: String,

        /// Database id the records are appended to
        database_id: String,
    },
}

/// Fully resolved tracker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the X API
    pub bearer_token: String,

    /// Account whose follower count is tracked
    pub username: String,

    /// Selected storage backend and its parameters
    pub storage: StorageConfig,
}

impl Config {
    /// Resolve the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration from an arbitrary variable lookup
    ///
    /// The lookup indirection keeps validation testable without mutating
    /// process-wide environment state. Empty values count as missing.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();

        let bearer_token = require(&lookup, X_BEARER_TOKEN, &mut missing);
        let username = require(&lookup, X_USERNAME, &mut missing);

        let storage_type = lookup(STORAGE_TYPE).unwrap_or_default().to_lowercase();
        let storage = match storage_type.as_str() {
            "notion" => {
                let token = require(&lookup, NOTION_TOKEN, &mut missing);
                let database_id = require(&lookup, NOTION_DATABASE_ID, &mut missing);
                StorageConfig::Notion {
                    token: token.trim().to_string(),
                    database_id: database_id.trim().to_string(),
                }
            }
            "sheets" => {
                let spreadsheet_id = require(&lookup, GOOGLE_SHEETS_ID, &mut missing);
                let service_account_json =
                    require(&lookup, GOOGLE_SERVICE_ACCOUNT_JSON, &mut missing);
                StorageConfig::Sheets {
                    spreadsheet_id,
                    service_account_json,
                }
            }
            // Anything else falls back to the CSV default, matching the
            // behavior operators already rely on.
            _ => StorageConfig::Csv {
                path: lookup(CSV_FILE_PATH)
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH)),
            },
        };

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let config = Self {
            bearer_token,
            username,
            storage,
        };
        trace!("resolved config for @{}", config.username);
        Ok(config)
    }
}

fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}
