//! External tender source client
//!
//! One operation: fetch a page of raw tender records from the upstream
//! JSON API (`GET {base_url}/tenders?page=N`). Failed fetches are not
//! retried here; the downloader's failure policy decides what a fetch
//! error means.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Errors from the external source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source returned status {status} for page {page}")]
    Status {
        status: reqwest::StatusCode,
        page: u32,
    },
}

/// One page of raw tender records
#[derive(Debug, Clone, Deserialize)]
pub struct TendersPage {
    pub data: Vec<RawTender>,
}

/// A raw tender record as delivered by the source
///
/// The monetary amount arrives string-formatted and is parsed by the merge
/// writer, not here; a malformed value fails the batch at merge time.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTender {
    pub id: String,
    #[serde(deserialize_with = "deserialize_source_date")]
    pub date: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub awarded_value_eur: String,
    #[serde(default)]
    pub awarded: Vec<RawAward>,
}

/// An award group within a tender; only the supplier references matter
#[derive(Debug, Clone, Deserialize)]
pub struct RawAward {
    #[serde(default)]
    pub suppliers: Vec<RawSupplier>,
}

/// A supplier reference carried by an award group
#[derive(Debug, Clone, Deserialize)]
pub struct RawSupplier {
    pub id: i32,
    pub name: String,
}

/// The source emits plain `YYYY-MM-DD` dates; full RFC 3339 timestamps are
/// accepted as well.
fn deserialize_source_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| serde::de::Error::custom(format!("unrecognized date '{raw}'")))
}

/// HTTP client for the external tender source
#[derive(Debug, Clone)]
pub struct TendersClient {
    http: reqwest::Client,
    base_url: String,
}

impl TendersClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one page of tenders (1-indexed).
    #[tracing::instrument(skip(self))]
    pub async fn fetch_page(&self, page: u32) -> Result<TendersPage, SourceError> {
        let url = format!("{}/tenders", self.base_url);
        let response = self.http.get(&url).query(&[("page", page)]).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { status, page });
        }

        Ok(response.json().await?)
    }
}
