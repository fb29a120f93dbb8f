//! Record fetcher for the Airtable data store.
//!
//! Every failure (network, non-2xx status, malformed body) is logged and
//! collapsed to an empty record list. Callers treat "no records" as the
//! single failure signal.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::models::Record;

/// A source of tabular records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch every record of `table`. Returns an empty vector on any failure.
    async fn fetch_table(&self, table: &str) -> Vec<Record>;

    /// Candidate table names, probed in order by [`find_table`](RecordSource::find_table).
    fn candidate_tables(&self) -> &[String];

    /// Return the first candidate table that yields records, with its name.
    async fn find_table(&self) -> Option<(String, Vec<Record>)> {
        for name in self.candidate_tables() {
            let records = self.fetch_table(name).await;
            if !records.is_empty() {
                tracing::info!(table = %name, "using table");
                return Some((name.clone(), records));
            }
        }
        None
    }
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<Record>,
}

/// Fetches records over the Airtable REST API.
pub struct AirtableStore {
    client: reqwest::Client,
    base_url: String,
    base_id: String,
    api_key: String,
    tables: Vec<String>,
}

impl AirtableStore {
    pub fn new(
        base_url: impl Into<String>,
        base_id: impl Into<String>,
        api_key: impl Into<String>,
        tables: Vec<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            base_id: base_id.into(),
            api_key: api_key.into(),
            tables,
        })
    }

    /// Build a store from configuration. Requires both store credentials.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate_credentials()?;
        let creds = &config.credentials;
        Self::new(
            config.store.base_url.clone(),
            creds.store_base_id.clone().unwrap_or_default(),
            creds.store_api_key.clone().unwrap_or_default(),
            config.store.tables.clone(),
            Duration::from_secs(config.store.timeout_secs),
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.base_id,
            encode_path_segment(table)
        )
    }
}

#[async_trait]
impl RecordSource for AirtableStore {
    async fn fetch_table(&self, table: &str) -> Vec<Record> {
        let response = match self
            .client
            .get(self.table_url(table))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(table, error = %e, "error fetching table");
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(table, status = status.as_u16(), "error fetching table");
            return Vec::new();
        }

        match response.json::<ListResponse>().await {
            Ok(body) => {
                tracing::info!(table, count = body.records.len(), "fetched records");
                body.records
            }
            Err(e) => {
                tracing::warn!(table, error = %e, "malformed table response");
                Vec::new()
            }
        }
    }

    fn candidate_tables(&self) -> &[String] {
        &self.tables
    }
}

/// Percent-encode a table name for use as a single URL path segment.
fn encode_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// In-memory record source keyed by table name.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: Vec<String>,
    data: std::collections::HashMap<String, Vec<Record>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new(tables: Vec<String>) -> Self {
        Self {
            tables,
            data: Default::default(),
        }
    }

    pub fn insert(&mut self, table: impl Into<String>, records: Vec<Record>) {
        self.data.insert(table.into(), records);
    }
}

#[cfg(test)]
#[async_trait]
impl RecordSource for MemoryStore {
    async fn fetch_table(&self, table: &str) -> Vec<Record> {
        self.data.get(table).cloned().unwrap_or_default()
    }

    fn candidate_tables(&self) -> &[String] {
        &self.tables
    }
}
