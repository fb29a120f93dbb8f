//! Core data types that flow through the sync and answer pipeline.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One row from the data store. Field names are free-form.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Record {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// A single web search result, independent of which provider produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Result of running the provider chain for one query.
///
/// `NoResults` means a provider answered with nothing; `Unavailable` means
/// no provider answered at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Vec<SearchHit>),
    NoResults,
    Unavailable,
}

impl SearchOutcome {
    pub fn hits(&self) -> Option<&[SearchHit]> {
        match self {
            SearchOutcome::Found(hits) => Some(hits),
            _ => None,
        }
    }
}
