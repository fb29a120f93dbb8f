//! Answer orchestration: sync, decide-to-search, prompt, call the model.
//!
//! ```text
//! ask(question)
//!   ├─ context empty? ──▶ sync()
//!   ├─ trigger word?  ──▶ SearchAggregator::search()
//!   ├─ build system prompt (context + optional web results)
//!   └─ LanguageModel::complete() ──▶ text | failure message
//! ```
//!
//! [`Orchestrator::ask`] always returns a displayable string.

use anyhow::{bail, Result};
use chrono::Local;

use crate::context::{build_context, field_inventory};
use crate::llm::{LanguageModel, ModelError};
use crate::models::SearchOutcome;
use crate::search::{format_hits, SearchAggregator};
use crate::session::ChatSession;
use crate::store::RecordSource;

/// Substrings that mark a question as needing live web data.
pub const SEARCH_TRIGGERS: &[&str] = &[
    "news",
    "latest",
    "recent",
    "current",
    "market",
    "competitor",
    "research",
];

const PROMPT_PREAMBLE: &str = "You are helping analyze a VC fund's deal pipeline database.";
const PROMPT_GUIDANCE: &str = "Answer questions naturally using the database and web search results when available. Be conversational and insightful.";

/// Result of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub table: String,
    pub records: usize,
}

pub struct Orchestrator {
    source: Box<dyn RecordSource>,
    search: SearchAggregator,
    model: Box<dyn LanguageModel>,
    session: ChatSession,
}

impl Orchestrator {
    pub fn new(
        source: Box<dyn RecordSource>,
        search: SearchAggregator,
        model: Box<dyn LanguageModel>,
        session: ChatSession,
    ) -> Self {
        Self {
            source,
            search,
            model,
            session,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Rebuild the context from the store. On failure the previous context
    /// is kept.
    pub async fn sync(&mut self) -> Result<SyncSummary> {
        let Some((table, records)) = self.source.find_table().await else {
            tracing::warn!("sync found no data in any candidate table");
            bail!("no records found in any candidate table");
        };

        tracing::debug!(fields = ?field_inventory(&records), "available fields");

        let context = build_context(&records);
        self.session.replace(context, Local::now());
        tracing::info!(table = %table, companies = records.len(), "database synced");

        Ok(SyncSummary {
            table,
            records: records.len(),
        })
    }

    /// Answer a question. Never fails; errors become readable messages.
    pub async fn ask(&mut self, question: &str) -> String {
        if !self.model.is_configured() {
            return ModelError::NotConfigured.to_string();
        }

        if !self.session.has_context() {
            if let Err(e) = self.sync().await {
                tracing::warn!(error = %e, "answering without database context");
            }
        }

        let web_results = if needs_web_search(question) {
            match self.search.search(question).await {
                SearchOutcome::Found(hits) => Some(format_hits(&hits)),
                SearchOutcome::NoResults | SearchOutcome::Unavailable => None,
            }
        } else {
            None
        };

        let system = build_system_prompt(self.session.context(), web_results.as_deref());

        match self.model.complete(&system, question).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "model call failed");
                e.to_string()
            }
        }
    }
}

/// Case-insensitive trigger-word check.
pub fn needs_web_search(question: &str) -> bool {
    let lower = question.to_lowercase();
    SEARCH_TRIGGERS.iter().any(|t| lower.contains(t))
}

/// Compose the system instruction sent with every question.
pub fn build_system_prompt(context: &str, web_results: Option<&str>) -> String {
    let web_section = match web_results {
        Some(results) => format!("WEB SEARCH RESULTS:\n{}\n", results),
        None => String::new(),
    };
    format!(
        "{}\n\nDATABASE CONTEXT:\n{}\n\n{}\n\n{}",
        PROMPT_PREAMBLE, context, web_section, PROMPT_GUIDANCE
    )
}
