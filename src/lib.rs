//! # VC Pipeline Chat
//!
//! A conversational front-end over a venture deal-pipeline database.
//!
//! Records are pulled from an Airtable base, flattened into a bounded text
//! context, and handed to a hosted language model together with optional
//! live web search results.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐
//! │ Airtable │──▶│ Context  │──▶│ ChatSession │
//! │  store   │   │ builder  │   └──────┬──────┘
//! └──────────┘   └──────────┘          │
//!                                      ▼
//! ┌──────────────────────┐      ┌──────────────┐      ┌───────────┐
//! │ Search (DDG → Brave  │◀─────│ Orchestrator │─────▶│ Anthropic │
//! │        → SerpAPI)    │      └──────┬───────┘      └───────────┘
//! └──────────────────────┘             │
//!                             ┌────────┴────────┐
//!                             ▼                 ▼
//!                        ┌─────────┐      ┌──────────┐
//!                        │   CLI   │      │   HTTP   │
//!                        │ (vcdb)  │      │  (axum)  │
//!                        └─────────┘      └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment credentials |
//! | [`models`] | Records and search results |
//! | [`store`] | Record fetching with table discovery |
//! | [`context`] | Field-alias resolution and context assembly |
//! | [`search`] | Web search provider chain |
//! | [`llm`] | Language-model client and failure taxonomy |
//! | [`session`] | Current context and last-sync time |
//! | [`orchestrator`] | Sync and question answering |
//! | [`server`] | JSON HTTP API |

pub mod config;
pub mod context;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod search;
pub mod server;
pub mod session;
pub mod store;

use crate::config::Config;
use crate::llm::AnthropicClient;
use crate::orchestrator::Orchestrator;
use crate::search::SearchAggregator;
use crate::session::ChatSession;
use crate::store::AirtableStore;

/// Wire the production store, search chain and model client from config.
///
/// Fails when the data-store credentials are missing.
pub fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let store = AirtableStore::from_config(config)?;
    let search = SearchAggregator::from_config(config)?;
    let model = AnthropicClient::from_config(config)?;
    Ok(Orchestrator::new(
        Box::new(store),
        search,
        Box::new(model),
        ChatSession::new(),
    ))
}
