//! Web search with provider fallback.
//!
//! Providers are tried strictly in order:
//!
//! | Order | Provider | Credential |
//! |-------|----------|------------|
//! | 1 | DuckDuckGo HTML results | none |
//! | 2 | Brave Search | `BRAVE_API_KEY` |
//! | 3 | SerpAPI | `SERPAPI_KEY` |
//!
//! The first provider returning at least one hit wins and later providers
//! are never called. Unconfigured providers are skipped; a provider error
//! marks it unavailable and the chain moves on.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::models::{SearchHit, SearchOutcome};

/// Upper bound on hits returned for a single query.
pub const MAX_HITS: usize = 3;

const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = concat!("vcdb/", env!("CARGO_PKG_VERSION"));
const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";
const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search";

/// One web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short name used in logs (e.g. `"brave"`).
    fn name(&self) -> &str;

    /// Whether the provider has what it needs to run. Unconfigured
    /// providers are skipped without being called.
    fn is_configured(&self) -> bool {
        true
    }

    /// Run `query`, returning at most `limit` hits.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Ordered provider chain.
pub struct SearchAggregator {
    providers: Vec<Box<dyn SearchProvider>>,
    limit: usize,
}

impl SearchAggregator {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>, limit: usize) -> Self {
        Self {
            providers,
            limit: limit.clamp(1, MAX_HITS),
        }
    }

    /// The standard DuckDuckGo → Brave → SerpAPI chain.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.search.timeout_secs);
        let creds = &config.credentials;
        let providers: Vec<Box<dyn SearchProvider>> = vec![
            Box::new(DuckDuckGo::new(timeout)?),
            Box::new(BraveSearch::new(creds.brave_api_key.clone(), timeout)?),
            Box::new(SerpApi::new(creds.serpapi_key.clone(), timeout)?),
        ];
        Ok(Self::new(providers, config.search.max_results))
    }

    pub async fn search(&self, query: &str) -> SearchOutcome {
        tracing::info!(query, "searching web");
        let mut answered_empty = false;

        for provider in &self.providers {
            if !provider.is_configured() {
                tracing::debug!(provider = provider.name(), "skipping unconfigured provider");
                continue;
            }

            match provider.search(query, self.limit).await {
                Ok(mut hits) if !hits.is_empty() => {
                    hits.truncate(self.limit);
                    tracing::info!(provider = provider.name(), hits = hits.len(), "search answered");
                    return SearchOutcome::Found(hits);
                }
                Ok(_) => {
                    tracing::info!(provider = provider.name(), "provider returned no results");
                    answered_empty = true;
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "search provider failed");
                }
            }
        }

        if answered_empty {
            tracing::info!("no search results found");
            SearchOutcome::NoResults
        } else {
            tracing::warn!("all search providers unavailable");
            SearchOutcome::Unavailable
        }
    }
}

/// Render hits as bullet blocks, identical for every provider.
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("• {}\n  {}\n  Source: {}", h.title, h.snippet, h.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build a hit from optional JSON string fields, applying the shared defaults.
fn hit_from(item: &Value, title_key: &str, snippet_key: &str, url_key: &str) -> SearchHit {
    let text = |key: &str| item.get(key).and_then(|v| v.as_str()).map(str::to_string);
    SearchHit {
        title: text(title_key).unwrap_or_else(|| "No title".to_string()),
        snippet: text(snippet_key).unwrap_or_else(|| "No description".to_string()),
        url: text(url_key).unwrap_or_default(),
    }
}

async fn get_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        bail!("HTTP {}", status);
    }
    Ok(response.json().await?)
}

// ============ DuckDuckGo ============

/// Keyless provider backed by DuckDuckGo's HTML results page.
pub struct DuckDuckGo {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGo {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoint(DUCKDUCKGO_ENDPOINT, timeout)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGo {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {}", status);
        }
        let body = response.text().await?;
        parse_duckduckgo(&body, limit)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {:?}: {:?}", css, e))
}

/// Organic results in page order; sponsored entries are skipped.
fn parse_duckduckgo(html: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let result_sel = selector("div.result")?;
    let link_sel = selector("a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let document = Html::parse_document(html);
    let mut hits = Vec::new();

    for result in document.select(&result_sel) {
        if result.value().classes().any(|c| c == "result--ad") {
            continue;
        }
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };

        let title = collapse_text(link.text());
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|s| collapse_text(s.text()))
            .unwrap_or_default();
        let url = link.value().attr("href").map(resolve_redirect).unwrap_or_default();

        hits.push(SearchHit {
            title: if title.is_empty() { "No title".to_string() } else { title },
            snippet: if snippet.is_empty() {
                "No description".to_string()
            } else {
                snippet
            },
            url,
        });
        if hits.len() >= limit {
            break;
        }
    }

    Ok(hits)
}

fn collapse_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result links go through `//duckduckgo.com/l/?uddg=<target>`; unwrap them.
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    match Url::parse(&absolute) {
        Ok(url) if url.path() == "/l/" => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}

// ============ Brave ============

/// Brave Search API; skipped when no subscription token is set.
pub struct BraveSearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl BraveSearch {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_endpoint(BRAVE_ENDPOINT, api_key, timeout)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl SearchProvider for BraveSearch {
    fn name(&self) -> &str {
        "brave"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let Some(key) = &self.api_key else {
            bail!("BRAVE_API_KEY not set");
        };
        let count = limit.to_string();
        let json = get_json(
            self.client
                .get(&self.endpoint)
                .query(&[("q", query), ("count", count.as_str())])
                .header("X-Subscription-Token", key),
        )
        .await?;

        let results = json
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(|r| r.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(results
            .iter()
            .take(limit)
            .map(|r| hit_from(r, "title", "description", "url"))
            .collect())
    }
}

// ============ SerpAPI ============

/// SerpAPI Google results; skipped when no key is set.
pub struct SerpApi {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SerpApi {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_endpoint(SERPAPI_ENDPOINT, api_key, timeout)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl SearchProvider for SerpApi {
    fn name(&self) -> &str {
        "serpapi"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let Some(key) = &self.api_key else {
            bail!("SERPAPI_KEY not set");
        };
        let num = limit.to_string();
        let json = get_json(self.client.get(&self.endpoint).query(&[
            ("q", query),
            ("api_key", key.as_str()),
            ("num", num.as_str()),
        ]))
        .await?;

        let results = json
            .get("organic_results")
            .and_then(|r| r.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(results
            .iter()
            .take(limit)
            .map(|r| hit_from(r, "title", "snippet", "link"))
            .collect())
    }
}
