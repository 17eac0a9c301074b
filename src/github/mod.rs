//! GitHub-facing half of a search
//!
//! The high-level flow:
//!
//! - Run the code search with the given query
//! - Coerce the hits into [`SearchResult`]
//! - Look up the default branch of every returned repository (skipped when a
//!   branch is configured, which saves a few hundred milliseconds)
//! - Fetch the full contents of every returned file
//! - Overlay the highlighted matches and cut out the matching lines

use crate::text::{self, Highlight};
use crate::{Config, CsError, FullText, Match, Result, SearchResult};
use reqwest::{Client, Response};
use std::collections::HashMap;

mod branches;
mod coerce;
mod fetch;
mod graphql;
mod search;

pub use branches::{HEAD_BRANCH, resolve_branches};
pub use coerce::coerce_results;
pub use fetch::{chunk_keys, fetch_full_text};
pub use graphql::{
    BatchTransport, BlobQuery, BlobReply, GraphQlClient, RepoQuery, blobs_document,
    branches_document,
};
pub use search::{
    CodeHit, CodeSearchResponse, GitHubSearch, HitOwner, HitRepository, RawMatch, RawTextMatch,
    SearchPage,
};

const USER_AGENT: &str = concat!("codesearch/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the REST and GraphQL calls
pub fn http_client() -> Result<Client> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// Turn a non-2xx response into [`CsError::ApiError`]
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(CsError::ApiError {
        status: status.as_u16(),
        message,
    })
}

/// Everything a search produced, from raw fragments to printable lines
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub result: SearchResult,
    /// `owner/repo` to branch name
    pub branches: HashMap<String, String>,
    pub full_text: FullText,
    pub matches: Vec<Match>,
}

/// Branch lookup, content fetch and line extraction over an existing result
pub async fn process(
    transport: &dyn BatchTransport,
    result: SearchResult,
    config: &Config,
    highlight: &Highlight,
) -> Result<SearchOutcome> {
    let branches = resolve_branches(transport, &result, config).await?;
    let full_text = fetch_full_text(transport, &result, &branches, config).await?;
    let matches = text::create_matches(&result, &full_text, &branches, config, highlight);
    Ok(SearchOutcome {
        result,
        branches,
        full_text,
        matches,
    })
}

/// Builder for a GitHub code search
pub struct CodeSearch {
    query: String,
    config: Config,
    highlight: Highlight,
}

impl CodeSearch {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            config: Config::default(),
            highlight: Highlight::default(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = highlight;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of files GitHub reports for the query
    pub async fn count(&self) -> Result<u64> {
        let token = self.config.token()?;
        GitHubSearch::new(http_client()?, &self.config, &token)
            .count(&self.query)
            .await
    }

    /// Run only the search, without fetching any file contents
    pub async fn search_result(&self) -> Result<SearchResult> {
        let token = self.config.token()?;
        let page = GitHubSearch::new(http_client()?, &self.config, &token)
            .search(&self.query, self.config.limit)
            .await?;
        Ok(coerce_results(&page.hits))
    }

    /// Fetch contents for `result` and build the output lines
    pub async fn resolve(&self, result: SearchResult) -> Result<SearchOutcome> {
        let token = self.config.token()?;
        let transport = GraphQlClient::new(http_client()?, &self.config.graphql_url(), &token);
        process(&transport, result, &self.config, &self.highlight).await
    }

    /// Execute the whole search
    pub async fn run(self) -> Result<SearchOutcome> {
        let result = self.search_result().await?;
        self.resolve(result).await
    }
}
