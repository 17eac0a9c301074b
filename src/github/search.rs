//! REST code search with text matches

use super::ensure_success;
use crate::{Config, Result};
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Deserializer};
use std::time::Instant;
use tracing::debug;

/// Media type that makes GitHub include `text_matches` in each hit
const TEXT_MATCH_MEDIA_TYPE: &str = "application/vnd.github.text-match+json";

/// GitHub refuses to return more than this many hits per page
const MAX_PER_PAGE: usize = 100;

/// GitHub serves only the first 1000 results of a search, however many match
const MAX_RESULTS: usize = 1000;

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of `/search/code`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeSearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<CodeHit>,
}

/// A file matching the query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeHit {
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub repository: HitRepository,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text_matches: Vec<RawTextMatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitRepository {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owner: HitOwner,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitOwner {
    #[serde(default, deserialize_with = "null_as_default")]
    pub login: String,
}

/// A snippet GitHub matched, either from file content or the path
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTextMatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub object_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub property: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fragment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matches: Vec<RawMatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub indices: Vec<usize>,
}

/// All hits collected for a query
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub total_count: u64,
    pub hits: Vec<CodeHit>,
}

/// How many hits to collect for `limit` (0 for as many as GitHub serves)
fn result_cap(limit: usize) -> usize {
    match limit {
        0 => MAX_RESULTS,
        limit => limit.min(MAX_RESULTS),
    }
}

/// Whether paging should stop after a page of `received` hits
fn search_done(collected: usize, received: usize, total_count: u64, limit: usize) -> bool {
    let total = usize::try_from(total_count).unwrap_or(usize::MAX);
    received == 0 || collected >= total.min(result_cap(limit))
}

/// Client for GitHub's code search endpoint
pub struct GitHubSearch {
    http: Client,
    url: String,
    token: String,
}

impl GitHubSearch {
    pub fn new(http: Client, config: &Config, token: &str) -> Self {
        Self {
            http,
            url: config.api_url("search/code"),
            token: token.to_string(),
        }
    }

    /// Collect up to `limit` hits (0 for as many as GitHub will page through)
    ///
    /// GitHub stops serving pages after the first 1000 results, so that is
    /// also the most this returns even when `total_count` is higher.
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchPage> {
        let start = Instant::now();
        let cap = result_cap(limit);
        let per_page = cap.min(MAX_PER_PAGE);

        let mut collected = SearchPage::default();
        let mut page = 1;
        loop {
            debug!("Page: {}", page);
            let response = self.page(query, per_page, page).await?;
            let received = response.items.len();
            collected.total_count = response.total_count;
            collected.hits.extend(response.items);
            debug!("Fetched: {}/{}", collected.hits.len(), collected.total_count);

            if search_done(collected.hits.len(), received, collected.total_count, limit) {
                break;
            }
            page += 1;
        }

        collected.hits.truncate(cap);
        debug!("Performing search took {:?}", start.elapsed());
        Ok(collected)
    }

    /// Total number of files GitHub reports for the query
    pub async fn count(&self, query: &str) -> Result<u64> {
        Ok(self.page(query, 1, 1).await?.total_count)
    }

    async fn page(
        &self,
        query: &str,
        per_page: usize,
        page: usize,
    ) -> Result<CodeSearchResponse> {
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("q", query.to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ])
            .header(ACCEPT, TEXT_MATCH_MEDIA_TYPE)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_search_page() {
        let body = r#"{
            "total_count": 2,
            "incomplete_results": false,
            "items": [{
                "name": "lib.rs",
                "path": "src/lib.rs",
                "repository": {"name": "repo", "owner": {"login": "owner"}},
                "text_matches": [{
                    "object_type": "FileContent",
                    "property": "content",
                    "fragment": "fn main() {}",
                    "matches": [{"text": "main", "indices": [3, 7]}]
                }]
            }]
        }"#;
        let page: CodeSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.total_count, 2);
        let hit = &page.items[0];
        assert_eq!(hit.repository.owner.login, "owner");
        assert_eq!(hit.text_matches[0].matches[0].indices, vec![3, 7]);
    }

    #[test]
    fn nulls_and_missing_fields_degrade_to_defaults() {
        let body = r#"{"items": [{
            "path": null,
            "repository": {"owner": null},
            "text_matches": [{"fragment": null}]
        }]}"#;
        let page: CodeSearchResponse = serde_json::from_str(body).unwrap();
        let hit = &page.items[0];
        assert_eq!(hit.path, "");
        assert_eq!(hit.repository.owner.login, "");
        assert_eq!(hit.text_matches[0].fragment, "");
        assert!(hit.text_matches[0].matches.is_empty());
    }

    #[test]
    fn paging_stops_at_the_last_result_github_serves() {
        // 5000 matches, no limit: ten full pages and no eleventh request
        assert!(!search_done(900, 100, 5000, 0));
        assert!(search_done(1000, 100, 5000, 0));
        assert_eq!(result_cap(0), 1000);
        assert_eq!(result_cap(5000), 1000);
    }

    #[test]
    fn paging_stops_at_limit_or_total() {
        assert!(!search_done(100, 100, 5000, 250));
        assert!(search_done(300, 100, 5000, 250));
        assert!(search_done(42, 42, 42, 0));
        assert!(search_done(10, 0, 500, 0));
        assert_eq!(result_cap(30), 30);
    }
}
