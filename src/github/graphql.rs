//! Batched GraphQL lookups
//!
//! The search API doesn't tell us default branches and only returns partial
//! lines, so both are looked up here. Many repositories or blobs go into a
//! single document, each under an alias chosen by the caller. The `Blob`
//! object doesn't expose its path, so the alias is the only way to tie a
//! reply back to the file it was asked for.

use super::ensure_success;
use crate::{CsError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

/// A repository whose default branch is wanted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoQuery {
    pub alias: String,
    pub owner: String,
    pub name: String,
}

/// A blob addressed by `branch:path` within a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobQuery {
    pub alias: String,
    pub owner: String,
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobReply {
    pub text: String,
    pub is_truncated: bool,
}

/// Executes batches of repository and blob lookups
///
/// Replies are keyed by the query aliases. An item that doesn't exist (no
/// such repository, deleted file, binary blob) is `None` or missing from the
/// map; only a failure of the whole request is an error.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    async fn default_branches(
        &self,
        repos: &[RepoQuery],
    ) -> Result<HashMap<String, Option<String>>>;

    async fn blobs(&self, blobs: &[BlobQuery]) -> Result<HashMap<String, Option<BlobReply>>>;
}

/// A GraphQL string literal; JSON string escaping is valid GraphQL
fn literal(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

pub fn branches_document(repos: &[RepoQuery]) -> String {
    let mut doc = String::from("query {\n");
    for repo in repos {
        doc.push_str(&format!(
            "  {}: repository(owner: {}, name: {}) {{ defaultBranchRef {{ name }} }}\n",
            repo.alias,
            literal(&repo.owner),
            literal(&repo.name),
        ));
    }
    doc.push('}');
    doc
}

pub fn blobs_document(blobs: &[BlobQuery]) -> String {
    let mut doc = String::from("query {\n");
    for blob in blobs {
        doc.push_str(&format!(
            "  {}: repository(owner: {}, name: {}) {{ object(expression: {}) \
             {{ ... on Blob {{ text isTruncated }} }} }}\n",
            blob.alias,
            literal(&blob.owner),
            literal(&blob.name),
            literal(&blob.expression),
        ));
    }
    doc.push('}');
    doc
}

#[derive(Debug, Deserialize)]
struct GqlResponse<T> {
    data: Option<HashMap<String, Option<T>>>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Debug, Deserialize)]
struct GqlError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RepoNode {
    #[serde(rename = "defaultBranchRef")]
    default_branch_ref: Option<BranchRef>,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BlobNode {
    object: Option<BlobObject>,
}

#[derive(Debug, Deserialize)]
struct BlobObject {
    text: Option<String>,
    #[serde(rename = "isTruncated", default)]
    is_truncated: bool,
}

/// Decode a GraphQL reply body into its aliased items
///
/// Item-level errors such as NOT_FOUND come back next to `data` and are only
/// logged. Errors without any `data` fail the whole batch.
fn parse_reply<T: DeserializeOwned>(body: &str) -> Result<HashMap<String, Option<T>>> {
    let reply: GqlResponse<T> = serde_json::from_str(body)?;
    match reply.data {
        Some(data) => {
            for error in &reply.errors {
                debug!("gql item error: {}", error.message);
            }
            Ok(data)
        }
        None => {
            let messages: Vec<_> = reply.errors.into_iter().map(|e| e.message).collect();
            Err(CsError::GraphQlError(if messages.is_empty() {
                "reply has no data".to_string()
            } else {
                messages.join("; ")
            }))
        }
    }
}

fn branches_from(reply: HashMap<String, Option<RepoNode>>) -> HashMap<String, Option<String>> {
    reply
        .into_iter()
        .map(|(alias, node)| {
            let branch = node.and_then(|n| n.default_branch_ref).map(|b| b.name);
            (alias, branch)
        })
        .collect()
}

fn blobs_from(reply: HashMap<String, Option<BlobNode>>) -> HashMap<String, Option<BlobReply>> {
    reply
        .into_iter()
        .map(|(alias, node)| {
            let blob = node.and_then(|n| n.object).and_then(|o| {
                o.text.map(|text| BlobReply {
                    text,
                    is_truncated: o.is_truncated,
                })
            });
            (alias, blob)
        })
        .collect()
}

#[derive(serde::Serialize)]
struct GqlRequest<'a> {
    query: &'a str,
}

/// [`BatchTransport`] over GitHub's GraphQL endpoint
pub struct GraphQlClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl GraphQlClient {
    pub fn new(http: Client, endpoint: &str, token: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        document: &str,
    ) -> Result<HashMap<String, Option<T>>> {
        debug!("gql: {}", document);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&GqlRequest { query: document })
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;
        parse_reply(&body)
    }
}

#[async_trait]
impl BatchTransport for GraphQlClient {
    async fn default_branches(
        &self,
        repos: &[RepoQuery],
    ) -> Result<HashMap<String, Option<String>>> {
        let reply = self.execute(&branches_document(repos)).await?;
        Ok(branches_from(reply))
    }

    async fn blobs(&self, blobs: &[BlobQuery]) -> Result<HashMap<String, Option<BlobReply>>> {
        let reply = self.execute(&blobs_document(blobs)).await?;
        Ok(blobs_from(reply))
    }
}
