//! Fetching the full text of every matched file
//!
//! Search fragments are partial lines, so the whole file is needed to print
//! whole lines. Files are requested in batches of at most `chunk_size`
//! (GitHub caps GraphQL batches at 100 nodes), several batches in flight at a
//! time. Any failed batch fails the whole fetch.

use super::branches::HEAD_BRANCH;
use super::graphql::{BatchTransport, BlobQuery};
use crate::{Config, FileKey, FullText, Result, SearchResult};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// Split the files of `result` into batches of at most `size`
///
/// Keys are sorted first so a given result always produces the same batches.
pub fn chunk_keys(result: &SearchResult, size: usize) -> Vec<Vec<FileKey>> {
    let mut keys: Vec<FileKey> = result.keys().cloned().collect();
    keys.sort();
    keys.chunks(size.max(1)).map(<[FileKey]>::to_vec).collect()
}

/// One GraphQL request's worth of blob lookups and its alias table
struct BlobBatch {
    queries: Vec<BlobQuery>,
    aliases: HashMap<String, FileKey>,
}

impl BlobBatch {
    fn new(keys: Vec<FileKey>, branches: &HashMap<String, String>) -> Self {
        let mut queries = Vec::with_capacity(keys.len());
        let mut aliases = HashMap::with_capacity(keys.len());
        for (i, key) in keys.into_iter().enumerate() {
            let alias = format!("t{i}");
            let branch = branches
                .get(&key.repo_name())
                .map(String::as_str)
                .unwrap_or(HEAD_BRANCH);
            queries.push(BlobQuery {
                alias: alias.clone(),
                owner: key.owner.clone(),
                name: key.repo_name.clone(),
                expression: format!("{}:{}", branch, key.path),
            });
            aliases.insert(alias, key);
        }
        Self { queries, aliases }
    }

    async fn fetch(self, transport: &dyn BatchTransport) -> Result<FullText> {
        let start = Instant::now();
        let reply = transport.blobs(&self.queries).await?;

        let mut full_text = FullText::default();
        for (alias, blob) in reply {
            let Some(key) = self.aliases.get(&alias) else {
                debug!("ignoring unknown alias in blob reply: {}", alias);
                continue;
            };
            debug!("gql alias to filename: {} => {}", alias, key);
            let Some(blob) = blob else {
                debug!("no blob content for {}", key);
                continue;
            };
            if blob.is_truncated {
                full_text.truncated.insert(key.clone());
            }
            full_text.values.insert(key.clone(), blob.text);
        }

        debug!(
            "Getting full text of {} files took {:?}",
            self.queries.len(),
            start.elapsed()
        );
        Ok(full_text)
    }
}

/// Full text of every file in `result`, read from the branch in `branches`
///
/// Repositories missing from `branches` are read at [`HEAD_BRANCH`].
pub async fn fetch_full_text(
    transport: &dyn BatchTransport,
    result: &SearchResult,
    branches: &HashMap<String, String>,
    config: &Config,
) -> Result<FullText> {
    let batches: Vec<BlobBatch> = chunk_keys(result, config.chunk_size)
        .into_iter()
        .map(|keys| BlobBatch::new(keys, branches))
        .collect();
    debug!("GQL pages to run: {}", batches.len());

    let mut pending = stream::iter(batches)
        .map(|batch| batch.fetch(transport))
        .buffer_unordered(config.concurrency.max(1));

    let mut full_text = FullText::default();
    while let Some(part) = pending.try_next().await? {
        full_text.merge(part);
    }
    Ok(full_text)
}
