//! Which branch to read each repository's files from

use super::graphql::{BatchTransport, RepoQuery};
use crate::{Config, Result, SearchResult};
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, warn};

/// Ref used for repositories whose default branch is unknown
pub const HEAD_BRANCH: &str = "HEAD";

/// Map every repository in `result` (`owner/repo`) to a branch name
///
/// A configured `default_branch` is used for all of them without any network
/// call. Otherwise the default branches are looked up in batches of
/// `config.chunk_size` repositories. A repository without a default branch
/// maps to [`HEAD_BRANCH`], so every repository in `result` gets an entry.
pub async fn resolve_branches(
    transport: &dyn BatchTransport,
    result: &SearchResult,
    config: &Config,
) -> Result<HashMap<String, String>> {
    if let Some(name) = config.default_branch.as_deref().filter(|name| !name.is_empty()) {
        debug!("Using configured default branch for everything: {}", name);
        return Ok(result
            .keys()
            .map(|key| (key.repo_name(), name.to_string()))
            .collect());
    }

    let start = Instant::now();
    let repos: BTreeSet<(&str, &str)> = result
        .keys()
        .map(|key| (key.owner.as_str(), key.repo_name.as_str()))
        .collect();
    let repos: Vec<_> = repos.into_iter().collect();

    let mut branches = HashMap::new();
    for chunk in repos.chunks(config.chunk_size.max(1)) {
        // alias -> owner/repo, only meaningful for this request
        let mut aliases = HashMap::with_capacity(chunk.len());
        let queries: Vec<RepoQuery> = chunk
            .iter()
            .enumerate()
            .map(|(i, (owner, name))| {
                let alias = format!("b{i}");
                aliases.insert(alias.clone(), format!("{owner}/{name}"));
                RepoQuery {
                    alias,
                    owner: owner.to_string(),
                    name: name.to_string(),
                }
            })
            .collect();

        let reply = transport.default_branches(&queries).await?;
        for (alias, branch) in reply {
            let Some(repo) = aliases.remove(&alias) else {
                debug!("ignoring unknown alias in branch reply: {}", alias);
                continue;
            };
            let branch = branch.unwrap_or_else(|| {
                warn!("no default branch found for {}, reading {}", repo, HEAD_BRANCH);
                HEAD_BRANCH.to_string()
            });
            branches.insert(repo, branch);
        }
        for repo in aliases.into_values() {
            warn!("no default branch found for {}, reading {}", repo, HEAD_BRANCH);
            branches.insert(repo, HEAD_BRANCH.to_string());
        }
    }

    debug!("Getting default branches took {:?}", start.elapsed());
    Ok(branches)
}
