//! Turning fragments plus full file text into printable lines

use crate::github::HEAD_BRANCH;
use crate::{Config, FileKey, FullText, Match, SearchResult};
use std::collections::HashMap;
use tracing::warn;

mod context;
mod highlight;

pub use context::{
    LineExtractor, LineSpan, context_lines, context_window, expand_tabs, line_at, split_lines,
};
pub use highlight::{Highlight, Localized, Localizer};

/// Files of a search result in output order: owner, then repo, then path
pub fn sorted_keys(result: &SearchResult) -> Vec<&FileKey> {
    let mut keys: Vec<&FileKey> = result.keys().collect();
    keys.sort();
    keys
}

/// Build every output line for a search
///
/// Files are processed in [`sorted_keys`] order. `config.limit` caps the number
/// of located fragments shown; context lines don't count against it. A file
/// whose repository has no entry in `branches` is reported at [`HEAD_BRANCH`].
pub fn create_matches(
    result: &SearchResult,
    full_text: &FullText,
    branches: &HashMap<String, String>,
    config: &Config,
    highlight: &Highlight,
) -> Vec<Match> {
    let mut matches = Vec::new();
    let mut shown = 0;

    for key in sorted_keys(result) {
        let remaining = match config.limit {
            0 => None,
            limit if shown >= limit => break,
            limit => Some(limit - shown),
        };

        let Some(content) = full_text.get(key) else {
            warn!("no file content returned by GitHub: {}", key);
            continue;
        };

        let localized = Localizer::new(highlight).max_fragments(remaining).localize(
            key,
            content,
            &result[key],
            full_text.is_truncated(key),
        );
        shown += localized.fragments.len();

        let branch = branches
            .get(&key.repo_name())
            .map(String::as_str)
            .unwrap_or(HEAD_BRANCH);
        let extractor = LineExtractor::new(key, branch, config);
        matches.extend(extractor.extract(&localized.text, localized.offsets()));
    }

    matches
}
