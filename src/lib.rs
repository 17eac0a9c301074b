//! # codesearch - grep for GitHub code search
//!
//! GitHub's code search API answers with short, partial fragments of the
//! matching files. This library turns those fragments back into whole,
//! highlighted source lines with optional surrounding context, the way
//! `grep -A/-B/-C` would print them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use codesearch::{Codesearch, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config { context: 2, ..Config::default() };
//!     let outcome = Codesearch::query("org:rust-lang fn main")
//!         .config(config)
//!         .run()
//!         .await?;
//!
//!     for m in &outcome.matches {
//!         println!("{}/{}:{}: {}", m.repo_name(), m.path, m.line_number, m.text);
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod github;
pub mod text;

pub use config::Config;
pub use error::{CsError, Result};
pub use text::Highlight;

/// Main entry point for code searches
pub struct Codesearch;

impl Codesearch {
    /// Search GitHub code for the given query string
    pub fn query(query: &str) -> github::CodeSearch {
        github::CodeSearch::new(query)
    }
}

/// Identity of one matched file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey {
    pub owner: String,
    pub repo_name: String,
    pub path: String,
}

impl FileKey {
    pub fn new(owner: &str, repo_name: &str, path: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo_name: repo_name.to_string(),
            path: path.to_string(),
        }
    }

    /// `owner/repo path`
    pub fn full_name(&self) -> String {
        format!("{}/{} {}", self.owner, self.repo_name, self.path)
    }

    /// `owner/repo`, the key used for branch lookups
    pub fn repo_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo_name)
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {}", self.owner, self.repo_name, self.path)
    }
}

/// A fragment reported by code search and the matched byte ranges inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub fragment: String,
    /// `(start, end)` byte offsets local to `fragment`, end exclusive
    pub indices: Vec<(usize, usize)>,
}

/// Fragments for every matched file
///
/// Iteration order is unspecified; anything that emits output sorts the keys
/// first.
pub type SearchResult = HashMap<FileKey, Vec<TextMatch>>;

/// Full contents of the matched files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullText {
    pub values: HashMap<FileKey, String>,
    /// Files whose content GitHub cut short
    pub truncated: HashSet<FileKey>,
}

impl FullText {
    pub fn get(&self, key: &FileKey) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_truncated(&self, key: &FileKey) -> bool {
        self.truncated.contains(key)
    }

    /// Fold another partial result into this one
    pub fn merge(&mut self, other: FullText) {
        self.values.extend(other.values);
        self.truncated.extend(other.truncated);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One output line: either a matching line or a line of context around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
    /// 1-based line number
    pub line_number: usize,
    /// 0-based byte offset of the match within `text`; 0 for context lines
    pub column_number: usize,
    /// Line content, tabs expanded and matches highlighted
    pub text: String,
}

impl Match {
    /// `owner/repo`
    pub fn repo_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Link to this line on the GitHub site rooted at `site`
    pub fn url(&self, site: &str) -> String {
        format!(
            "{}/{}/blob/{}/{}#L{}",
            site.trim_end_matches('/'),
            self.repo_name(),
            self.branch,
            self.path,
            self.line_number
        )
    }
}
