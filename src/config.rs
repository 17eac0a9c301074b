//! Search configuration
//!
//! A `Config` is a plain value handed to each stage of the pipeline. Nothing
//! reads process-wide state except the loaders in this module.

use crate::{CsError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up in the home directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = ".codesearch.toml";

/// Upper bound on items in one GraphQL batch request
pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// REST API root, e.g. `https://api.github.com/` or a GitHub Enterprise `/api/v3/`
    pub base_url: String,
    /// Branch to read every repository from; skips the default-branch lookup
    pub default_branch: Option<String>,
    /// Spaces per tab in printed lines
    pub tab_width: usize,
    pub before: usize,
    pub after: usize,
    /// Lines of context in both directions; the larger of this and `before`/`after` wins
    pub context: usize,
    /// Maximum fragments to show (and hits to request); 0 means no limit
    pub limit: usize,
    pub chunk_size: usize,
    /// Content chunk requests allowed in flight at once
    pub concurrency: usize,
    pub token_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com/".to_string(),
            default_branch: None,
            tab_width: 2,
            before: 0,
            after: 0,
            context: 0,
            limit: 30,
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: 4,
            token_file: None,
        }
    }
}

impl Config {
    /// Load from an explicit path, or from `~/.codesearch.toml` if it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE)) {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn before_lines(&self) -> usize {
        self.before.max(self.context)
    }

    pub fn after_lines(&self) -> usize {
        self.after.max(self.context)
    }

    /// GraphQL endpoint derived from `base_url`
    pub fn graphql_url(&self) -> String {
        if self.base_url.ends_with('/') {
            format!("{}graphql", self.base_url)
        } else {
            format!("{}/graphql", self.base_url)
        }
    }

    /// REST endpoint for `path` (no leading slash)
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Root of the website serving `base_url`, used for line links
    ///
    /// github.com serves its API from an `api.` subdomain while GitHub
    /// Enterprise serves it under `/api`; both map back to the bare host.
    pub fn site_url(&self) -> String {
        let (scheme, rest) = self
            .base_url
            .split_once("://")
            .unwrap_or(("https", self.base_url.as_str()));
        let host = rest.split('/').next().unwrap_or_default();
        let host = host.strip_prefix("api.").unwrap_or(host);
        format!("{}://{}", scheme, host)
    }

    /// The GitHub token: `GITHUB_TOKEN` first, then `token_file`
    pub fn token(&self) -> Result<String> {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }
        self.token_from_file()
    }

    fn token_from_file(&self) -> Result<String> {
        let path = self.token_file.as_ref().ok_or(CsError::MissingToken)?;
        let token = std::fs::read_to_string(path)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(CsError::MissingToken);
        }
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn directional_context_takes_the_larger_value() {
        let config = Config { before: 1, after: 0, context: 3, ..Config::default() };
        assert_eq!(config.before_lines(), 3);
        assert_eq!(config.after_lines(), 3);

        let config = Config { before: 5, after: 2, context: 3, ..Config::default() };
        assert_eq!(config.before_lines(), 5);
        assert_eq!(config.after_lines(), 3);
    }

    #[test]
    fn graphql_url_tolerates_missing_slash() {
        let mut config = Config::default();
        assert_eq!(config.graphql_url(), "https://api.github.com/graphql");
        config.base_url = "https://ghe.example.com/api".into();
        assert_eq!(config.graphql_url(), "https://ghe.example.com/api/graphql");
        assert_eq!(config.api_url("search/code"), "https://ghe.example.com/api/search/code");
    }

    #[test]
    fn site_url_strips_api_subdomain_and_path() {
        let mut config = Config::default();
        assert_eq!(config.site_url(), "https://github.com");
        config.base_url = "https://ghe.example.com/api/v3/".into();
        assert_eq!(config.site_url(), "https://ghe.example.com");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml("default_branch = \"main\"\ntab_width = 4\n").unwrap();
        assert_eq!(config.default_branch.as_deref(), Some("main"));
        assert_eq!(config.tab_width, 4);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.limit, 30);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = Config::from_toml("tab_width = \"wide\"").unwrap_err();
        assert!(matches!(err, CsError::ConfigError(_)));
    }

    #[test]
    fn token_is_read_and_trimmed_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "ghp_secret\n").unwrap();
        let config = Config { token_file: Some(path), ..Config::default() };
        assert_eq!(config.token_from_file().unwrap(), "ghp_secret");
    }

    #[test]
    fn missing_token_file_setting_is_reported() {
        let config = Config::default();
        assert!(matches!(config.token_from_file(), Err(CsError::MissingToken)));
    }
}
