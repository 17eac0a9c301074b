//! Error types for the codesearch library

use thiserror::Error;

/// Result type alias for codesearch operations
pub type Result<T> = std::result::Result<T, CsError>;

/// Errors that end a search invocation
///
/// Per-fragment problems (a snippet that can't be found in the file, a
/// truncated blob) are not errors; they are reported as warnings and the
/// search carries on.
#[derive(Debug, Error)]
pub enum CsError {
    /// Request never produced a usable response
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    /// GitHub answered with a non-success status
    #[error("GitHub API error: HTTP {status}: {message}")]
    ApiError { status: u16, message: String },
    /// GraphQL reply carried errors and no data
    #[error("GraphQL error: {0}")]
    GraphQlError(String),
    /// Response body did not decode
    #[error("Decode error: {0}")]
    DecodeError(#[from] serde_json::Error),
    /// Config file is not valid TOML
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
    /// No GitHub token in the environment or token file
    #[error("No GitHub token found: set GITHUB_TOKEN or token_file in the config")]
    MissingToken,
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Other error
    #[error("Error: {0}")]
    Other(String),
}
