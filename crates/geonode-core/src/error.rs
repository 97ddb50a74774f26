use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur while harvesting a
/// GeoNode server and publishing to HDX. It uses the `thiserror` crate for
/// ergonomic error handling and automatic conversion from underlying library
/// errors.
///
/// Skipped items (a region without layers, a region that is not a country, a
/// layer vetoed by an ignore term) are not errors: they are logged and the run
/// continues.
///
/// # Examples
///
/// ```no_run
/// use geonode_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::ConfigError("rules file is empty".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// A rule file or server configuration file is missing or malformed.
    ///
    /// Raised before any processing starts; a run cannot proceed without a
    /// valid rule set.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client request failed.
    ///
    /// This error occurs when a request completes with a non-success status
    /// or its body cannot be decoded.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// The catalog rejected an action (create, update, delete, search).
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid GeoNode server URL provided.
    ///
    /// This error occurs when the provided server URL is malformed
    /// or cannot be used to construct valid API endpoints.
    #[error("Invalid GeoNode server URL: {0}")]
    InvalidServerUrl(String),

    /// Network or connection error.
    ///
    /// This error occurs when a network request fails due to connectivity issues,
    /// DNS resolution failures, or the remote server being unreachable.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// An operation was called in a state it cannot handle.
    ///
    /// Pruning with an empty keep set is the typical case: there is no
    /// dataset left to tell which organisation and maintainer to prune.
    #[error("Precondition failed: {0}")]
    PreconditionError(String),

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ConfigError(msg) => {
                format!(
                    "Configuration problem: {}\n   Check the rules file and servers.toml.",
                    msg
                )
            }
            AppError::ClientError(msg) => {
                if msg.contains("404") {
                    format!(
                        "GeoNode API not found: {}\n   Is this the root URL of a GeoNode server?",
                        msg
                    )
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::CatalogError(msg) => {
                if msg.contains("403") || msg.contains("Authorization") {
                    "HDX refused the request.\n   Check your HDX_API_KEY environment variable."
                        .to_string()
                } else {
                    format!("HDX error: {}", msg)
                }
            }
            AppError::InvalidServerUrl(url) => {
                format!(
                    "Invalid GeoNode server URL: {}\n   Example: https://geonode.wfp.org",
                    url
                )
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   The server may be overloaded. Try again later.",
                    secs
                )
            }
            _ => self.to_string(),
        }
    }
}
