use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write feed XML: {0}")]
    Xml(#[from] quick_xml::SeError),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to build feed for {plugin}: {message}")]
    Plugin { plugin: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

impl FeedError {
    /// Wrap any error raised while loading `plugin` into a user-facing diagnostic.
    pub fn plugin(plugin: &str, err: impl std::fmt::Display) -> Self {
        FeedError::Plugin {
            plugin: plugin.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
