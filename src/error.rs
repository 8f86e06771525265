use thiserror::Error;

#[derive(Error, Debug)]
pub enum StashError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, StashError>;
