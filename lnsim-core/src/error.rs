use crate::model::NetworkId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network {0} already exists")]
    DuplicateNetwork(NetworkId),

    #[error("Network {0} not found")]
    NetworkNotFound(NetworkId),

    #[error("At least one bitcoin node is required to back {0} lightning node(s)")]
    NoBackend(usize),

    #[error("Too many {0} nodes: their ports would run past 65535")]
    PortRange(&'static str),

    #[error("No network id left above {}", u32::MAX)]
    IdsExhausted,
}

pub type Result<T> = std::result::Result<T, CoreError>;
