use lnsim_core::CoreError;
use lnsim_core::model::NetworkId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{url} did not answer within {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("Network {0} not found")]
    NetworkNotFound(NetworkId),

    #[error("Core error: {0}")]
    CoreError(#[from] CoreError),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
