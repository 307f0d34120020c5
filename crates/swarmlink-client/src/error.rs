//! Client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("discovery error: {0}")]
    Discovery(#[from] swarmlink_discovery::DiscoveryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
