//! Discovery subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("discovery backend already started")]
    AlreadyStarted,

    #[error("discovery backend closed")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
