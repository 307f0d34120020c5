//! Swarm state and discovery orchestration for swarmlink.
//!
//! Owns the torrent registry behind the process-wide swarm lock, the
//! per-torrent peer tables, and the set of discovery backends feeding
//! them.

pub mod client;
pub mod config;
pub mod error;
pub mod setup;
pub mod torrent;

pub use client::{Client, ClientState};
pub use config::Config;
pub use error::ClientError;
pub use torrent::Torrent;
