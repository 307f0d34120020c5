//! Peer discovery backends for swarmlink.
//!
//! Defines the [`PeerDiscovery`] trait the client uses to drive every
//! discovery backend uniformly, and the BEP 14 local service discovery
//! backend ([`LsdService`]) that folds local-network announcements into
//! the client's swarm state.

use async_trait::async_trait;
use serde::Serialize;
use swarmlink_types::InfoHash;

pub mod consumer;
pub mod error;
pub mod filter;
pub mod lsd;
pub mod router;
pub mod swarm;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use consumer::ConsumerState;
pub use error::DiscoveryError;
pub use filter::SelfFilter;
pub use lsd::{LsdService, LsdStats};
pub use router::{route_announcement, RouteOutcome};
pub use swarm::{PeerSink, SharedSwarm, TorrentRegistry};
pub use transport::LsdTransport;

/// Point-in-time counters for one discovery backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub backend: &'static str,
    pub peers_added: u64,
    /// Local service discovery details, for the LSD backend only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lsd: Option<LsdStats>,
}

impl DiscoveryStats {
    /// A snapshot with no backend-specific details.
    pub fn new(backend: &'static str, peers_added: u64) -> Self {
        Self {
            backend,
            peers_added,
            lsd: None,
        }
    }
}

/// A source of peers the client can start, announce through, and close.
#[async_trait]
pub trait PeerDiscovery: Send + Sync + 'static {
    /// Short backend name for logs and status output.
    fn name(&self) -> &'static str;

    /// Start the backend's background tasks.
    async fn start(&mut self) -> Result<(), DiscoveryError>;

    /// Advertise that we have `info_hash`.
    async fn announce(&self, info_hash: &InfoHash) -> Result<(), DiscoveryError>;

    /// Write a human-readable status line. Best effort.
    fn write_status(&self, out: &mut dyn std::io::Write);

    fn stats(&self) -> DiscoveryStats;

    /// Release the backend's resources.
    async fn close(&mut self) -> Result<(), DiscoveryError>;
}
