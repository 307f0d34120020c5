//! Seams into the client's swarm state.

use std::sync::Arc;

use swarmlink_types::{InfoHash, PeerCandidate};
use tokio::sync::Mutex;

/// Swarm state shared by every discovery source.
///
/// One lock guards the whole torrent registry. Discovery sources hold it
/// for the full duration of folding one batch of peers in, so peer table
/// updates never interleave with torrent creation or teardown.
pub type SharedSwarm<R> = Arc<Mutex<R>>;

/// Receives peer candidates for one torrent.
///
/// Implementations own deduplication of repeated candidates.
pub trait PeerSink {
    fn add_peers(&mut self, peers: Vec<PeerCandidate>);
}

/// Lookup of active torrents by infohash.
pub trait TorrentRegistry: Send + 'static {
    /// The torrent for `info_hash`, if the client is downloading or
    /// seeding it.
    fn torrent_mut(&mut self, info_hash: &InfoHash) -> Option<&mut dyn PeerSink>;
}
