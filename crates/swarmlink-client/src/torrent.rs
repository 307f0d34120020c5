//! Per-torrent peer tables.

use std::collections::HashMap;
use std::net::SocketAddr;

use swarmlink_discovery::PeerSink;
use swarmlink_types::{InfoHash, PeerCandidate};
use tracing::debug;

/// An active download or seed.
#[derive(Debug)]
pub struct Torrent {
    pub info_hash: InfoHash,
    pub name: String,
    peers: HashMap<SocketAddr, PeerCandidate>,
    max_peers: usize,
}

impl Torrent {
    pub fn new(info_hash: InfoHash, name: impl Into<String>, max_peers: usize) -> Self {
        Self {
            info_hash,
            name: name.into(),
            peers: HashMap::new(),
            max_peers,
        }
    }

    /// Known peer candidates, in no particular order.
    pub fn peers(&self) -> impl Iterator<Item = &PeerCandidate> {
        self.peers.values()
    }

    pub fn peer(&self, addr: &SocketAddr) -> Option<&PeerCandidate> {
        self.peers.get(addr)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

impl PeerSink for Torrent {
    /// Add candidates not already known. The first source to report an
    /// address keeps it.
    fn add_peers(&mut self, peers: Vec<PeerCandidate>) {
        for peer in peers {
            let addr = peer.addr();
            if self.peers.contains_key(&addr) {
                continue;
            }
            if self.peers.len() >= self.max_peers {
                debug!(torrent = %self.info_hash, peer = %addr, "peer table full, dropping candidate");
                continue;
            }
            self.peers.insert(addr, peer);
        }
    }
}
