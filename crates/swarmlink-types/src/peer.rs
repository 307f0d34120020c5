//! Peer candidates and their provenance.

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Where a peer candidate was learned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerSource {
    /// Returned by a tracker announce.
    Tracker,
    /// Found through the distributed hash table.
    Dht,
    /// Learned from another peer via peer exchange.
    Pex,
    /// Announced on the local network (BEP 14).
    Lsd,
    /// The peer connected to us.
    Incoming,
    /// Added explicitly by the user.
    DirectEntry,
}

impl std::fmt::Display for PeerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tracker => write!(f, "tracker"),
            Self::Dht => write!(f, "dht"),
            Self::Pex => write!(f, "pex"),
            Self::Lsd => write!(f, "lsd"),
            Self::Incoming => write!(f, "incoming"),
            Self::DirectEntry => write!(f, "direct"),
        }
    }
}

/// A remote address proposed as a peer for one torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerCandidate {
    pub ip: IpAddr,
    pub port: u16,
    pub source: PeerSource,
}

impl PeerCandidate {
    /// Build a candidate from a socket address.
    ///
    /// IPv4-mapped IPv6 addresses are unmapped so the same host always
    /// produces the same candidate address.
    #[must_use]
    pub fn new(addr: SocketAddr, source: PeerSource) -> Self {
        Self {
            ip: addr.ip().to_canonical(),
            port: addr.port(),
            source,
        }
    }

    /// The candidate's socket address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_unmaps_ipv4_mapped_addresses() {
        let mapped: SocketAddr = "[::ffff:10.0.0.5]:6881".parse().unwrap();
        let peer = PeerCandidate::new(mapped, PeerSource::Lsd);
        assert_eq!(peer.addr(), "10.0.0.5:6881".parse::<SocketAddr>().unwrap());
        assert_eq!(peer.source, PeerSource::Lsd);
    }

    #[test]
    fn source_display() {
        assert_eq!(PeerSource::Lsd.to_string(), "lsd");
        assert_eq!(PeerSource::DirectEntry.to_string(), "direct");
    }
}
