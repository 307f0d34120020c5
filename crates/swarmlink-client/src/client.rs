//! The swarm owner and its discovery backends.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use swarmlink_discovery::{
    DiscoveryStats, LsdService, LsdTransport, PeerDiscovery, PeerSink, SelfFilter, SharedSwarm,
    TorrentRegistry,
};
use swarmlink_types::{Announcement, InfoHash, PeerCandidate};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ClientError;
use crate::setup;
use crate::torrent::Torrent;

/// Everything guarded by the swarm lock.
#[derive(Debug)]
pub struct ClientState {
    torrents: HashMap<InfoHash, Torrent>,
    max_peers_per_torrent: usize,
}

impl ClientState {
    pub fn new(max_peers_per_torrent: usize) -> Self {
        Self {
            torrents: HashMap::new(),
            max_peers_per_torrent,
        }
    }

    pub fn torrent(&self, info_hash: &InfoHash) -> Option<&Torrent> {
        self.torrents.get(info_hash)
    }

    pub fn torrent_count(&self) -> usize {
        self.torrents.len()
    }
}

impl TorrentRegistry for ClientState {
    fn torrent_mut(&mut self, info_hash: &InfoHash) -> Option<&mut dyn PeerSink> {
        self.torrents
            .get_mut(info_hash)
            .map(|t| t as &mut dyn PeerSink)
    }
}

/// The swarm owner.
///
/// Every discovery source, local or remote, folds peers into the torrent
/// registry under the same lock.
pub struct Client {
    config: Config,
    swarm: SharedSwarm<ClientState>,
    filter: SelfFilter,
    discovery: Vec<Box<dyn PeerDiscovery>>,
}

impl Client {
    /// Create a client from configuration.
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let filter = if config.lsd.self_filter {
            SelfFilter::new([])
        } else {
            SelfFilter::disabled()
        };

        for addr in &config.client.listen_addrs {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| ClientError::Config(format!("invalid listen address {addr}: {e}")))?;
            filter.add_listen_addr(addr);
        }
        for ip in &config.client.local_ips {
            let ip: IpAddr = ip
                .parse()
                .map_err(|e| ClientError::Config(format!("invalid local ip {ip}: {e}")))?;
            filter.add_local_ip(ip);
        }

        let state = ClientState::new(config.client.max_peers_per_torrent);
        Ok(Self {
            config,
            swarm: Arc::new(Mutex::new(state)),
            filter,
            discovery: Vec::new(),
        })
    }

    /// Create a client from the config file at `path`, or the default
    /// location. A missing file yields the default configuration.
    pub fn from_config_path(path: Option<&str>) -> Result<Self, ClientError> {
        Self::new(setup::load_config(path)?)
    }

    /// A handle onto the shared swarm state.
    pub fn swarm(&self) -> SharedSwarm<ClientState> {
        Arc::clone(&self.swarm)
    }

    /// The filter used to recognise our own announcements.
    pub fn self_filter(&self) -> SelfFilter {
        self.filter.clone()
    }

    /// Register a discovery backend.
    pub fn add_discovery(&mut self, backend: Box<dyn PeerDiscovery>) {
        info!(backend = backend.name(), "discovery backend added");
        self.discovery.push(backend);
    }

    /// Wire local service discovery into the swarm.
    ///
    /// Returns `false` when LSD is disabled in the configuration, in which
    /// case the transport is dropped.
    pub fn enable_lsd(
        &mut self,
        transport: Arc<dyn LsdTransport>,
        announcements: mpsc::Receiver<Announcement>,
    ) -> bool {
        if !self.config.lsd.enabled {
            info!("LSD disabled");
            return false;
        }
        let lsd = LsdService::new(
            transport,
            announcements,
            Arc::clone(&self.swarm),
            self.filter.clone(),
        );
        self.add_discovery(Box::new(lsd));
        true
    }

    /// Start tracking a torrent. Returns `false` if it was already known.
    pub async fn add_torrent(&self, info_hash: InfoHash, name: &str) -> bool {
        let mut swarm = self.swarm.lock().await;
        if swarm.torrents.contains_key(&info_hash) {
            return false;
        }
        let torrent = Torrent::new(info_hash, name, swarm.max_peers_per_torrent);
        swarm.torrents.insert(info_hash, torrent);
        info!(info_hash = %info_hash, name, "torrent added");
        true
    }

    pub async fn remove_torrent(&self, info_hash: &InfoHash) -> bool {
        let removed = self.swarm.lock().await.torrents.remove(info_hash).is_some();
        if removed {
            info!(info_hash = %info_hash, "torrent removed");
        }
        removed
    }

    /// Peer candidates known for a torrent.
    pub async fn peers(&self, info_hash: &InfoHash) -> Option<Vec<PeerCandidate>> {
        let swarm = self.swarm.lock().await;
        swarm
            .torrent(info_hash)
            .map(|t| t.peers().copied().collect())
    }

    /// Fold peers from any other source (DHT, tracker, peer exchange) into
    /// a torrent. Returns `false` if the torrent is unknown.
    pub async fn add_peers(&self, info_hash: &InfoHash, peers: Vec<PeerCandidate>) -> bool {
        let mut swarm = self.swarm.lock().await;
        match swarm.torrent_mut(info_hash) {
            Some(torrent) => {
                torrent.add_peers(peers);
                true
            }
            None => false,
        }
    }

    /// Start every registered discovery backend.
    pub async fn start_discovery(&mut self) -> Result<(), ClientError> {
        for backend in &mut self.discovery {
            backend.start().await?;
            info!(backend = backend.name(), "discovery backend started");
        }
        Ok(())
    }

    /// Announce a torrent through every backend.
    ///
    /// All backends are tried; the first failure is returned.
    pub async fn announce(&self, info_hash: &InfoHash) -> Result<(), ClientError> {
        let mut first_err = None;
        for backend in &self.discovery {
            if let Err(e) = backend.announce(info_hash).await {
                warn!(backend = backend.name(), info_hash = %info_hash, error = %e, "announce failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Write one status line per backend.
    pub fn write_status(&self, out: &mut dyn std::io::Write) {
        for backend in &self.discovery {
            backend.write_status(out);
        }
    }

    pub fn discovery_stats(&self) -> Vec<DiscoveryStats> {
        self.discovery.iter().map(|b| b.stats()).collect()
    }

    /// Close every backend, returning the first error.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        let mut first_err = None;
        for backend in &mut self.discovery {
            if let Err(e) = backend.close().await {
                warn!(backend = backend.name(), error = %e, "failed to close discovery backend");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        info!("client closed");
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }
}
