//! BEP 14 local service discovery backend.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use swarmlink_types::{Announcement, InfoHash};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::consumer::{Consumer, ConsumerState, Counters};
use crate::error::DiscoveryError;
use crate::filter::SelfFilter;
use crate::swarm::{SharedSwarm, TorrentRegistry};
use crate::transport::LsdTransport;
use crate::{DiscoveryStats, PeerDiscovery};

/// Counters specific to the LSD backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LsdStats {
    pub state: ConsumerState,
    pub announcements: u64,
    pub decode_errors: u64,
    pub unknown_info_hashes: u64,
    pub self_announcements: u64,
}

/// Local service discovery wired to the client's swarm.
///
/// Starting spawns the transport listener and a consumer task that routes
/// every announcement under the swarm lock. The consumer exits when the
/// transport closes the announcement channel.
pub struct LsdService<R> {
    transport: Option<Arc<dyn LsdTransport>>,
    announcements: Option<mpsc::Receiver<Announcement>>,
    swarm: SharedSwarm<R>,
    filter: SelfFilter,
    counters: Arc<Counters>,
    state: Arc<watch::Sender<ConsumerState>>,
}

impl<R: TorrentRegistry> LsdService<R> {
    pub fn new(
        transport: Arc<dyn LsdTransport>,
        announcements: mpsc::Receiver<Announcement>,
        swarm: SharedSwarm<R>,
        filter: SelfFilter,
    ) -> Self {
        let (state, _) = watch::channel(ConsumerState::Idle);
        Self {
            transport: Some(transport),
            announcements: Some(announcements),
            swarm,
            filter,
            counters: Arc::new(Counters::default()),
            state: Arc::new(state),
        }
    }

    /// Subscribe to consumer state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    pub fn lsd_stats(&self) -> LsdStats {
        let c = &self.counters;
        LsdStats {
            state: self.state(),
            announcements: c.announcements.load(Ordering::Relaxed),
            decode_errors: c.decode_errors.load(Ordering::Relaxed),
            unknown_info_hashes: c.unknown.load(Ordering::Relaxed),
            self_announcements: c.self_filtered.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl<R: TorrentRegistry> PeerDiscovery for LsdService<R> {
    fn name(&self) -> &'static str {
        "lsd"
    }

    async fn start(&mut self) -> Result<(), DiscoveryError> {
        let transport = self.transport.clone().ok_or(DiscoveryError::Closed)?;
        let announcements = self
            .announcements
            .take()
            .ok_or(DiscoveryError::AlreadyStarted)?;

        tokio::spawn(async move {
            if let Err(e) = transport.run().await {
                warn!(error = %e, "LSD transport stopped with error");
            }
        });

        let consumer = Consumer {
            announcements,
            swarm: Arc::clone(&self.swarm),
            filter: self.filter.clone(),
            counters: Arc::clone(&self.counters),
            state: Arc::clone(&self.state),
        };
        self.state.send_replace(ConsumerState::Running);
        tokio::spawn(consumer.run());

        info!("LSD started");
        Ok(())
    }

    async fn announce(&self, info_hash: &InfoHash) -> Result<(), DiscoveryError> {
        let transport = self.transport.as_ref().ok_or(DiscoveryError::Closed)?;
        debug!(info_hash = %info_hash, "LSD announce");
        transport.announce(&[info_hash.to_hex()]).await
    }

    fn write_status(&self, out: &mut dyn std::io::Write) {
        let stats = self.lsd_stats();
        let line = format!(
            "LSD: {}, {} announcements, {} peers added\n",
            stats.state,
            stats.announcements,
            self.counters.peers_added.load(Ordering::Relaxed)
        );
        let _ = out.write_all(line.as_bytes());
    }

    fn stats(&self) -> DiscoveryStats {
        DiscoveryStats {
            lsd: Some(self.lsd_stats()),
            ..DiscoveryStats::new(
                self.name(),
                self.counters.peers_added.load(Ordering::Relaxed),
            )
        }
    }

    /// Close the transport.
    ///
    /// On failure the transport is kept so a later call retries it, and
    /// the consumer, still fed by the open channel, stays `Running`.
    async fn close(&mut self) -> Result<(), DiscoveryError> {
        let Some(transport) = self.transport.clone() else {
            return Ok(());
        };
        let draining = self.state.send_if_modified(|state| {
            if *state == ConsumerState::Running {
                *state = ConsumerState::Draining;
                true
            } else {
                false
            }
        });
        info!("closing LSD");

        match transport.close().await {
            Ok(()) => {
                self.transport = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to close LSD transport");
                if draining {
                    self.state.send_if_modified(|state| {
                        if *state == ConsumerState::Draining {
                            *state = ConsumerState::Running;
                            true
                        } else {
                            false
                        }
                    });
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use swarmlink_types::PeerSource;
    use tokio::sync::Mutex;

    use super::*;
    use crate::mock::MockTransport;
    use crate::router::tests::{FakeRegistry, DEADBEEF};

    fn service(
        registry: FakeRegistry,
        filter: SelfFilter,
    ) -> (LsdService<FakeRegistry>, Arc<MockTransport>, SharedSwarm<FakeRegistry>) {
        let (transport, rx) = MockTransport::new(16);
        let swarm = Arc::new(Mutex::new(registry));
        let service = LsdService::new(transport.clone(), rx, Arc::clone(&swarm), filter);
        (service, transport, swarm)
    }

    async fn wait_for_state(rx: &mut watch::Receiver<ConsumerState>, want: ConsumerState) {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
            .await
            .expect("timed out waiting for consumer state")
            .expect("state sender dropped");
    }

    fn source() -> SocketAddr {
        "10.0.0.5:6881".parse().unwrap()
    }

    #[tokio::test]
    async fn routes_announcements_until_closed() {
        let (mut lsd, transport, swarm) = service(FakeRegistry::with(&[DEADBEEF]), SelfFilter::new([]));
        let mut state = lsd.state_receiver();
        assert_eq!(lsd.state(), ConsumerState::Idle);

        lsd.start().await.unwrap();
        assert!(transport.inject(Announcement::new([DEADBEEF, "not-a-hash"], source())).await);

        lsd.close().await.unwrap();
        wait_for_state(&mut state, ConsumerState::Stopped).await;

        let peers = swarm.lock().await.peers(DEADBEEF);
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].source, PeerSource::Lsd);

        let stats = lsd.stats();
        assert_eq!(stats.peers_added, 1);
        let lsd_stats = stats.lsd.unwrap();
        assert_eq!(lsd_stats.announcements, 1);
        assert_eq!(lsd_stats.decode_errors, 1);
        assert_eq!(lsd_stats.state, ConsumerState::Stopped);
    }

    #[tokio::test]
    async fn channel_closure_stops_consumer_and_close_is_clean() {
        let (mut lsd, transport, _swarm) = service(FakeRegistry::default(), SelfFilter::new([]));
        let mut state = lsd.state_receiver();
        lsd.start().await.unwrap();

        transport.close_channel();
        wait_for_state(&mut state, ConsumerState::Stopped).await;

        lsd.close().await.unwrap();
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let (mut lsd, _transport, _swarm) = service(FakeRegistry::default(), SelfFilter::new([]));
        lsd.start().await.unwrap();
        assert!(matches!(lsd.start().await, Err(DiscoveryError::AlreadyStarted)));
        lsd.close().await.unwrap();
    }

    #[tokio::test]
    async fn announce_forwards_hex_to_transport() {
        let (lsd, transport, _swarm) = service(FakeRegistry::default(), SelfFilter::new([]));
        let hash = InfoHash::from_hex(DEADBEEF).unwrap();
        lsd.announce(&hash).await.unwrap();
        assert_eq!(transport.announced(), vec![vec![DEADBEEF.to_string()]]);
    }

    #[tokio::test]
    async fn transport_errors_are_returned_verbatim() {
        let (mut lsd, transport, _swarm) = service(FakeRegistry::default(), SelfFilter::new([]));
        let hash = InfoHash::from_hex(DEADBEEF).unwrap();

        transport.fail_announce_with("multicast unreachable");
        let err = lsd.announce(&hash).await.unwrap_err();
        assert_eq!(err.to_string(), "transport error: multicast unreachable");

        transport.fail_close_with("socket busy");
        let err = lsd.close().await.unwrap_err();
        assert_eq!(err.to_string(), "transport error: socket busy");
    }

    #[tokio::test]
    async fn close_is_idempotent_and_disables_announce() {
        let (mut lsd, _transport, _swarm) = service(FakeRegistry::default(), SelfFilter::new([]));
        lsd.close().await.unwrap();
        lsd.close().await.unwrap();

        let hash = InfoHash::from_hex(DEADBEEF).unwrap();
        assert!(matches!(lsd.announce(&hash).await, Err(DiscoveryError::Closed)));
        assert!(matches!(lsd.start().await, Err(DiscoveryError::Closed)));
    }

    #[tokio::test]
    async fn write_status_reports_state() {
        let (lsd, _transport, _swarm) = service(FakeRegistry::default(), SelfFilter::new([]));
        let mut out = Vec::new();
        lsd.write_status(&mut out);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "LSD: idle, 0 announcements, 0 peers added\n"
        );
    }

    #[tokio::test]
    async fn stats_serialize() {
        let (lsd, _transport, _swarm) = service(FakeRegistry::default(), SelfFilter::new([]));
        let json = serde_json::to_value(lsd.stats()).unwrap();
        assert_eq!(json["backend"], "lsd");
        assert_eq!(json["lsd"]["state"], "Idle");
    }

    #[tokio::test]
    async fn failed_close_is_retried_and_keeps_consumer_running() {
        let (mut lsd, transport, swarm) = service(FakeRegistry::with(&[DEADBEEF]), SelfFilter::new([]));
        let mut state = lsd.state_receiver();
        lsd.start().await.unwrap();

        transport.fail_close_with("socket busy");
        for _ in 0..2 {
            let err = lsd.close().await.unwrap_err();
            assert_eq!(err.to_string(), "transport error: socket busy");
            assert_eq!(lsd.state(), ConsumerState::Running);
        }
        assert_eq!(transport.close_calls(), 2);

        // The channel is still open, so announcements keep flowing.
        let hash = InfoHash::from_hex(DEADBEEF).unwrap();
        lsd.announce(&hash).await.unwrap();
        assert!(transport.inject(Announcement::new([DEADBEEF], source())).await);

        transport.clear_close_error();
        lsd.close().await.unwrap();
        assert_eq!(transport.close_calls(), 3);
        wait_for_state(&mut state, ConsumerState::Stopped).await;
        assert_eq!(swarm.lock().await.peers(DEADBEEF).len(), 1);

        lsd.close().await.unwrap();
        assert_eq!(transport.close_calls(), 3);
    }
}
