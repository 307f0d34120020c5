//! The announcement consumption loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use swarmlink_types::Announcement;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use crate::filter::SelfFilter;
use crate::router::{route_announcement, RouteOutcome};
use crate::swarm::{SharedSwarm, TorrentRegistry};

/// Lifecycle of an announcement consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConsumerState {
    /// Built but not started.
    Idle,
    /// Receiving and routing announcements.
    Running,
    /// The transport is closing; waiting for the channel to drain.
    Draining,
    /// The loop has exited.
    Stopped,
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Running totals kept by a consumer.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) announcements: AtomicU64,
    pub(crate) peers_added: AtomicU64,
    pub(crate) decode_errors: AtomicU64,
    pub(crate) unknown: AtomicU64,
    pub(crate) self_filtered: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &RouteOutcome) {
        self.peers_added
            .fetch_add(outcome.peers_added, Ordering::Relaxed);
        self.decode_errors
            .fetch_add(outcome.decode_errors, Ordering::Relaxed);
        self.unknown.fetch_add(outcome.unknown, Ordering::Relaxed);
        if outcome.self_filtered {
            self.self_filtered.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Everything the consumer task owns.
pub(crate) struct Consumer<R> {
    pub(crate) announcements: mpsc::Receiver<Announcement>,
    pub(crate) swarm: SharedSwarm<R>,
    pub(crate) filter: SelfFilter,
    pub(crate) counters: Arc<Counters>,
    pub(crate) state: Arc<watch::Sender<ConsumerState>>,
}

impl<R: TorrentRegistry> Consumer<R> {
    /// Route announcements in arrival order until the channel closes.
    ///
    /// The swarm lock is taken once per announcement and released before
    /// the next receive. A panic while routing stops the consumer but not
    /// the process.
    pub(crate) async fn run(mut self) {
        while let Some(announce) = self.announcements.recv().await {
            self.counters.announcements.fetch_add(1, Ordering::Relaxed);

            let mut swarm = self.swarm.lock().await;
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                route_announcement(&mut *swarm, &announce, &self.filter)
            }));
            drop(swarm);

            match result {
                Ok(outcome) => self.counters.record(&outcome),
                Err(payload) => {
                    error!(
                        source = %announce.source,
                        panic = %panic_message(payload.as_ref()),
                        "LSD announcement consumer panicked"
                    );
                    self.state.send_replace(ConsumerState::Stopped);
                    return;
                }
            }
        }

        info!("LSD announcement channel closed");
        self.state.send_replace(ConsumerState::Stopped);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
