//! In-memory LSD transport for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swarmlink_types::Announcement;
use tokio::sync::{mpsc, Notify};

use crate::error::DiscoveryError;
use crate::transport::LsdTransport;

/// Mock transport that delivers injected announcements.
///
/// Records every outbound announce so tests can assert on it, and can be
/// told to fail `announce` or `close` with a transport error.
pub struct MockTransport {
    feed: Mutex<Option<mpsc::Sender<Announcement>>>,
    announced: Mutex<Vec<Vec<String>>>,
    announce_error: Mutex<Option<String>>,
    close_error: Mutex<Option<String>>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    shutdown: Notify,
}

impl MockTransport {
    /// Create a transport and the announcement channel it feeds.
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Announcement>) {
        let (tx, rx) = mpsc::channel(capacity);
        let transport = Self {
            feed: Mutex::new(Some(tx)),
            announced: Mutex::new(Vec::new()),
            announce_error: Mutex::new(None),
            close_error: Mutex::new(None),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            shutdown: Notify::new(),
        };
        (Arc::new(transport), rx)
    }

    /// Deliver an announcement as if it arrived from the network.
    ///
    /// Returns `false` once the channel has been closed.
    pub async fn inject(&self, announce: Announcement) -> bool {
        let tx = self.feed.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(announce).await.is_ok(),
            None => false,
        }
    }

    /// Close the announcement channel without closing the transport.
    pub fn close_channel(&self) {
        self.feed.lock().unwrap().take();
    }

    /// Every batch passed to `announce`, in call order.
    pub fn announced(&self) -> Vec<Vec<String>> {
        self.announced.lock().unwrap().clone()
    }

    pub fn fail_announce_with(&self, msg: &str) {
        *self.announce_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `close` fail, leaving the socket and channel open.
    pub fn fail_close_with(&self, msg: &str) {
        *self.close_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_close_error(&self) {
        self.close_error.lock().unwrap().take();
    }

    /// Number of times `close` was called, including failed attempts.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LsdTransport for MockTransport {
    async fn run(&self) -> Result<(), DiscoveryError> {
        if !self.is_closed() {
            self.shutdown.notified().await;
        }
        Ok(())
    }

    async fn announce(&self, info_hashes: &[String]) -> Result<(), DiscoveryError> {
        if let Some(msg) = self.announce_error.lock().unwrap().clone() {
            return Err(DiscoveryError::Transport(msg));
        }
        self.announced.lock().unwrap().push(info_hashes.to_vec());
        Ok(())
    }

    async fn close(&self) -> Result<(), DiscoveryError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.close_error.lock().unwrap().clone() {
            return Err(DiscoveryError::Transport(msg));
        }
        self.closed.store(true, Ordering::SeqCst);
        self.close_channel();
        self.shutdown.notify_one();
        Ok(())
    }
}
