//! The multicast announcement transport seam.

use async_trait::async_trait;

use crate::error::DiscoveryError;

/// A BEP 14 local service discovery transport.
///
/// The transport owns the multicast socket and the wire format. Incoming
/// announcements are delivered on the channel handed out when the
/// transport is constructed; the transport closes that channel when it
/// shuts down.
#[async_trait]
pub trait LsdTransport: Send + Sync + 'static {
    /// Run the listener until the transport is closed.
    async fn run(&self) -> Result<(), DiscoveryError>;

    /// Advertise hex infohashes on the local network.
    async fn announce(&self, info_hashes: &[String]) -> Result<(), DiscoveryError>;

    /// Release the socket and close the announcement channel.
    async fn close(&self) -> Result<(), DiscoveryError>;
}
