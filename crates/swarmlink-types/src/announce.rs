//! Local service discovery announcements.

use std::net::SocketAddr;

/// One announcement received from the local-network discovery transport.
///
/// The infohashes are the raw text from the wire. They may be
/// malformed or duplicated; decoding happens when the announcement is
/// routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub info_hashes: Vec<String>,
    pub source: SocketAddr,
}

impl Announcement {
    pub fn new<I, S>(info_hashes: I, source: SocketAddr) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            info_hashes: info_hashes.into_iter().map(Into::into).collect(),
            source,
        }
    }
}
