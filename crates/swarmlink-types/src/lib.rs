//! Shared types for swarmlink.
//!
//! This crate contains the value types passed between the discovery
//! backends and the client's swarm state: infohashes, peer provenance,
//! peer candidates, and local-network announcements.

pub mod announce;
pub mod info_hash;
pub mod peer;

pub use announce::Announcement;
pub use info_hash::{DecodeError, InfoHash, INFO_HASH_LEN};
pub use peer::{PeerCandidate, PeerSource};
