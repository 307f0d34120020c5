//! Folding one announcement into the swarm.

use swarmlink_types::{Announcement, InfoHash, PeerCandidate, PeerSource};
use tracing::{debug, trace};

use crate::filter::SelfFilter;
use crate::swarm::TorrentRegistry;

/// What routing one announcement did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    pub peers_added: u64,
    pub decode_errors: u64,
    pub unknown: u64,
    pub self_filtered: bool,
}

/// Route an announcement to the torrents it names.
///
/// The caller must hold the swarm lock for the whole call. Malformed
/// infohashes are logged and skipped; infohashes we have no torrent for
/// are ignored.
pub fn route_announcement<R>(
    registry: &mut R,
    announce: &Announcement,
    filter: &SelfFilter,
) -> RouteOutcome
where
    R: TorrentRegistry + ?Sized,
{
    let mut outcome = RouteOutcome::default();

    if filter.is_self(announce.source) {
        trace!(source = %announce.source, "ignoring our own announcement");
        outcome.self_filtered = true;
        return outcome;
    }

    for raw in &announce.info_hashes {
        let info_hash = match InfoHash::from_hex(raw) {
            Ok(h) => h,
            Err(e) => {
                debug!(info_hash = %raw, error = %e, "failed to decode infohash");
                outcome.decode_errors += 1;
                continue;
            }
        };

        let Some(torrent) = registry.torrent_mut(&info_hash) else {
            outcome.unknown += 1;
            continue;
        };

        torrent.add_peers(vec![PeerCandidate::new(announce.source, PeerSource::Lsd)]);
        outcome.peers_added += 1;
        debug!(info_hash = %info_hash, peer = %announce.source, "added LSD peer");
    }

    outcome
}
