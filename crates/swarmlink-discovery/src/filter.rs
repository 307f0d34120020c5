//! Suppression of our own announcements.

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, RwLock};

use tracing::warn;

#[derive(Debug, Default)]
struct FilterState {
    enabled: bool,
    listen_addrs: Vec<SocketAddr>,
    local_ips: Vec<IpAddr>,
}

/// Decides whether an announcement source is this client.
///
/// Cloning yields another handle onto the same address set, so the
/// client can register listeners after the discovery backend has been
/// started. Lookups never touch the swarm lock.
#[derive(Debug, Clone, Default)]
pub struct SelfFilter {
    inner: Arc<RwLock<FilterState>>,
}

impl SelfFilter {
    /// An enabled filter matching the given listening addresses.
    pub fn new(listen_addrs: impl IntoIterator<Item = SocketAddr>) -> Self {
        let filter = Self::default();
        filter.set_enabled(true);
        filter.set_listen_addrs(listen_addrs);
        filter
    }

    /// A filter that never matches.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn set_enabled(&self, enabled: bool) {
        if let Ok(mut state) = self.inner.write() {
            state.enabled = enabled;
        }
    }

    /// Replace the set of addresses the client listens on.
    pub fn set_listen_addrs(&self, addrs: impl IntoIterator<Item = SocketAddr>) {
        if let Ok(mut state) = self.inner.write() {
            state.listen_addrs = addrs.into_iter().map(canonical).collect();
        }
    }

    pub fn add_listen_addr(&self, addr: SocketAddr) {
        if let Ok(mut state) = self.inner.write() {
            let addr = canonical(addr);
            if !state.listen_addrs.contains(&addr) {
                state.listen_addrs.push(addr);
            }
        }
    }

    /// Register an interface address of this host.
    ///
    /// Used to recognise ourselves behind listeners bound to the
    /// unspecified address.
    pub fn add_local_ip(&self, ip: IpAddr) {
        if let Ok(mut state) = self.inner.write() {
            let ip = ip.to_canonical();
            if !state.local_ips.contains(&ip) {
                state.local_ips.push(ip);
            }
        }
    }

    /// Whether `source` is one of our own listening addresses.
    ///
    /// Anything inconclusive counts as a remote peer.
    pub fn is_self(&self, source: SocketAddr) -> bool {
        let Ok(state) = self.inner.read() else {
            warn!(source = %source, "self filter lock poisoned, accepting announcement");
            return false;
        };
        if !state.enabled {
            return false;
        }

        let source = canonical(source);
        state.listen_addrs.iter().any(|listen| {
            if listen.port() != source.port() {
                return false;
            }
            if listen.ip().is_unspecified() {
                source.ip().is_loopback() || state.local_ips.contains(&source.ip())
            } else {
                listen.ip() == source.ip()
            }
        })
    }
}

fn canonical(addr: SocketAddr) -> SocketAddr {
    SocketAddr::new(addr.ip().to_canonical(), addr.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn exact_listen_addr_is_self() {
        let filter = SelfFilter::new([addr("192.168.1.10:6881")]);
        assert!(filter.is_self(addr("192.168.1.10:6881")));
        assert!(!filter.is_self(addr("192.168.1.10:6882")));
        assert!(!filter.is_self(addr("192.168.1.11:6881")));
    }

    #[test]
    fn mapped_ipv6_source_matches_ipv4_listener() {
        let filter = SelfFilter::new([addr("10.0.0.2:6881")]);
        assert!(filter.is_self(addr("[::ffff:10.0.0.2]:6881")));
    }

    #[test]
    fn unspecified_listener_matches_loopback_and_local_ips() {
        let filter = SelfFilter::new([addr("0.0.0.0:6881")]);
        assert!(filter.is_self(addr("127.0.0.1:6881")));
        assert!(!filter.is_self(addr("10.0.0.2:6881")));

        filter.add_local_ip("10.0.0.2".parse().unwrap());
        assert!(filter.is_self(addr("10.0.0.2:6881")));
        assert!(!filter.is_self(addr("10.0.0.3:6881")));
    }

    #[test]
    fn disabled_filter_never_matches() {
        let filter = SelfFilter::disabled();
        filter.set_listen_addrs([addr("10.0.0.2:6881")]);
        assert!(!filter.is_self(addr("10.0.0.2:6881")));

        filter.set_enabled(true);
        assert!(filter.is_self(addr("10.0.0.2:6881")));
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = SelfFilter::new([]);
        assert!(!filter.is_self(addr("127.0.0.1:6881")));
    }

    #[test]
    fn clones_share_addresses() {
        let filter = SelfFilter::new([]);
        let handle = filter.clone();
        handle.add_listen_addr(addr("10.0.0.2:6881"));
        assert!(filter.is_self(addr("10.0.0.2:6881")));
    }

    #[test]
    fn poisoned_lock_accepts_announcement() {
        let filter = SelfFilter::new([addr("10.0.0.2:6881")]);
        let inner = Arc::clone(&filter.inner);
        let _ = std::thread::spawn(move || {
            let _guard = inner.write().unwrap();
            panic!("poison");
        })
        .join();
        assert!(!filter.is_self(addr("10.0.0.2:6881")));
    }
}
