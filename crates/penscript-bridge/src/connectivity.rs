// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connectivity sources for network-dependent sends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::traits::ConnectivitySource;

/// Flag set by whoever observes the network (platform callbacks, tests).
#[derive(Debug, Clone)]
pub struct SharedConnectivity {
    online: Arc<AtomicBool>,
}

impl SharedConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was != online {
            info!(online, "connectivity changed");
        }
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivitySource for SharedConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Checks for a usable route on every query.
///
/// Connecting a UDP socket sends nothing; it only asks the OS to pick a
/// route, so this is cheap and works without DNS.
pub struct RouteConnectivity {
    target: String,
    last: Mutex<Option<bool>>,
}

impl RouteConnectivity {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            last: Mutex::new(None),
        }
    }

    fn has_route(&self) -> bool {
        std::net::UdpSocket::bind("0.0.0.0:0")
            .and_then(|s| {
                s.connect(self.target.as_str())?;
                s.local_addr()
            })
            .map(|addr| !addr.ip().is_loopback())
            .unwrap_or(false)
    }
}

impl Default for RouteConnectivity {
    fn default() -> Self {
        Self::new("8.8.8.8:53")
    }
}

impl ConnectivitySource for RouteConnectivity {
    fn is_online(&self) -> bool {
        let online = self.has_route();
        if let Ok(mut last) = self.last.lock() {
            match (*last, online) {
                (Some(false), true) => info!("network connectivity restored"),
                (Some(true), false) => warn!("network connectivity lost"),
                _ => {}
            }
            *last = Some(online);
        }
        online
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_flag_is_visible_through_clones() {
        let flag = SharedConnectivity::new(true);
        let observer = flag.clone();
        flag.set_online(false);
        assert!(!observer.is_online());
        flag.set_online(true);
        assert!(observer.is_online());
    }

    #[test]
    fn unroutable_target_reports_offline() {
        let route = RouteConnectivity::new("not-an-address");
        assert!(!route.is_online());
    }
}
