//! Daemon-versus-local routing for update, info, fetch and flush.
//!
//! Every routed call makes one connection attempt to the named rrdcached
//! instance and then asks the client library whether that daemon is
//! connected. There is no retry, backoff or cached decision; the client
//! library keeps its own socket between calls.
//!
//! A failed connect leaves its own message in the library's error state.
//! The fallback clears it so the local call is judged on its own outcome.
//!
//! Once the check says "connected", the operation goes to the daemon and its
//! failures are reported as they are. The connection can still drop between
//! the check and the call; that surfaces as a daemon error, never as a
//! local write.

use std::ffi::CStr;

use crate::capture::ErrorState;

/// Connection management of the rrdcached client.
pub trait DaemonLink {
    /// Attempts to connect to `daemon`. Failures are reflected by
    /// [`DaemonLink::is_connected`], not returned.
    fn connect(&self, daemon: &CStr);

    /// Returns `true` if the client is connected to `daemon`.
    fn is_connected(&self, daemon: &CStr) -> bool;
}

/// Where a routed operation is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Through the caching daemon.
    Daemon,
    /// Directly against the local file.
    Local,
}

/// Picks the route for one call.
///
/// Without a daemon address the call is local and no connection is
/// attempted. Must run inside the same clear/capture window as the routed
/// call.
pub fn route<L: DaemonLink + ErrorState + ?Sized>(link: &L, daemon: Option<&CStr>) -> Route {
    let Some(daemon) = daemon else {
        return Route::Local;
    };

    link.connect(daemon);
    if link.is_connected(daemon) {
        tracing::debug!(daemon = %daemon.to_string_lossy(), "routing through daemon");
        Route::Daemon
    } else {
        tracing::debug!(
            daemon = %daemon.to_string_lossy(),
            "daemon not connected, falling back to local file"
        );
        link.clear_error();
        Route::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLibrary;

    #[test]
    fn test_no_daemon_is_local_without_connecting() {
        let lib = FakeLibrary::new();
        assert_eq!(route(&lib, None), Route::Local);
        assert!(lib.calls().is_empty());
    }

    #[test]
    fn test_reachable_daemon_routes_to_daemon() {
        let lib = FakeLibrary::new().with_daemon("unix:/run/rrdcached.sock");
        assert_eq!(route(&lib, Some(c"unix:/run/rrdcached.sock")), Route::Daemon);
        assert_eq!(lib.calls(), vec!["connect", "is_connected"]);
    }

    #[test]
    fn test_unreachable_daemon_falls_back() {
        let lib = FakeLibrary::new().with_daemon("unix:/run/rrdcached.sock");
        assert_eq!(route(&lib, Some(c"127.0.0.1:1")), Route::Local);
    }

    #[test]
    fn test_fallback_discards_connect_error() {
        let lib = FakeLibrary::new();
        lib.clear_error();
        assert_eq!(route(&lib, Some(c"127.0.0.1:1")), Route::Local);
        assert_eq!(lib.error(), None);
    }

    #[test]
    fn test_each_call_reconnects() {
        let lib = FakeLibrary::new().with_daemon("d");
        route(&lib, Some(c"d"));
        route(&lib, Some(c"d"));
        assert_eq!(
            lib.calls(),
            vec!["connect", "is_connected", "connect", "is_connected"]
        );
    }
}
