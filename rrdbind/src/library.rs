//! The native library seam.
//!
//! [`Library`] lists the librrd and rrdcached-client entry points the shim
//! uses, with Rust-typed inputs and owned outputs. Implementations report
//! failure only as librrd does: a status or missing result plus the
//! thread-local error state from [`ErrorState`]. Turning that into a
//! `Result` is the job of [`crate::capture`], never of an implementation.

use std::ffi::CStr;

use crate::args::Args;
use crate::capture::ErrorState;
use crate::dispatch::DaemonLink;
use crate::info::InfoEntry;
use crate::matrix::{FetchWindow, TimeMatrix};

/// Extra flags for local updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateFlags(i32);

impl UpdateFlags {
    /// No flags: an update older than the last one is an error.
    pub const NONE: Self = Self(0);

    /// Skip updates at or before the last update time instead of failing.
    pub const SKIP_PAST_UPDATES: Self = Self(0x01);

    /// Raw flag bits as passed to `rrd_updatex_r`.
    pub fn bits(self) -> i32 {
        self.0
    }

    /// Returns `true` if all bits of `other` are set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Native librrd entry points, local and daemon-routed.
///
/// Every method is a single library call. Callers clear the error state
/// before and read it after; see [`crate::capture::guarded`].
pub trait Library: ErrorState + DaemonLink {
    /// `rrd_create_r`. Returns the library status (0 on success).
    fn create(&self, filename: &CStr, step: u64, start: i64, args: &Args) -> i32;

    /// `rrd_updatex_r`. Returns the library status.
    fn update(&self, filename: &CStr, template: Option<&CStr>, flags: UpdateFlags, args: &Args)
    -> i32;

    /// `rrd_graph_v`. `None` when the library returned no info list.
    fn graph(&self, args: &Args) -> Option<Vec<InfoEntry>>;

    /// `rrd_info_r`.
    fn info(&self, filename: &CStr) -> Option<Vec<InfoEntry>>;

    /// `rrd_fetch_r`. `None` on a non-zero status.
    fn fetch(&self, filename: &CStr, cf: &CStr, window: FetchWindow) -> Option<TimeMatrix>;

    /// `rrd_xport`. `None` on a non-zero status.
    fn xport(&self, args: &Args) -> Option<TimeMatrix>;

    /// `rrdc_update` on the connected daemon.
    fn daemon_update(&self, filename: &CStr, args: &Args) -> i32;

    /// `rrdc_info` on the connected daemon.
    fn daemon_info(&self, filename: &CStr) -> Option<Vec<InfoEntry>>;

    /// `rrdc_fetch` on the connected daemon.
    fn daemon_fetch(&self, filename: &CStr, cf: &CStr, window: FetchWindow) -> Option<TimeMatrix>;

    /// `rrdc_flush_if_daemon`. With `daemon` unset the client library falls
    /// back to `RRDCACHED_ADDRESS`; with no daemon at all it is a no-op
    /// returning 0.
    fn flush_if_daemon(&self, daemon: Option<&CStr>, filename: &CStr) -> i32;
}
