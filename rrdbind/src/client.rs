//! Safe, per-call entry points over a [`Library`].
//!
//! [`Client`] is the binding shim: each method marshals its arguments,
//! runs a single guarded library call (clear, invoke, capture) and returns
//! an owned result. Update, info and fetch go through the daemon when one
//! is configured and reachable, otherwise straight to the file.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "native")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rrdbind::{Client, Native};
//!
//! let client = Client::new(Native).with_daemon("unix:/run/rrdcached.sock")?;
//! client.create("load.rrd", 60, 1_700_000_000, &["DS:load:GAUGE:120:U:U", "RRA:AVERAGE:0.5:1:1440"])?;
//! client.update("load.rrd", None, &["1700000060:0.42"])?;
//! let result = client.fetch("load.rrd", "AVERAGE", 1_700_000_000, 1_700_000_120, 60)?;
//! println!("{:?}", result.value_at_time(0, 1_700_000_060));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "native"))]
//! # fn main() {}
//! ```

use std::ffi::{CStr, CString};

use crate::args::{Args, c_string};
use crate::capture::guarded;
use crate::config::Config;
use crate::dispatch::{Route, route};
use crate::error::{Result, RrdError};
use crate::info::Info;
use crate::library::{Library, UpdateFlags};
use crate::matrix::{FetchResult, FetchWindow, XportResult};

/// Turns a non-zero status with a clear error flag into an error.
fn check_status(operation: &'static str, status: i32) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(RrdError::MissingOutput { operation })
    }
}

/// Turns a missing result with a clear error flag into an error.
fn require<T>(operation: &'static str, value: Option<T>) -> Result<T> {
    value.ok_or(RrdError::MissingOutput { operation })
}

/// Binding shim over a native library, with an optional caching daemon.
///
/// A client holds no connection state of its own: reachability of the
/// daemon is checked again on every routed call.
#[derive(Debug)]
pub struct Client<L> {
    lib: L,
    daemon: Option<CString>,
}

impl<L: Library> Client<L> {
    /// Creates a client that always works on local files.
    pub fn new(lib: L) -> Self {
        Self { lib, daemon: None }
    }

    /// Routes update, info, fetch and flush through the daemon at
    /// `address` (`unix:/path`, `host:port`).
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::InteriorNul`] if the address contains a NUL byte.
    pub fn with_daemon(mut self, address: &str) -> Result<Self> {
        self.daemon = Some(c_string(address)?);
        Ok(self)
    }

    /// Creates a client from a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::InteriorNul`] if the configured address contains
    /// a NUL byte.
    pub fn from_config(lib: L, config: &Config) -> Result<Self> {
        let client = Self::new(lib);
        match config.daemon.as_deref() {
            Some(address) => client.with_daemon(address),
            None => Ok(client),
        }
    }

    /// The configured daemon address.
    pub fn daemon(&self) -> Option<&str> {
        self.daemon.as_deref().and_then(|d| d.to_str().ok())
    }

    /// The wrapped library.
    pub fn library(&self) -> &L {
        &self.lib
    }

    fn daemon_c(&self) -> Option<&CStr> {
        self.daemon.as_deref()
    }

    /// Creates a database with base interval `step` seconds, accepting
    /// data after `start`, from `DS:`/`RRA:` definitions in `args`.
    ///
    /// An existing file is overwritten; see [`crate::Creator`] for the
    /// exclusive variant.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with librrd's message on failure.
    pub fn create<S: AsRef<str>>(
        &self,
        filename: &str,
        step: u64,
        start: i64,
        args: &[S],
    ) -> Result<()> {
        let file = c_string(filename)?;
        let args = Args::from_strs(args)?;
        tracing::trace!(filename, step, start, args = ?args.to_strings(), "create");
        let status = guarded(&self.lib, "create", || {
            self.lib.create(&file, step, start, &args)
        })?;
        check_status("create", status)
    }

    /// Feeds `values` (`timestamp:v1:v2...`) into a database, through the
    /// daemon when it is reachable.
    ///
    /// The daemon path ignores `template`. The local path skips values at
    /// or before the last update, exactly as [`Client::update_local`].
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with the library's or daemon's message.
    pub fn update<S: AsRef<str>>(
        &self,
        filename: &str,
        template: Option<&str>,
        values: &[S],
    ) -> Result<()> {
        let file = c_string(filename)?;
        let template = template.map(c_string).transpose()?;
        let args = Args::from_strs(values)?;
        let status = guarded(&self.lib, "update", || {
            match route(&self.lib, self.daemon_c()) {
                Route::Daemon => self.lib.daemon_update(&file, &args),
                Route::Local => self.lib.update(
                    &file,
                    template.as_deref(),
                    UpdateFlags::SKIP_PAST_UPDATES,
                    &args,
                ),
            }
        })?;
        check_status("update", status)
    }

    /// Feeds `values` into the local file, bypassing any daemon.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with librrd's message on failure.
    pub fn update_local<S: AsRef<str>>(
        &self,
        filename: &str,
        template: Option<&str>,
        values: &[S],
    ) -> Result<()> {
        let file = c_string(filename)?;
        let template = template.map(c_string).transpose()?;
        let args = Args::from_strs(values)?;
        let status = guarded(&self.lib, "update", || {
            self.lib.update(
                &file,
                template.as_deref(),
                UpdateFlags::SKIP_PAST_UPDATES,
                &args,
            )
        })?;
        check_status("update", status)
    }

    /// Runs `graphv` with a full argument vector (`graphv`, output file,
    /// options, graph items). An output of `-` renders into the `image`
    /// entry of the returned info.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with librrd's message on failure.
    pub fn graph<S: AsRef<str>>(&self, args: &[S]) -> Result<Info> {
        let args = Args::from_strs(args)?;
        let entries = guarded(&self.lib, "graph", || self.lib.graph(&args))?;
        Ok(Info::from_entries(require("graph", entries)?))
    }

    /// Describes a database, through the daemon when it is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with the library's or daemon's message.
    pub fn info(&self, filename: &str) -> Result<Info> {
        let file = c_string(filename)?;
        let entries = guarded(&self.lib, "info", || {
            match route(&self.lib, self.daemon_c()) {
                Route::Daemon => self.lib.daemon_info(&file),
                Route::Local => self.lib.info(&file),
            }
        })?;
        Ok(Info::from_entries(require("info", entries)?))
    }

    /// Describes the local file, bypassing any daemon.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with librrd's message on failure.
    pub fn info_local(&self, filename: &str) -> Result<Info> {
        let file = c_string(filename)?;
        let entries = guarded(&self.lib, "info", || self.lib.info(&file))?;
        Ok(Info::from_entries(require("info", entries)?))
    }

    /// Reads consolidated data for `(start, end]` at resolution `step`
    /// seconds, through the daemon when it is reachable. The library may
    /// widen the window to its archive boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with the library's or daemon's message.
    pub fn fetch(
        &self,
        filename: &str,
        cf: &str,
        start: i64,
        end: i64,
        step: u64,
    ) -> Result<FetchResult> {
        let file = c_string(filename)?;
        let cf_c = c_string(cf)?;
        let window = FetchWindow::new(start, end, step);
        let data = guarded(&self.lib, "fetch", || {
            match route(&self.lib, self.daemon_c()) {
                Route::Daemon => self.lib.daemon_fetch(&file, &cf_c, window),
                Route::Local => self.lib.fetch(&file, &cf_c, window),
            }
        })?;
        Ok(FetchResult {
            filename: filename.to_string(),
            cf: cf.to_string(),
            data: require("fetch", data)?,
        })
    }

    /// Reads consolidated data from the local file, bypassing any daemon.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with librrd's message on failure.
    pub fn fetch_local(
        &self,
        filename: &str,
        cf: &str,
        start: i64,
        end: i64,
        step: u64,
    ) -> Result<FetchResult> {
        let file = c_string(filename)?;
        let cf_c = c_string(cf)?;
        let window = FetchWindow::new(start, end, step);
        let data = guarded(&self.lib, "fetch", || self.lib.fetch(&file, &cf_c, window))?;
        Ok(FetchResult {
            filename: filename.to_string(),
            cf: cf.to_string(),
            data: require("fetch", data)?,
        })
    }

    /// Asks the daemon to write pending updates for `filename` to disk.
    ///
    /// Without a configured daemon the client library decides from
    /// `RRDCACHED_ADDRESS`. With a configured but unreachable daemon there
    /// is nothing cached to flush and the call succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with the daemon's message.
    pub fn flush(&self, filename: &str) -> Result<()> {
        let file = c_string(filename)?;
        let status = guarded(&self.lib, "flush", || match self.daemon_c() {
            None => self.lib.flush_if_daemon(None, &file),
            Some(daemon) => match route(&self.lib, Some(daemon)) {
                Route::Daemon => self.lib.flush_if_daemon(Some(daemon), &file),
                Route::Local => 0,
            },
        })?;
        if status != 0 {
            tracing::warn!(filename, status, "daemon flush failed");
        }
        check_status("flush", status)
    }

    /// Runs `xport` with a full argument vector (`xport`, options, `DEF`,
    /// `CDEF` and `XPORT` items).
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::Library`] with librrd's message on failure.
    pub fn xport<S: AsRef<str>>(&self, args: &[S]) -> Result<XportResult> {
        let args = Args::from_strs(args)?;
        let data = guarded(&self.lib, "xport", || self.lib.xport(&args))?;
        require("xport", data)
    }
}
