//! # rrdbind
//!
//! Bindings for the rrdtool library (librrd) and its caching daemon client.
//!
//! librrd reports errors through a per-thread flag and message buffer. This
//! crate wraps each library call in a clear, invoke, capture sequence and
//! hands back an owned [`Result`], so the message cannot be clobbered by a
//! later call on the same thread. Update, info, fetch and flush can go
//! through an rrdcached instance: when one is configured and reachable the
//! call is sent there, otherwise it runs against the local file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "native")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rrdbind::{Client, Creator, Native, Updater};
//!
//! let client = Client::new(Native);
//!
//! let mut creator = Creator::new("load.rrd", 1_700_000_000, 60);
//! creator.ds("load", "GAUGE", &[&120, &"U", &"U"]);
//! creator.rra("AVERAGE", &[&0.5, &1, &1440]);
//! creator.create(&client, true)?;
//!
//! let mut updater = Updater::new("load.rrd");
//! updater.update(&client, &[&1_700_000_060_i64, &0.42])?;
//!
//! let result = client.fetch("load.rrd", "AVERAGE", 1_700_000_000, 1_700_000_120, 60)?;
//! println!("{:?}", result.value_at_time(0, 1_700_000_060));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "native"))]
//! # fn main() {}
//! ```
//!
//! ## Features
//!
//! - `native`: links the system librrd, enables [`Native`] and the
//!   `rrdbind_*` C ABI in [`ffi`].
//!
//! ## Modules
//!
//! - [`client`]: per-call safe API over any [`Library`]
//! - [`builders`]: create/update/graph/xport argument builders
//! - [`capture`]: the error capture protocol
//! - [`dispatch`]: daemon-or-local routing
//! - [`info`], [`matrix`]: decoded results
//! - [`args`], [`array`]: marshalling helpers

pub mod args;
pub mod array;
pub mod builders;
pub mod capture;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
#[cfg(feature = "native")]
pub mod ffi;
pub mod info;
pub mod library;
pub mod matrix;
#[cfg(feature = "native")]
pub mod native;

#[cfg(test)]
mod testing;

pub use builders::{Creator, Exporter, Grapher, Updater};
pub use client::Client;
pub use config::Config;
pub use error::{Result, RrdError};
pub use info::{GraphInfo, Info, InfoValue};
pub use library::{Library, UpdateFlags};
pub use matrix::{FetchResult, FetchWindow, TimeMatrix, XportResult};
#[cfg(feature = "native")]
pub use native::Native;
