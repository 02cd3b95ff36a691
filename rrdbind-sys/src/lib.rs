//! Low-level FFI declarations for librrd and its rrdcached client.
//!
//! These mirror `rrd.h` and `rrd_client.h` from rrdtool 1.4 and later. Only
//! the entry points used by `rrdbind` are declared.
//!
//! # Safety
//!
//! Every function here is `unsafe`: arguments are raw C strings and arrays,
//! and most results are heap allocations the caller must release with
//! [`rrd_freemem`] or [`rrd_info_free`]. For a safe wrapper use the
//! `rrdbind` crate.
//!
//! # Error state
//!
//! librrd reports failures through a thread-local error buffer. Callers
//! clear it with [`rrd_clear_error`] before a call and read it with
//! [`rrd_test_error`] / [`rrd_get_error`] right after. The text returned by
//! [`rrd_get_error`] belongs to the library and is overwritten by the next
//! failing call on the same thread.
//!
//! # Features
//!
//! - `librrd`: link against the system library. Without it the symbols are
//!   declared but not linked.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_int, c_uchar, c_ulong, c_void};

pub use libc::time_t;

/// Sample value type used throughout librrd.
pub type rrd_value_t = f64;

/// `extra_flags` bit for `rrd_updatex_r`: silently skip updates older than
/// the last update instead of failing.
pub const RRD_SKIP_PAST_UPDATES: c_int = 0x01;

/// Binary blob carried by an info entry (rendered images).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct rrd_blob_t {
    /// Size of the blob in bytes.
    pub size: c_ulong,
    /// Pointer to the first byte.
    pub ptr: *mut c_uchar,
}

/// Discriminant of [`rrd_infoval_t`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum rrd_info_type_t {
    /// `u_val`
    RD_I_VAL = 0,
    /// `u_cnt`
    RD_I_CNT,
    /// `u_str`
    RD_I_STR,
    /// `u_int`
    RD_I_INT,
    /// `u_blo`
    RD_I_BLO,
}

/// Value slot of an info entry.
#[repr(C)]
#[derive(Clone, Copy)]
pub union rrd_infoval_t {
    /// Unsigned counter.
    pub u_cnt: c_ulong,
    /// Floating point value.
    pub u_val: rrd_value_t,
    /// NUL-terminated string.
    pub u_str: *mut c_char,
    /// Signed integer.
    pub u_int: c_int,
    /// Binary blob.
    pub u_blo: rrd_blob_t,
}

/// One node of the singly linked list returned by info and graph calls.
#[repr(C)]
pub struct rrd_info_t {
    /// Entry key, e.g. `ds[load].type` or `rra[0].cf`.
    pub key: *mut c_char,
    /// Which union member of `value` is valid.
    pub type_: rrd_info_type_t,
    /// The value.
    pub value: rrd_infoval_t,
    /// Next node, or null.
    pub next: *mut rrd_info_t,
}

unsafe extern "C" {
    // Thread-local error state
    pub fn rrd_clear_error();
    pub fn rrd_test_error() -> c_int;
    pub fn rrd_get_error() -> *mut c_char;

    // Local file operations
    pub fn rrd_create_r(
        filename: *const c_char,
        pdp_step: c_ulong,
        last_up: time_t,
        argc: c_int,
        argv: *mut *const c_char,
    ) -> c_int;

    pub fn rrd_update_r(
        filename: *const c_char,
        template: *const c_char,
        argc: c_int,
        argv: *mut *const c_char,
    ) -> c_int;

    pub fn rrd_updatex_r(
        filename: *const c_char,
        template: *const c_char,
        extra_flags: c_int,
        argc: c_int,
        argv: *mut *const c_char,
    ) -> c_int;

    pub fn rrd_graph_v(argc: c_int, argv: *mut *mut c_char) -> *mut rrd_info_t;

    pub fn rrd_info_r(filename: *const c_char) -> *mut rrd_info_t;

    pub fn rrd_fetch_r(
        filename: *const c_char,
        cf: *const c_char,
        start: *mut time_t,
        end: *mut time_t,
        step: *mut c_ulong,
        ds_cnt: *mut c_ulong,
        ds_namv: *mut *mut *mut c_char,
        data: *mut *mut rrd_value_t,
    ) -> c_int;

    pub fn rrd_xport(
        argc: c_int,
        argv: *mut *mut c_char,
        xsize: *mut c_int,
        start: *mut time_t,
        end: *mut time_t,
        step: *mut c_ulong,
        col_cnt: *mut c_ulong,
        legend_v: *mut *mut *mut c_char,
        data: *mut *mut rrd_value_t,
    ) -> c_int;

    // Memory management
    pub fn rrd_info_free(info: *mut rrd_info_t);
    pub fn rrd_freemem(mem: *mut c_void);

    // rrdcached client
    pub fn rrdc_connect(addr: *const c_char) -> c_int;
    pub fn rrdc_is_connected(daemon_addr: *const c_char) -> c_int;
    pub fn rrdc_update(
        filename: *const c_char,
        values_num: c_int,
        values: *const *const c_char,
    ) -> c_int;
    pub fn rrdc_info(filename: *const c_char) -> *mut rrd_info_t;
    pub fn rrdc_fetch(
        filename: *const c_char,
        cf: *const c_char,
        start: *mut time_t,
        end: *mut time_t,
        step: *mut c_ulong,
        ds_cnt: *mut c_ulong,
        ds_namv: *mut *mut *mut c_char,
        data: *mut *mut rrd_value_t,
    ) -> c_int;
    pub fn rrdc_flush_if_daemon(opt_daemon: *const c_char, filename: *const c_char) -> c_int;
}
