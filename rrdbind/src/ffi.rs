//! C ABI for callers in other languages.
//!
//! Each `rrdbind_*` function is one librrd call wrapped in the error
//! protocol: clear, invoke, capture. The return value is null on success or
//! a heap-allocated copy of librrd's error text, which the caller owns and
//! releases with [`rrdbind_error_free`]. The copy is taken before control
//! leaves the call, so it cannot be overwritten by another librrd call on
//! the same thread.
//!
//! Output parameters are written exactly as librrd writes them; ownership
//! of info lists (`rrd_info_free`) and of name and value arrays
//! (`rrd_freemem`) passes to the caller.
//!
//! The `daemon_*` variants connect to the named rrdcached instance and use
//! it when connected, otherwise the local file.

use std::ffi::CStr;
use std::ptr;

use libc::{c_char, c_int, c_ulong, time_t};
use rrdbind_sys::{self as sys, rrd_info_t, rrd_value_t};

use crate::array::array_element;
use crate::capture::{free_raw_error, guarded_raw};
use crate::dispatch::{Route, route};
use crate::native::Native;

/// Borrows an optional C string.
///
/// # Safety
///
/// `ptr` must be null or NUL-terminated and outlive the returned borrow.
unsafe fn opt_cstr<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: non-null and NUL-terminated per the caller's contract.
        Some(unsafe { CStr::from_ptr(ptr) })
    }
}

/// Creates a database. See `rrd_create_r`.
///
/// # Safety
///
/// `filename` must be a valid C string and `argv` must hold `argc` valid C
/// strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rrdbind_create(
    filename: *const c_char,
    step: c_ulong,
    start: time_t,
    argc: c_int,
    argv: *mut *const c_char,
) -> *mut c_char {
    let (_, err) = guarded_raw(&Native, || {
        // SAFETY: arguments are valid per this function's contract.
        unsafe { sys::rrd_create_r(filename, step, start, argc, argv) }
    });
    err
}

/// Updates the local file, skipping values at or before the last update.
///
/// # Safety
///
/// `filename` must be a valid C string, `template` null or a valid C
/// string, and `argv` must hold `argc` valid C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rrdbind_update(
    filename: *const c_char,
    template: *const c_char,
    argc: c_int,
    argv: *mut *const c_char,
) -> *mut c_char {
    let (_, err) = guarded_raw(&Native, || {
        // SAFETY: arguments are valid per this function's contract.
        unsafe {
            sys::rrd_updatex_r(filename, template, sys::RRD_SKIP_PAST_UPDATES, argc, argv)
        }
    });
    err
}

/// Updates through `daemon` if it is connected, else the local file.
///
/// # Safety
///
/// As [`rrdbind_update`]; `daemon` must be null or a valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rrdbind_daemon_update(
    daemon: *const c_char,
    filename: *const c_char,
    template: *const c_char,
    argc: c_int,
    argv: *mut *const c_char,
) -> *mut c_char {
    // SAFETY: daemon is null or valid per this function's contract.
    let daemon = unsafe { opt_cstr(daemon) };
    let (_, err) = guarded_raw(&Native, || match route(&Native, daemon) {
        // SAFETY: arguments are valid per this function's contract.
        Route::Daemon => unsafe { sys::rrdc_update(filename, argc, argv.cast_const()) },
        // SAFETY: arguments are valid per this function's contract.
        Route::Local => unsafe {
            sys::rrd_updatex_r(filename, template, sys::RRD_SKIP_PAST_UPDATES, argc, argv)
        },
    });
    err
}

/// Renders a graph, storing the info list in `*ret`.
///
/// # Safety
///
/// `ret` must be writable and `argv` must hold `argc` valid C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rrdbind_graph(
    ret: *mut *mut rrd_info_t,
    argc: c_int,
    argv: *mut *mut c_char,
) -> *mut c_char {
    let (_, err) = guarded_raw(&Native, || {
        // SAFETY: arguments are valid per this function's contract.
        unsafe { *ret = sys::rrd_graph_v(argc, argv) };
    });
    err
}

/// Describes a local file, storing the info list in `*ret`.
///
/// # Safety
///
/// `ret` must be writable and `filename` a valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rrdbind_info(
    ret: *mut *mut rrd_info_t,
    filename: *const c_char,
) -> *mut c_char {
    let (_, err) = guarded_raw(&Native, || {
        // SAFETY: arguments are valid per this function's contract.
        unsafe { *ret = sys::rrd_info_r(filename) };
    });
    err
}

/// Describes a file through `daemon` if it is connected, else locally.
///
/// # Safety
///
/// As [`rrdbind_info`]; `daemon` must be null or a valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rrdbind_daemon_info(
    ret: *mut *mut rrd_info_t,
    daemon: *const c_char,
    filename: *const c_char,
) -> *mut c_char {
    // SAFETY: daemon is null or valid per this function's contract.
    let daemon = unsafe { opt_cstr(daemon) };
    let (_, err) = guarded_raw(&Native, || {
        let info = match route(&Native, daemon) {
            // SAFETY: filename is valid per this function's contract.
            Route::Daemon => unsafe { sys::rrdc_info(filename) },
            // SAFETY: filename is valid per this function's contract.
            Route::Local => unsafe { sys::rrd_info_r(filename) },
        };
        // SAFETY: ret is writable per this function's contract.
        unsafe { *ret = info };
    });
    err
}

/// Fetches from a local file. `*ret` receives librrd's status.
///
/// # Safety
///
/// All pointers must be valid; `filename` and `cf` valid C strings.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rrdbind_fetch(
    ret: *mut c_int,
    filename: *const c_char,
    cf: *const c_char,
    start: *mut time_t,
    end: *mut time_t,
    step: *mut c_ulong,
    ds_cnt: *mut c_ulong,
    ds_namv: *mut *mut *mut c_char,
    data: *mut *mut rrd_value_t,
) -> *mut c_char {
    let (_, err) = guarded_raw(&Native, || {
        // SAFETY: arguments are valid per this function's contract.
        unsafe {
            *ret = sys::rrd_fetch_r(filename, cf, start, end, step, ds_cnt, ds_namv, data);
        }
    });
    err
}

/// Fetches through `daemon` if it is connected, else from the local file.
///
/// # Safety
///
/// As [`rrdbind_fetch`]; `daemon` must be null or a valid C string.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rrdbind_daemon_fetch(
    ret: *mut c_int,
    daemon: *const c_char,
    filename: *const c_char,
    cf: *const c_char,
    start: *mut time_t,
    end: *mut time_t,
    step: *mut c_ulong,
    ds_cnt: *mut c_ulong,
    ds_namv: *mut *mut *mut c_char,
    data: *mut *mut rrd_value_t,
) -> *mut c_char {
    // SAFETY: daemon is null or valid per this function's contract.
    let daemon = unsafe { opt_cstr(daemon) };
    let (_, err) = guarded_raw(&Native, || {
        let status = match route(&Native, daemon) {
            // SAFETY: arguments are valid per this function's contract.
            Route::Daemon => unsafe {
                sys::rrdc_fetch(filename, cf, start, end, step, ds_cnt, ds_namv, data)
            },
            // SAFETY: arguments are valid per this function's contract.
            Route::Local => unsafe {
                sys::rrd_fetch_r(filename, cf, start, end, step, ds_cnt, ds_namv, data)
            },
        };
        // SAFETY: ret is writable per this function's contract.
        unsafe { *ret = status };
    });
    err
}

/// Asks `daemon` to flush `filename`. `*ret` receives the client status.
///
/// A null `daemon` is passed through, so librrd falls back to
/// `RRDCACHED_ADDRESS`. An unreachable `daemon` has nothing to flush and
/// leaves `*ret` at 0.
///
/// # Safety
///
/// `ret` must be writable, `daemon` null or a valid C string, `filename` a
/// valid C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rrdbind_daemon_flush(
    ret: *mut c_int,
    daemon: *const c_char,
    filename: *const c_char,
) -> *mut c_char {
    // SAFETY: daemon is null or valid per this function's contract.
    let daemon = unsafe { opt_cstr(daemon) };
    let (_, err) = guarded_raw(&Native, || {
        let status = match daemon {
            // SAFETY: filename is valid per this function's contract.
            None => unsafe { sys::rrdc_flush_if_daemon(ptr::null(), filename) },
            Some(address) => match route(&Native, Some(address)) {
                // SAFETY: address and filename are valid C strings.
                Route::Daemon => unsafe { sys::rrdc_flush_if_daemon(address.as_ptr(), filename) },
                Route::Local => 0,
            },
        };
        // SAFETY: ret is writable per this function's contract.
        unsafe { *ret = status };
    });
    err
}

/// Runs `xport`. `*ret` receives librrd's status.
///
/// # Safety
///
/// All pointers must be valid and `argv` must hold `argc` valid C strings.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn rrdbind_xport(
    ret: *mut c_int,
    argc: c_int,
    argv: *mut *mut c_char,
    xsize: *mut c_int,
    start: *mut time_t,
    end: *mut time_t,
    step: *mut c_ulong,
    col_cnt: *mut c_ulong,
    legend_v: *mut *mut *mut c_char,
    data: *mut *mut rrd_value_t,
) -> *mut c_char {
    let (_, err) = guarded_raw(&Native, || {
        // SAFETY: arguments are valid per this function's contract.
        unsafe {
            *ret = sys::rrd_xport(argc, argv, xsize, start, end, step, col_cnt, legend_v, data);
        }
    });
    err
}

/// Returns `values[i]`. No bounds check.
///
/// # Safety
///
/// `values` must hold more than `i` pointers and `i` must be non-negative.
#[unsafe(no_mangle)]
#[allow(clippy::cast_sign_loss)] // negative indices are excluded by the contract
pub unsafe extern "C" fn rrdbind_array_get(values: *mut *mut c_char, i: c_int) -> *mut c_char {
    // SAFETY: the caller guarantees 0 <= i < len(values).
    unsafe { array_element(values, i as usize) }
}

/// Releases an error string returned by any `rrdbind_*` function.
///
/// # Safety
///
/// `err` must be null or an unreleased error string from this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rrdbind_error_free(err: *mut c_char) {
    // SAFETY: forwarded contract.
    unsafe { free_raw_error(err) };
}
