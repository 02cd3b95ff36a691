//! librrd backend.
//!
//! [`Native`] implements [`Library`] with direct calls into `rrdbind-sys`.
//! Everything the library allocates for a result (info lists, name arrays,
//! value blocks) is held by a drop guard while it is copied into owned
//! Rust values, so it is released on every path.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_ulong, c_void};
use std::ptr::{self, NonNull};

use rrdbind_sys as sys;

use crate::args::Args;
use crate::array::copy_string_array;
use crate::capture::ErrorState;
use crate::dispatch::DaemonLink;
use crate::info::{InfoEntry, InfoValue};
use crate::library::{Library, UpdateFlags};
use crate::matrix::{FetchWindow, TimeMatrix};

/// The system librrd and its rrdcached client.
///
/// librrd keeps its error state per thread, so a `Native` can be used
/// from any number of threads at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Native;

/// Owned info list, freed with `rrd_info_free`.
pub struct InfoTree(NonNull<sys::rrd_info_t>);

impl InfoTree {
    /// Takes ownership of a list returned by librrd. `None` for null.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or the head of a list allocated by librrd that
    /// nothing else frees.
    pub unsafe fn from_raw(ptr: *mut sys::rrd_info_t) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Copies every entry of the list.
    pub fn entries(&self) -> Vec<InfoEntry> {
        let mut entries = Vec::new();
        let mut node = self.0.as_ptr();
        while !node.is_null() {
            // SAFETY: node is a live element of the list we own.
            let current = unsafe { &*node };
            if !current.key.is_null() {
                // SAFETY: key is a NUL-terminated string owned by the node.
                let key = unsafe { CStr::from_ptr(current.key) }
                    .to_string_lossy()
                    .into_owned();
                // SAFETY: the tag says which union member is initialised.
                let value = unsafe { decode_value(current.type_, &current.value) };
                entries.push(InfoEntry { key, value });
            }
            node = current.next;
        }
        entries
    }
}

impl Drop for InfoTree {
    fn drop(&mut self) {
        // SAFETY: we own the list and free it once.
        unsafe { sys::rrd_info_free(self.0.as_ptr()) };
    }
}

/// Reads the union member selected by `kind`.
///
/// # Safety
///
/// `kind` must match the initialised member of `value`.
unsafe fn decode_value(kind: sys::rrd_info_type_t, value: &sys::rrd_infoval_t) -> InfoValue {
    // SAFETY: caller guarantees kind selects the initialised member.
    unsafe {
        match kind {
            sys::rrd_info_type_t::RD_I_VAL => InfoValue::Value(value.u_val),
            sys::rrd_info_type_t::RD_I_CNT => InfoValue::Count(u64::from(value.u_cnt)),
            sys::rrd_info_type_t::RD_I_INT => InfoValue::Int(i64::from(value.u_int)),
            sys::rrd_info_type_t::RD_I_STR => {
                if value.u_str.is_null() {
                    InfoValue::String(String::new())
                } else {
                    InfoValue::String(CStr::from_ptr(value.u_str).to_string_lossy().into_owned())
                }
            }
            sys::rrd_info_type_t::RD_I_BLO => {
                let blob = value.u_blo;
                if blob.ptr.is_null() || blob.size == 0 {
                    InfoValue::Blob(Vec::new())
                } else {
                    let len = usize::try_from(blob.size).unwrap_or(0);
                    InfoValue::Blob(std::slice::from_raw_parts(blob.ptr, len).to_vec())
                }
            }
        }
    }
}

/// Heap block from librrd, released with `rrd_freemem`.
struct Freemem<T>(*mut T);

impl<T> Drop for Freemem<T> {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the block was malloc'd by librrd and is freed once.
            unsafe { sys::rrd_freemem(self.0.cast::<c_void>()) };
        }
    }
}

/// Raw output parameters shared by fetch and xport.
struct RawMatrix {
    start: sys::time_t,
    end: sys::time_t,
    step: c_ulong,
    columns: c_ulong,
    names: *mut *mut c_char,
    data: *mut sys::rrd_value_t,
}

impl RawMatrix {
    fn new(window: FetchWindow) -> Self {
        Self {
            start: window.start as sys::time_t,
            end: window.end as sys::time_t,
            step: window.step as c_ulong,
            columns: 0,
            names: ptr::null_mut(),
            data: ptr::null_mut(),
        }
    }

    /// Copies the result out and frees every native allocation, whether or
    /// not the call succeeded.
    fn take(self, status: c_int) -> Option<TimeMatrix> {
        let columns = usize::try_from(self.columns).unwrap_or(0);
        let names = Freemem(self.names);
        let data = Freemem(self.data);
        let name_guards: Vec<Freemem<c_char>> = if names.0.is_null() {
            Vec::new()
        } else {
            (0..columns)
                // SAFETY: librrd returned `columns` name pointers.
                .map(|i| Freemem(unsafe { crate::array::array_element(names.0, i) }))
                .collect()
        };

        if status != 0 {
            return None;
        }

        let window = FetchWindow::new(i64::from(self.start), i64::from(self.end), u64::from(self.step));
        // SAFETY: names holds `columns` valid strings (or is null).
        let column_names = unsafe { copy_string_array(names.0, columns) };
        let len = window.row_count() * columns;
        let values = if data.0.is_null() || len == 0 {
            Vec::new()
        } else {
            // SAFETY: librrd allocates rows * columns values for the window
            // it returns.
            unsafe { std::slice::from_raw_parts(data.0, len) }.to_vec()
        };
        drop(name_guards);
        Some(TimeMatrix::new(window, column_names, values))
    }
}

impl ErrorState for Native {
    fn clear_error(&self) {
        // SAFETY: touches only this thread's error buffer.
        unsafe { sys::rrd_clear_error() };
    }

    fn error(&self) -> Option<String> {
        // SAFETY: reads this thread's error flag.
        if unsafe { sys::rrd_test_error() } == 0 {
            return None;
        }
        // SAFETY: with the flag set, rrd_get_error returns this thread's
        // NUL-terminated buffer, which we copy before any further call.
        let message = unsafe { CStr::from_ptr(sys::rrd_get_error()) };
        Some(message.to_string_lossy().into_owned())
    }

    fn error_bytes(&self) -> Option<CString> {
        // SAFETY: reads this thread's error flag.
        if unsafe { sys::rrd_test_error() } == 0 {
            return None;
        }
        // SAFETY: as in `error`; the bytes are copied before returning.
        Some(unsafe { CStr::from_ptr(sys::rrd_get_error()) }.to_owned())
    }
}

impl DaemonLink for Native {
    fn connect(&self, daemon: &CStr) {
        // SAFETY: daemon is a valid C string for the duration of the call.
        unsafe { sys::rrdc_connect(daemon.as_ptr()) };
    }

    fn is_connected(&self, daemon: &CStr) -> bool {
        // SAFETY: daemon is a valid C string for the duration of the call.
        unsafe { sys::rrdc_is_connected(daemon.as_ptr()) != 0 }
    }
}

fn opt_ptr(value: Option<&CStr>) -> *const c_char {
    value.map_or(ptr::null(), CStr::as_ptr)
}

impl Library for Native {
    fn create(&self, filename: &CStr, step: u64, start: i64, args: &Args) -> i32 {
        let mut argv = args.argv();
        // SAFETY: all strings outlive the call; argv has argc entries.
        unsafe {
            sys::rrd_create_r(
                filename.as_ptr(),
                step as c_ulong,
                start as sys::time_t,
                args.argc(),
                argv.as_mut_ptr(),
            )
        }
    }

    fn update(
        &self,
        filename: &CStr,
        template: Option<&CStr>,
        flags: UpdateFlags,
        args: &Args,
    ) -> i32 {
        let mut argv = args.argv();
        // SAFETY: all strings outlive the call; argv has argc entries.
        unsafe {
            sys::rrd_updatex_r(
                filename.as_ptr(),
                opt_ptr(template),
                flags.bits(),
                args.argc(),
                argv.as_mut_ptr(),
            )
        }
    }

    fn graph(&self, args: &Args) -> Option<Vec<InfoEntry>> {
        let mut argv = args.argv_mut();
        // SAFETY: argv has argc entries; librrd may permute the pointer
        // array but not the strings.
        let raw = unsafe { sys::rrd_graph_v(args.argc(), argv.as_mut_ptr()) };
        // SAFETY: raw is null or a list we now own.
        unsafe { InfoTree::from_raw(raw) }.map(|tree| tree.entries())
    }

    fn info(&self, filename: &CStr) -> Option<Vec<InfoEntry>> {
        // SAFETY: filename is a valid C string.
        let raw = unsafe { sys::rrd_info_r(filename.as_ptr()) };
        // SAFETY: raw is null or a list we now own.
        unsafe { InfoTree::from_raw(raw) }.map(|tree| tree.entries())
    }

    fn fetch(&self, filename: &CStr, cf: &CStr, window: FetchWindow) -> Option<TimeMatrix> {
        let mut raw = RawMatrix::new(window);
        // SAFETY: every out-pointer refers to a field of `raw`.
        let status = unsafe {
            sys::rrd_fetch_r(
                filename.as_ptr(),
                cf.as_ptr(),
                &mut raw.start,
                &mut raw.end,
                &mut raw.step,
                &mut raw.columns,
                &mut raw.names,
                &mut raw.data,
            )
        };
        raw.take(status)
    }

    fn xport(&self, args: &Args) -> Option<TimeMatrix> {
        let mut raw = RawMatrix::new(FetchWindow::new(0, 0, 0));
        let mut xsize: c_int = 0;
        let mut argv = args.argv_mut();
        // SAFETY: argv has argc entries; out-pointers refer to locals.
        let status = unsafe {
            sys::rrd_xport(
                args.argc(),
                argv.as_mut_ptr(),
                &mut xsize,
                &mut raw.start,
                &mut raw.end,
                &mut raw.step,
                &mut raw.columns,
                &mut raw.names,
                &mut raw.data,
            )
        };
        raw.take(status)
    }

    fn daemon_update(&self, filename: &CStr, args: &Args) -> i32 {
        let argv = args.argv();
        // SAFETY: all strings outlive the call; argv has argc entries.
        unsafe { sys::rrdc_update(filename.as_ptr(), args.argc(), argv.as_ptr()) }
    }

    fn daemon_info(&self, filename: &CStr) -> Option<Vec<InfoEntry>> {
        // SAFETY: filename is a valid C string.
        let raw = unsafe { sys::rrdc_info(filename.as_ptr()) };
        // SAFETY: raw is null or a list we now own.
        unsafe { InfoTree::from_raw(raw) }.map(|tree| tree.entries())
    }

    fn daemon_fetch(&self, filename: &CStr, cf: &CStr, window: FetchWindow) -> Option<TimeMatrix> {
        let mut raw = RawMatrix::new(window);
        // SAFETY: every out-pointer refers to a field of `raw`.
        let status = unsafe {
            sys::rrdc_fetch(
                filename.as_ptr(),
                cf.as_ptr(),
                &mut raw.start,
                &mut raw.end,
                &mut raw.step,
                &mut raw.columns,
                &mut raw.names,
                &mut raw.data,
            )
        };
        raw.take(status)
    }

    fn flush_if_daemon(&self, daemon: Option<&CStr>, filename: &CStr) -> i32 {
        // SAFETY: both strings are valid or null, as the client allows.
        unsafe { sys::rrdc_flush_if_daemon(opt_ptr(daemon), filename.as_ptr()) }
    }
}
