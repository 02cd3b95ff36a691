//! Error capture around native library calls.
//!
//! librrd reports failures by setting a thread-local error flag and message
//! buffer instead of returning them. Every wrapped call therefore follows the
//! same three steps, back to back on the calling thread:
//!
//! 1. clear the error state,
//! 2. invoke the library,
//! 3. test the flag and copy the message out.
//!
//! The copy matters: the library owns its buffer and the next failing call
//! on the same thread overwrites it. [`guarded`] turns the outcome into a
//! [`Result`]; [`guarded_raw`] produces the heap-allocated C string handed
//! across the C ABI, byte for byte as the library wrote it.

use std::ffi::CString;
use std::os::raw::c_char;

use crate::error::{Result, RrdError};

/// Access to the library's per-thread "last error" state.
pub trait ErrorState {
    /// Resets the error flag and message for the calling thread.
    fn clear_error(&self);

    /// Returns an owned copy of the current error text, or `None` if the
    /// flag is clear. Does not reset the flag.
    fn error(&self) -> Option<String>;

    /// Returns the current error text as raw C bytes, or `None` if the
    /// flag is clear. Does not reset the flag.
    ///
    /// The default goes through [`error`](Self::error); backends whose
    /// messages may not be UTF-8 override it to keep the bytes intact.
    fn error_bytes(&self) -> Option<CString> {
        self.error().map(to_c_string)
    }
}

/// Runs `call` between a clear and a capture of `state`.
///
/// The value produced by `call` is returned only when the library left its
/// error flag clear. Nothing else may touch the library on this thread
/// while `call` runs.
///
/// # Errors
///
/// Returns [`RrdError::Library`] carrying a copy of the library's message
/// when the flag was set by the call.
pub fn guarded<S, T, F>(state: &S, operation: &'static str, call: F) -> Result<T>
where
    S: ErrorState + ?Sized,
    F: FnOnce() -> T,
{
    state.clear_error();
    let value = call();
    match state.error() {
        Some(message) => {
            tracing::trace!(operation, %message, "library call failed");
            Err(RrdError::Library { operation, message })
        }
        None => Ok(value),
    }
}

/// Same protocol as [`guarded`], for callers on the C ABI.
///
/// Returns the call's value together with a heap-allocated copy of the
/// error bytes, or null when no error occurred. The pointer must be
/// released with [`free_raw_error`].
pub fn guarded_raw<S, T, F>(state: &S, call: F) -> (T, *mut c_char)
where
    S: ErrorState + ?Sized,
    F: FnOnce() -> T,
{
    state.clear_error();
    let value = call();
    let err = state
        .error_bytes()
        .map_or(std::ptr::null_mut(), CString::into_raw);
    (value, err)
}

/// Moves an optional error message onto the heap as a C string.
pub fn into_raw_error(message: Option<String>) -> *mut c_char {
    message.map_or(std::ptr::null_mut(), |m| to_c_string(m).into_raw())
}

/// Converts a message to a C string, dropping interior NULs.
fn to_c_string(message: String) -> CString {
    let message = if message.contains('\0') {
        message.replace('\0', "")
    } else {
        message
    };
    CString::new(message).unwrap_or_default()
}

/// Releases a string produced by [`guarded_raw`] or [`into_raw_error`].
///
/// # Safety
///
/// `err` must be null or a pointer returned by [`into_raw_error`] that has
/// not been freed yet.
pub unsafe fn free_raw_error(err: *mut c_char) {
    if !err.is_null() {
        // SAFETY: caller guarantees the pointer came from CString::into_raw.
        drop(unsafe { CString::from_raw(err) });
    }
}
