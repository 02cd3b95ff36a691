//! Element access on native arrays of C strings.
//!
//! librrd hands back data-source names and xport legends as `char **`
//! arrays. Callers on the far side of an FFI boundary often cannot index
//! those directly, so the accessor is exported as-is; Rust code uses
//! [`copy_string_array`] to take owned copies.

use std::ffi::CStr;
use std::os::raw::c_char;

/// Returns `values[index]`.
///
/// # Safety
///
/// `values` must point to an array of at least `index + 1` pointers. No
/// bounds check is made; an out-of-range index is undefined behaviour just
/// like native array indexing.
pub unsafe fn array_element(values: *const *mut c_char, index: usize) -> *mut c_char {
    // SAFETY: caller guarantees index is within the array.
    unsafe { *values.add(index) }
}

/// Copies `len` C strings out of `values` into owned `String`s.
///
/// Null elements become empty strings; invalid UTF-8 is replaced lossily.
///
/// # Safety
///
/// `values` must point to `len` pointers, each null or a valid
/// NUL-terminated string. When `len` is zero `values` may be null.
pub unsafe fn copy_string_array(values: *const *mut c_char, len: usize) -> Vec<String> {
    if values.is_null() {
        return Vec::new();
    }
    (0..len)
        .map(|i| {
            // SAFETY: i < len, guaranteed in bounds by the caller.
            let element = unsafe { array_element(values, i) };
            if element.is_null() {
                String::new()
            } else {
                // SAFETY: non-null elements are NUL-terminated strings.
                unsafe { CStr::from_ptr(element) }
                    .to_string_lossy()
                    .into_owned()
            }
        })
        .collect()
}
