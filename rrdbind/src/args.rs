//! Argument marshalling for librrd entry points.
//!
//! librrd takes most of its input as an `argc`/`argv` pair of C strings
//! (`DS:load:GAUGE:120:U:U`, `1700000060:0.5`, `--step`, ...). [`Args`]
//! owns such a vector. [`join`] and [`ToArg`] build the colon-separated
//! fields that go into it.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, RrdError};

/// Marshals a single string into a C string.
///
/// # Errors
///
/// Returns [`RrdError::InteriorNul`] if `value` contains a NUL byte.
pub fn c_string(value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| RrdError::InteriorNul {
        value: value.to_string(),
    })
}

/// Owned argument vector for an `argc`/`argv` entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    items: Vec<CString>,
}

impl Args {
    /// Creates an empty argument vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marshals every item of `items`.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::InteriorNul`] for the first item containing a NUL
    /// byte.
    pub fn from_strs<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items = items
            .into_iter()
            .map(|s| c_string(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }

    /// Appends one argument.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::InteriorNul`] if `value` contains a NUL byte.
    pub fn push(&mut self, value: &str) -> Result<()> {
        self.items.push(c_string(value)?);
        Ok(())
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the arguments.
    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.items.iter().map(CString::as_c_str)
    }

    /// Lossy UTF-8 view of the arguments, for logging and tests.
    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|s| s.to_string_lossy().into_owned()).collect()
    }

    /// `argc` for the native call.
    #[allow(clippy::cast_possible_truncation)] // argument vectors are nowhere near c_int::MAX
    pub fn argc(&self) -> c_int {
        self.items.len() as c_int
    }

    /// Builds a fresh `const char *` pointer vector.
    ///
    /// A new vector is built for every call because librrd's option parser
    /// may permute the pointer array it is given.
    pub fn argv(&self) -> Vec<*const c_char> {
        self.items.iter().map(|s| s.as_ptr()).collect()
    }

    /// Builds a fresh `char *` pointer vector for entry points declared
    /// without `const`. The strings themselves are never written to.
    pub fn argv_mut(&self) -> Vec<*mut c_char> {
        self.items.iter().map(|s| s.as_ptr().cast_mut()).collect()
    }
}

/// A value that can be formatted as one colon-separated rrdtool field.
pub trait ToArg {
    /// Formats `self` as an rrdtool argument field.
    fn to_arg(&self) -> String;
}

impl ToArg for str {
    fn to_arg(&self) -> String {
        self.to_string()
    }
}

impl ToArg for &str {
    fn to_arg(&self) -> String {
        (*self).to_string()
    }
}

impl ToArg for String {
    fn to_arg(&self) -> String {
        self.clone()
    }
}

macro_rules! int_to_arg {
    ($($t:ty),*) => {
        $(impl ToArg for $t {
            fn to_arg(&self) -> String {
                self.to_string()
            }
        })*
    };
}

int_to_arg!(i32, i64, u32, u64, usize);

/// Unknown values (`NaN`) are written as `U`.
impl ToArg for f64 {
    fn to_arg(&self) -> String {
        if self.is_nan() {
            "U".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Times are written as unix seconds.
impl ToArg for SystemTime {
    fn to_arg(&self) -> String {
        unix_seconds(*self).to_string()
    }
}

/// Converts a `SystemTime` to signed unix seconds.
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_secs()).map_or(i64::MIN, |s| -s),
    }
}

/// Joins fields with `:`, the rrdtool field separator.
///
/// ```
/// use rrdbind::args::join;
///
/// assert_eq!(join(&[&1_700_000_060_i64, &0.5, &f64::NAN]), "1700000060:0.5:U");
/// ```
pub fn join(fields: &[&dyn ToArg]) -> String {
    fields
        .iter()
        .map(|f| f.to_arg())
        .collect::<Vec<_>>()
        .join(":")
}

/// Formats a float in exponent notation with ten fractional digits, the
/// form used for graph limits and bases.
pub fn format_float(value: f64) -> String {
    format!("{value:.10e}")
}
