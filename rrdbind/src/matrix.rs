//! Time-aligned value matrices returned by fetch and xport.
//!
//! Both calls return a window `(start, end, step)`, a list of column names
//! and a row-major block of `f64`. Row `i` holds the interval ending at
//! `start + (i + 1) * step`, and there are `(end - start) / step` rows.
//! Unknown samples are `NaN`.

use serde::Serialize;

/// Requested or returned time window, in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchWindow {
    /// Start of the window (exclusive for the first row).
    pub start: i64,
    /// End of the window (inclusive for the last row).
    pub end: i64,
    /// Resolution in seconds.
    pub step: u64,
}

impl FetchWindow {
    /// Creates a window.
    pub fn new(start: i64, end: i64, step: u64) -> Self {
        Self { start, end, step }
    }

    /// Number of rows the library fills for this window.
    pub fn row_count(&self) -> usize {
        if self.step == 0 || self.end <= self.start {
            return 0;
        }
        let span = self.end.abs_diff(self.start);
        usize::try_from(span / self.step).unwrap_or(usize::MAX)
    }
}

/// Owned copy of a fetch or xport result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeMatrix {
    /// Window as adjusted by the library.
    pub window: FetchWindow,
    /// Column names: data sources for fetch, legends for xport.
    pub columns: Vec<String>,
    /// Number of rows.
    pub row_count: usize,
    values: Vec<f64>,
}

impl TimeMatrix {
    /// Builds a matrix, trimming or padding `values` with `NaN` to exactly
    /// `row_count * columns.len()` entries.
    pub fn new(window: FetchWindow, columns: Vec<String>, mut values: Vec<f64>) -> Self {
        let row_count = window.row_count();
        values.resize(row_count * columns.len(), f64::NAN);
        Self {
            window,
            columns,
            row_count,
            values,
        }
    }

    /// Value of `column` in `row`.
    pub fn value_at(&self, column: usize, row: usize) -> Option<f64> {
        if column >= self.columns.len() || row >= self.row_count {
            return None;
        }
        self.values.get(row * self.columns.len() + column).copied()
    }

    /// Index of the column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Timestamp that closes `row`.
    pub fn timestamp(&self, row: usize) -> i64 {
        let offset = (row as u64 + 1).saturating_mul(self.window.step);
        self.window
            .start
            .saturating_add(i64::try_from(offset).unwrap_or(i64::MAX))
    }

    /// Row whose interval contains `timestamp`.
    pub fn row_at(&self, timestamp: i64) -> Option<usize> {
        if self.window.step == 0 || timestamp <= self.window.start {
            return None;
        }
        let offset = timestamp.abs_diff(self.window.start) - 1;
        let row = usize::try_from(offset / self.window.step).ok()?;
        (row < self.row_count).then_some(row)
    }

    /// Iterates over `(timestamp, row values)`.
    pub fn rows(&self) -> impl Iterator<Item = (i64, &[f64])> {
        let width = self.columns.len().max(1);
        self.values
            .chunks(width)
            .take(self.row_count)
            .enumerate()
            .map(|(i, row)| (self.timestamp(i), row))
    }

    /// All values, row-major.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consumes the matrix, returning its values.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Result of fetching one database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    /// The database that was read.
    pub filename: String,
    /// Consolidation function used.
    pub cf: String,
    /// The data.
    pub data: TimeMatrix,
}

impl FetchResult {
    /// Data source names.
    pub fn ds_names(&self) -> &[String] {
        &self.data.columns
    }

    /// Value of data source `ds` in `row`.
    pub fn value_at(&self, ds: usize, row: usize) -> Option<f64> {
        self.data.value_at(ds, row)
    }

    /// Value of data source `ds` for the interval containing `timestamp`.
    pub fn value_at_time(&self, ds: usize, timestamp: i64) -> Option<f64> {
        self.data.value_at(ds, self.data.row_at(timestamp)?)
    }
}

/// Result of an xport call; columns are the `XPORT` legends.
pub type XportResult = TimeMatrix;
