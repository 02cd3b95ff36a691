//! In-memory stand-in for librrd used by unit tests.
//!
//! Keeps the parts of librrd's behaviour the shim depends on: a
//! thread-local error buffer that calls set but never clear, messages
//! shaped like the real ones, and a daemon client whose connection state
//! is queried separately from the connect attempt.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ffi::CStr;

use crate::args::Args;
use crate::capture::ErrorState;
use crate::dispatch::DaemonLink;
use crate::info::{InfoEntry, InfoValue};
use crate::library::{Library, UpdateFlags};
use crate::matrix::{FetchWindow, TimeMatrix};

thread_local! {
    static ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// A database held in memory.
#[derive(Debug, Default)]
struct FakeRrd {
    step: u64,
    last_update: i64,
    ds: Vec<String>,
    samples: BTreeMap<i64, Vec<f64>>,
}

/// Recording fake of the native library.
#[derive(Debug, Default)]
pub(crate) struct FakeLibrary {
    files: RefCell<HashMap<String, FakeRrd>>,
    daemons: Vec<String>,
    dropping: Vec<String>,
    calls: RefCell<Vec<&'static str>>,
}

fn lossy(s: &CStr) -> String {
    s.to_string_lossy().into_owned()
}

impl FakeLibrary {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a daemon address that accepts connections.
    pub(crate) fn with_daemon(mut self, address: &str) -> Self {
        self.daemons.push(address.to_string());
        self
    }

    /// Adds a daemon that passes the connectivity check but drops every
    /// request made afterwards.
    pub(crate) fn with_dropping_daemon(mut self, address: &str) -> Self {
        self.daemons.push(address.to_string());
        self.dropping.push(address.to_string());
        self
    }

    /// Entry points called so far, in order.
    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub(crate) fn has_file(&self, filename: &str) -> bool {
        self.files.borrow().contains_key(filename)
    }

    /// Sets the thread-local error like `rrd_set_error`.
    pub(crate) fn set_error(message: &str) {
        ERROR.with_borrow_mut(|e| *e = Some(message.to_string()));
    }

    fn record(&self, call: &'static str) {
        self.calls.borrow_mut().push(call);
    }

    fn fail<T>(message: String, value: T) -> T {
        Self::set_error(&message);
        value
    }

    fn dropped(&self) -> bool {
        !self.dropping.is_empty()
    }

    fn apply_update(
        &self,
        filename: &CStr,
        template: Option<&CStr>,
        flags: UpdateFlags,
        args: &Args,
    ) -> i32 {
        let name = lossy(filename);
        let mut files = self.files.borrow_mut();
        let Some(rrd) = files.get_mut(&name) else {
            return Self::fail(format!("opening '{name}': No such file or directory"), -1);
        };
        if args.is_empty() {
            return Self::fail("Not enough arguments".to_string(), -1);
        }

        let order: Vec<usize> = match template {
            Some(t) => {
                let mut order = Vec::new();
                for ds in lossy(t).split(':') {
                    match rrd.ds.iter().position(|d| d == ds) {
                        Some(i) => order.push(i),
                        None => {
                            return Self::fail(format!("unknown DS name '{ds}'"), -1);
                        }
                    }
                }
                order
            }
            None => (0..rrd.ds.len()).collect(),
        };

        for line in args.to_strings() {
            let mut fields = line.split(':');
            let ts = match fields.next() {
                Some("N") => rrd.last_update + 1,
                Some(t) => match t.parse::<i64>() {
                    Ok(t) => t,
                    Err(_) => return Self::fail(format!("expected timestamp not found in data source from {line}"), -1),
                },
                None => return Self::fail("Not enough arguments".to_string(), -1),
            };
            if ts <= rrd.last_update {
                if flags.contains(UpdateFlags::SKIP_PAST_UPDATES) {
                    continue;
                }
                return Self::fail(
                    format!(
                        "{name}: illegal attempt to update using time {ts} when last update time is {} (minimum one second step)",
                        rrd.last_update
                    ),
                    -1,
                );
            }
            let mut row = vec![f64::NAN; rrd.ds.len()];
            for (slot, field) in order.iter().zip(fields) {
                row[*slot] = if field == "U" {
                    f64::NAN
                } else {
                    match field.parse() {
                        Ok(v) => v,
                        Err(_) => {
                            return Self::fail(format!("converting '{field}' to float: Invalid argument"), -1);
                        }
                    }
                };
            }
            rrd.samples.insert(ts, row);
            rrd.last_update = ts;
        }
        0
    }

    fn info_entries(&self, filename: &CStr) -> Option<Vec<InfoEntry>> {
        let name = lossy(filename);
        let files = self.files.borrow();
        let Some(rrd) = files.get(&name) else {
            return Self::fail(format!("opening '{name}': No such file or directory"), None);
        };
        let mut entries = vec![
            InfoEntry::new("filename", InfoValue::String(name.clone())),
            InfoEntry::new("rrd_version", InfoValue::String("0003".into())),
            InfoEntry::new("step", InfoValue::Count(rrd.step)),
            InfoEntry::new(
                "last_update",
                InfoValue::Count(u64::try_from(rrd.last_update).unwrap_or(0)),
            ),
        ];
        for (i, ds) in rrd.ds.iter().enumerate() {
            entries.push(InfoEntry::new(format!("ds[{ds}].index"), InfoValue::Count(i as u64)));
            entries.push(InfoEntry::new(format!("ds[{ds}].type"), InfoValue::String("GAUGE".into())));
        }
        entries.push(InfoEntry::new("rra[0].cf", InfoValue::String("AVERAGE".into())));
        Some(entries)
    }

    fn fetch_matrix(&self, filename: &CStr, cf: &CStr, window: FetchWindow) -> Option<TimeMatrix> {
        let name = lossy(filename);
        let files = self.files.borrow();
        let Some(rrd) = files.get(&name) else {
            return Self::fail(format!("opening '{name}': No such file or directory"), None);
        };
        if !matches!(cf.to_bytes(), b"AVERAGE" | b"MIN" | b"MAX" | b"LAST") {
            return Self::fail(format!("unknown consolidation function '{}'", lossy(cf)), None);
        }
        Some(Self::slice(rrd, window, |row| row.to_vec(), rrd.ds.clone()))
    }

    fn slice(
        rrd: &FakeRrd,
        window: FetchWindow,
        pick: impl Fn(&[f64]) -> Vec<f64>,
        columns: Vec<String>,
    ) -> TimeMatrix {
        let step = i64::try_from(rrd.step.max(1)).unwrap_or(1);
        let start = window.start.div_euclid(step) * step;
        let end = (window.end + step - 1).div_euclid(step) * step;
        let window = FetchWindow::new(start, end, rrd.step);

        let blank = vec![f64::NAN; rrd.ds.len()];
        let mut values = Vec::new();
        let mut ts = start + step;
        while ts <= end {
            let row = rrd.samples.get(&ts).unwrap_or(&blank);
            values.extend(pick(row));
            ts += step;
        }
        TimeMatrix::new(window, columns, values)
    }

    /// `vname=file:ds:cf` definitions found in `args`.
    fn defs(args: &[String]) -> Vec<(String, String, String)> {
        args.iter()
            .filter_map(|a| a.strip_prefix("DEF:"))
            .filter_map(|def| {
                let (vname, rest) = def.split_once('=')?;
                let mut parts = rest.split(':');
                Some((vname.to_string(), parts.next()?.to_string(), parts.next()?.to_string()))
            })
            .collect()
    }

    fn option(args: &[String], flag: &str) -> Option<i64> {
        let pos = args.iter().position(|a| a == flag)?;
        args.get(pos + 1)?.parse().ok()
    }

    fn missing_def_file(&self, defs: &[(String, String, String)]) -> Option<String> {
        let files = self.files.borrow();
        defs.iter()
            .find(|(_, file, _)| !files.contains_key(file))
            .map(|(_, file, _)| format!("opening '{file}': No such file or directory"))
    }
}

impl ErrorState for FakeLibrary {
    fn clear_error(&self) {
        ERROR.with_borrow_mut(|e| *e = None);
    }

    fn error(&self) -> Option<String> {
        ERROR.with_borrow(Clone::clone)
    }
}

impl DaemonLink for FakeLibrary {
    fn connect(&self, daemon: &CStr) {
        self.record("connect");
        let daemon = lossy(daemon);
        if !self.daemons.contains(&daemon) {
            Self::set_error(&format!(
                "Unable to connect to rrdcached: Connection refused ({daemon})"
            ));
        }
    }

    fn is_connected(&self, daemon: &CStr) -> bool {
        self.record("is_connected");
        self.daemons.contains(&lossy(daemon))
    }
}

impl Library for FakeLibrary {
    fn create(&self, filename: &CStr, step: u64, start: i64, args: &Args) -> i32 {
        self.record("create");
        let name = lossy(filename);
        if name.starts_with("/nonexistent/") {
            return Self::fail(format!("creating '{name}': No such file or directory"), -1);
        }
        let ds: Vec<String> = args
            .to_strings()
            .iter()
            .filter_map(|a| a.strip_prefix("DS:"))
            .filter_map(|d| d.split(':').next().map(str::to_string))
            .collect();
        if ds.is_empty() {
            return Self::fail("you must define at least one Data Source".to_string(), -1);
        }
        self.files.borrow_mut().insert(
            name,
            FakeRrd {
                step,
                last_update: start,
                ds,
                samples: BTreeMap::new(),
            },
        );
        0
    }

    fn update(
        &self,
        filename: &CStr,
        template: Option<&CStr>,
        flags: UpdateFlags,
        args: &Args,
    ) -> i32 {
        self.record("update");
        self.apply_update(filename, template, flags, args)
    }

    fn graph(&self, args: &Args) -> Option<Vec<InfoEntry>> {
        self.record("graph");
        let args = args.to_strings();
        let defs = Self::defs(&args);
        if defs.is_empty() {
            return Self::fail("can't make a graph without contents".to_string(), None);
        }
        if let Some(message) = self.missing_def_file(&defs) {
            return Self::fail(message, None);
        }
        let mut entries = vec![
            InfoEntry::new("image_width", InfoValue::Count(481)),
            InfoEntry::new("image_height", InfoValue::Count(154)),
            InfoEntry::new("value_min", InfoValue::Value(0.0)),
            InfoEntry::new("value_max", InfoValue::Value(1.0)),
        ];
        for (i, print) in args.iter().filter(|a| a.starts_with("PRINT:")).enumerate() {
            entries.push(InfoEntry::new(format!("print[{i}]"), InfoValue::String(print.clone())));
        }
        if args.get(1).is_some_and(|f| f == "-") {
            entries.push(InfoEntry::new("image", InfoValue::Blob(b"\x89PNG".to_vec())));
        }
        Some(entries)
    }

    fn info(&self, filename: &CStr) -> Option<Vec<InfoEntry>> {
        self.record("info");
        self.info_entries(filename)
    }

    fn fetch(&self, filename: &CStr, cf: &CStr, window: FetchWindow) -> Option<TimeMatrix> {
        self.record("fetch");
        self.fetch_matrix(filename, cf, window)
    }

    fn xport(&self, args: &Args) -> Option<TimeMatrix> {
        self.record("xport");
        let args = args.to_strings();
        let defs = Self::defs(&args);
        let exports: Vec<(String, String)> = args
            .iter()
            .filter_map(|a| a.strip_prefix("XPORT:"))
            .map(|x| match x.split_once(':') {
                Some((v, legend)) => (v.to_string(), legend.to_string()),
                None => (x.to_string(), String::new()),
            })
            .collect();
        if exports.is_empty() {
            return Self::fail("can't make an xport without contents".to_string(), None);
        }
        if let Some(message) = self.missing_def_file(&defs) {
            return Self::fail(message, None);
        }

        let mut columns = Vec::new();
        let mut sources = Vec::new();
        for (vname, legend) in exports {
            let Some((_, file, ds)) = defs.iter().find(|(v, _, _)| *v == vname) else {
                return Self::fail(format!("unknown variable '{vname}'"), None);
            };
            columns.push(legend);
            sources.push((file.clone(), ds.clone()));
        }

        let files = self.files.borrow();
        let (first_file, _) = &sources[0];
        let rrd = &files[first_file];
        let window = FetchWindow::new(
            Self::option(&args, "-s").unwrap_or(rrd.last_update - 86_400),
            Self::option(&args, "-e").unwrap_or(rrd.last_update),
            rrd.step,
        );
        let picks: Vec<Option<usize>> = sources
            .iter()
            .map(|(file, ds)| files[file].ds.iter().position(|d| d == ds))
            .collect();
        let matrix = Self::slice(
            rrd,
            window,
            |row| {
                picks
                    .iter()
                    .map(|p| p.and_then(|i| row.get(i).copied()).unwrap_or(f64::NAN))
                    .collect()
            },
            columns,
        );
        Some(matrix)
    }

    fn daemon_update(&self, filename: &CStr, args: &Args) -> i32 {
        self.record("daemon_update");
        if self.dropped() {
            return Self::fail("rrdc_update: connection to daemon lost".to_string(), -1);
        }
        self.apply_update(filename, None, UpdateFlags::NONE, args)
    }

    fn daemon_info(&self, filename: &CStr) -> Option<Vec<InfoEntry>> {
        self.record("daemon_info");
        if self.dropped() {
            return Self::fail("rrdc_info: connection to daemon lost".to_string(), None);
        }
        self.info_entries(filename)
    }

    fn daemon_fetch(&self, filename: &CStr, cf: &CStr, window: FetchWindow) -> Option<TimeMatrix> {
        self.record("daemon_fetch");
        if self.dropped() {
            return Self::fail("rrdc_fetch: connection to daemon lost".to_string(), None);
        }
        self.fetch_matrix(filename, cf, window)
    }

    fn flush_if_daemon(&self, daemon: Option<&CStr>, filename: &CStr) -> i32 {
        self.record("flush");
        if daemon.is_none() {
            return 0;
        }
        if self.dropped() {
            return Self::fail("rrdc_flush: connection to daemon lost".to_string(), -1);
        }
        let name = lossy(filename);
        if !self.has_file(&name) {
            return Self::fail(
                format!("rrdc_flush ({name}) failed: No such file or directory"),
                -1,
            );
        }
        0
    }
}
