//! Argument builders for create, update, graph and xport.
//!
//! Each builder collects rrdtool definitions in their textual form and runs
//! them through a [`Client`]. They are plain values: nothing is sent to the
//! library until `create`, `update`, `graph` or `xport` is called.

use std::fs::OpenOptions;

use crate::args::{ToArg, format_float, join};
use crate::client::Client;
use crate::error::{Result, RrdError};
use crate::info::GraphInfo;
use crate::library::Library;
use crate::matrix::XportResult;

/// Builds a new database.
///
/// ```
/// use rrdbind::Creator;
///
/// let mut c = Creator::new("load.rrd", 1_700_000_000, 60);
/// c.ds("load", "GAUGE", &[&120, &"U", &"U"])
///     .rra("AVERAGE", &[&0.5, &1, &1440]);
/// assert_eq!(c.args(), &["DS:load:GAUGE:120:U:U", "RRA:AVERAGE:0.5:1:1440"]);
/// ```
#[derive(Debug, Clone)]
pub struct Creator {
    filename: String,
    start: i64,
    step: u64,
    args: Vec<String>,
}

impl Creator {
    /// Starts a definition. Data timed at or before `start` (unix seconds)
    /// is rejected; `step` is the base interval in seconds.
    pub fn new(filename: impl Into<String>, start: i64, step: u64) -> Self {
        Self {
            filename: filename.into(),
            start,
            step,
            args: Vec::new(),
        }
    }

    /// Adds `DS:name:kind:fields...`.
    pub fn ds(&mut self, name: &str, kind: &str, fields: &[&dyn ToArg]) -> &mut Self {
        self.args.push(format!("DS:{name}:{kind}:{}", join(fields)));
        self
    }

    /// Adds `RRA:cf:fields...`.
    pub fn rra(&mut self, cf: &str, fields: &[&dyn ToArg]) -> &mut Self {
        self.args.push(format!("RRA:{cf}:{}", join(fields)));
        self
    }

    /// Adds a definition already in `DS:...` or `RRA:...` form.
    pub fn definition(&mut self, definition: impl Into<String>) -> &mut Self {
        self.args.push(definition.into());
        self
    }

    /// Definitions collected so far.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Creates the file.
    ///
    /// Without `overwrite` the file is first reserved exclusively, so an
    /// existing file is reported as [`RrdError::FileExists`] and left
    /// untouched. A reservation is removed again if the library then fails.
    ///
    /// # Errors
    ///
    /// Returns [`RrdError::FileExists`] or the library's error.
    pub fn create<L: Library>(&self, client: &Client<L>, overwrite: bool) -> Result<()> {
        if !overwrite {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.filename)
                .map_err(|source| RrdError::FileExists {
                    path: self.filename.clone(),
                    source,
                })?;
        }

        let result = client.create(&self.filename, self.step, self.start, &self.args);
        if result.is_err() && !overwrite {
            remove_reserved(&self.filename);
        }
        result
    }
}

/// Removes a file reserved by [`Creator::create`], logging when it stays.
fn remove_reserved(path: &str) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path, error = %e, "could not remove reserved database file");
            false
        }
    }
}

/// Feeds values into one database, optionally buffering them.
#[derive(Debug, Clone)]
pub struct Updater {
    filename: String,
    template: Option<String>,
    cache: Vec<String>,
}

impl Updater {
    /// Creates an updater for `filename`.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            template: None,
            cache: Vec::new(),
        }
    }

    /// Names the data sources the value fields refer to, in order.
    pub fn template(&mut self, ds_names: &[&str]) -> &mut Self {
        self.template = Some(ds_names.join(":"));
        self
    }

    /// Buffers one update line for a later [`Updater::update`] call.
    pub fn cache(&mut self, fields: &[&dyn ToArg]) -> &mut Self {
        self.cache.push(join(fields));
        self
    }

    /// Buffered update lines.
    pub fn cached(&self) -> &[String] {
        &self.cache
    }

    /// Sends `fields` as one update if given, otherwise every buffered line
    /// in a single call. The buffer is emptied even if the call fails.
    /// Nothing to send is not an error.
    ///
    /// # Errors
    ///
    /// Returns the library's or daemon's error.
    pub fn update<L: Library>(&mut self, client: &Client<L>, fields: &[&dyn ToArg]) -> Result<()> {
        match self.pending(fields) {
            Some(lines) => client.update(&self.filename, self.template.as_deref(), &lines),
            None => Ok(()),
        }
    }

    /// Like [`Updater::update`] but always writes the local file.
    ///
    /// # Errors
    ///
    /// Returns the library's error.
    pub fn update_local<L: Library>(
        &mut self,
        client: &Client<L>,
        fields: &[&dyn ToArg],
    ) -> Result<()> {
        match self.pending(fields) {
            Some(lines) => client.update_local(&self.filename, self.template.as_deref(), &lines),
            None => Ok(()),
        }
    }

    fn pending(&mut self, fields: &[&dyn ToArg]) -> Option<Vec<String>> {
        if !fields.is_empty() {
            Some(vec![join(fields)])
        } else if !self.cache.is_empty() {
            Some(std::mem::take(&mut self.cache))
        } else {
            None
        }
    }
}

/// Renders graphs through `graphv`.
#[derive(Debug, Clone, Default)]
pub struct Grapher {
    options: Vec<String>,
    daemon: Option<String>,
    items: Vec<String>,
}

impl Grapher {
    /// Creates an empty graph definition.
    pub fn new() -> Self {
        Self::default()
    }

    fn option(&mut self, flag: &str, value: impl Into<String>) -> &mut Self {
        self.options.push(flag.to_string());
        self.options.push(value.into());
        self
    }

    fn flag(&mut self, flag: &str) -> &mut Self {
        self.options.push(flag.to_string());
        self
    }

    /// `-t`
    pub fn title(&mut self, title: &str) -> &mut Self {
        self.option("-t", title)
    }

    /// `-v`
    pub fn vertical_label(&mut self, label: &str) -> &mut Self {
        self.option("-v", label)
    }

    /// `-w` and `-h`: size of the plot area in pixels.
    pub fn size(&mut self, width: u32, height: u32) -> &mut Self {
        self.option("-w", width.to_string())
            .option("-h", height.to_string())
    }

    /// `-u`
    pub fn upper_limit(&mut self, limit: f64) -> &mut Self {
        self.option("-u", format_float(limit))
    }

    /// `-l`
    pub fn lower_limit(&mut self, limit: f64) -> &mut Self {
        self.option("-l", format_float(limit))
    }

    /// `-r`: do not expand the limits to fit the data.
    pub fn rigid(&mut self) -> &mut Self {
        self.flag("-r")
    }

    /// `-A`
    pub fn alt_autoscale(&mut self) -> &mut Self {
        self.flag("-A")
    }

    /// `-o`
    pub fn logarithmic(&mut self) -> &mut Self {
        self.flag("-o")
    }

    /// `-E`
    pub fn slope_mode(&mut self) -> &mut Self {
        self.flag("-E")
    }

    /// `-g`
    pub fn no_legend(&mut self) -> &mut Self {
        self.flag("-g")
    }

    /// `-X`
    pub fn units_exponent(&mut self, exponent: i32) -> &mut Self {
        self.option("-X", exponent.to_string())
    }

    /// `-b`: 1000 or 1024.
    pub fn base(&mut self, base: f64) -> &mut Self {
        self.option("-b", format_float(base))
    }

    /// `-a`: `PNG`, `SVG`, `PDF`, ...
    pub fn image_format(&mut self, format: &str) -> &mut Self {
        self.option("-a", format)
    }

    /// `-W`
    pub fn watermark(&mut self, text: &str) -> &mut Self {
        self.option("-W", text)
    }

    /// `-c TAG#rrggbb[aa]`
    pub fn color(&mut self, tag: &str, color: &str) -> &mut Self {
        self.option("-c", format!("{tag}#{color}"))
    }

    /// `--daemon`. Defaults to the client's daemon.
    pub fn daemon(&mut self, address: &str) -> &mut Self {
        self.daemon = Some(address.to_string());
        self
    }

    /// `DEF:vname=file:ds:cf[:options]`
    pub fn def(&mut self, vname: &str, file: &str, ds: &str, cf: &str, options: &[&str]) -> &mut Self {
        self.items.push(with_options(format!("DEF:{vname}={file}:{ds}:{cf}"), options));
        self
    }

    /// `CDEF:vname=rpn`
    pub fn cdef(&mut self, vname: &str, rpn: &str) -> &mut Self {
        self.items.push(format!("CDEF:{vname}={rpn}"));
        self
    }

    /// `VDEF:vname=rpn`
    pub fn vdef(&mut self, vname: &str, rpn: &str) -> &mut Self {
        self.items.push(format!("VDEF:{vname}={rpn}"));
        self
    }

    /// `LINEwidth:vname#color[:options]`
    pub fn line(&mut self, width: f64, vname: &str, color: &str, options: &[&str]) -> &mut Self {
        self.items.push(with_options(format!("LINE{width}:{vname}#{color}"), options));
        self
    }

    /// `AREA:vname#color[:options]`
    pub fn area(&mut self, vname: &str, color: &str, options: &[&str]) -> &mut Self {
        self.items.push(with_options(format!("AREA:{vname}#{color}"), options));
        self
    }

    /// `PRINT:vname:format`; results come back in [`GraphInfo::print`].
    pub fn print(&mut self, vname: &str, format: &str) -> &mut Self {
        self.items.push(format!("PRINT:{vname}:{format}"));
        self
    }

    /// `GPRINT:vname:format`
    pub fn gprint(&mut self, vname: &str, format: &str) -> &mut Self {
        self.items.push(format!("GPRINT:{vname}:{format}"));
        self
    }

    /// `COMMENT:text`
    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.items.push(format!("COMMENT:{text}"));
        self
    }

    /// Any graph item, as written on the rrdtool command line.
    pub fn item(&mut self, item: impl Into<String>) -> &mut Self {
        self.items.push(item.into());
        self
    }

    /// Full `graphv` argument vector.
    pub fn args(&self, filename: &str, start: i64, end: i64, daemon: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "graphv".to_string(),
            filename.to_string(),
            "-s".to_string(),
            start.to_string(),
            "-e".to_string(),
            end.to_string(),
        ];
        args.extend(self.options.iter().cloned());
        if let Some(daemon) = self.daemon.as_deref().or(daemon) {
            args.push("--daemon".to_string());
            args.push(daemon.to_string());
        }
        args.extend(self.items.iter().cloned());
        args
    }

    /// Renders into memory, returning the summary and the image bytes.
    ///
    /// # Errors
    ///
    /// Returns the library's error.
    pub fn graph<L: Library>(
        &self,
        client: &Client<L>,
        start: i64,
        end: i64,
    ) -> Result<(GraphInfo, Vec<u8>)> {
        let info = client.graph(&self.args("-", start, end, client.daemon()))?;
        Ok(GraphInfo::from_info(&info))
    }

    /// Renders into `filename`.
    ///
    /// # Errors
    ///
    /// Returns the library's error.
    pub fn save_graph<L: Library>(
        &self,
        client: &Client<L>,
        filename: &str,
        start: i64,
        end: i64,
    ) -> Result<GraphInfo> {
        let info = client.graph(&self.args(filename, start, end, client.daemon()))?;
        Ok(GraphInfo::from_info(&info).0)
    }
}

/// Exports consolidated series through `xport`.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    max_rows: Option<u32>,
    daemon: Option<String>,
    items: Vec<String>,
}

impl Exporter {
    /// Creates an empty export definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// `-m`: upper bound on returned rows.
    pub fn max_rows(&mut self, rows: u32) -> &mut Self {
        self.max_rows = Some(rows);
        self
    }

    /// `--daemon`. Defaults to the client's daemon.
    pub fn daemon(&mut self, address: &str) -> &mut Self {
        self.daemon = Some(address.to_string());
        self
    }

    /// `DEF:vname=file:ds:cf[:options]`
    pub fn def(&mut self, vname: &str, file: &str, ds: &str, cf: &str, options: &[&str]) -> &mut Self {
        self.items.push(with_options(format!("DEF:{vname}={file}:{ds}:{cf}"), options));
        self
    }

    /// `CDEF:vname=rpn`
    pub fn cdef(&mut self, vname: &str, rpn: &str) -> &mut Self {
        self.items.push(format!("CDEF:{vname}={rpn}"));
        self
    }

    /// `XPORT:vname[:legend]`
    pub fn xport_def(&mut self, vname: &str, legend: &str) -> &mut Self {
        if legend.is_empty() {
            self.items.push(format!("XPORT:{vname}"));
        } else {
            self.items.push(format!("XPORT:{vname}:{legend}"));
        }
        self
    }

    /// Any `DEF`, `CDEF` or `XPORT` item, as written on the rrdtool
    /// command line.
    pub fn item(&mut self, item: impl Into<String>) -> &mut Self {
        self.items.push(item.into());
        self
    }

    /// Full `xport` argument vector.
    pub fn args(&self, start: i64, end: i64, step: u64, daemon: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "xport".to_string(),
            "-s".to_string(),
            start.to_string(),
            "-e".to_string(),
            end.to_string(),
            "--step".to_string(),
            step.to_string(),
        ];
        if let Some(rows) = self.max_rows {
            args.push("-m".to_string());
            args.push(rows.to_string());
        }
        if let Some(daemon) = self.daemon.as_deref().or(daemon) {
            args.push("--daemon".to_string());
            args.push(daemon.to_string());
        }
        args.extend(self.items.iter().cloned());
        args
    }

    /// Runs the export for `(start, end]` at `step` seconds.
    ///
    /// # Errors
    ///
    /// Returns the library's error.
    pub fn xport<L: Library>(
        &self,
        client: &Client<L>,
        start: i64,
        end: i64,
        step: u64,
    ) -> Result<XportResult> {
        client.xport(&self.args(start, end, step, client.daemon()))
    }
}

fn with_options(item: String, options: &[&str]) -> String {
    if options.is_empty() {
        item
    } else {
        format!("{item}:{}", options.join(":"))
    }
}
