//! CLI for rrdtool databases through rrdbind.
//!
//! Creates, updates, inspects, fetches from and graphs round-robin
//! databases, optionally through an rrdcached instance.

// Without librrd nothing past argument parsing runs.
#![cfg_attr(not(feature = "native"), allow(dead_code))]

mod commands;

use std::time::SystemTime;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// rrdbind: rrdtool databases and rrdcached from the command line.
#[derive(Parser)]
#[command(name = "rrdbind", version, about)]
struct Cli {
    /// rrdcached address (`unix:/path` or `host:port`). Update, info,
    /// fetch and flush go through it when it is reachable.
    #[arg(long, global = true, env = "RRDCACHED_ADDRESS")]
    daemon: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create a database from DS and RRA definitions.
    Create {
        /// Path of the new database.
        file: String,

        /// Base interval in seconds.
        #[arg(long, default_value = "300")]
        step: u64,

        /// Time of the newest data the database rejects (unix seconds,
        /// "now", or relative like "-1h").
        #[arg(long, default_value = "-10s", allow_hyphen_values = true)]
        start: String,

        /// Replace an existing file.
        #[arg(long)]
        overwrite: bool,

        /// `DS:...` and `RRA:...` definitions.
        #[arg(required = true)]
        definitions: Vec<String>,
    },

    /// Feed values into a database.
    Update {
        /// Path of the database.
        file: String,

        /// Colon-separated data source names the values refer to.
        #[arg(long)]
        template: Option<String>,

        /// Write the file directly, ignoring the daemon.
        #[arg(long)]
        local: bool,

        /// `timestamp:value[:value...]` lines; `N` means now.
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Show the header of a database.
    Info {
        /// Path of the database.
        file: String,

        /// Read the file directly, ignoring the daemon.
        #[arg(long)]
        local: bool,

        /// Output format.
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },

    /// Read consolidated data from a database.
    Fetch {
        /// Path of the database.
        file: String,

        /// Consolidation function.
        #[arg(long, default_value = "AVERAGE")]
        cf: String,

        /// Start of the window.
        #[arg(long, default_value = "-1h", allow_hyphen_values = true)]
        start: String,

        /// End of the window.
        #[arg(long, default_value = "now", allow_hyphen_values = true)]
        end: String,

        /// Resolution in seconds; the library picks the nearest archive.
        #[arg(long, default_value = "1")]
        step: u64,

        /// Read the file directly, ignoring the daemon.
        #[arg(long)]
        local: bool,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Ask the daemon to write pending updates for a database.
    Flush {
        /// Path of the database.
        file: String,
    },

    /// Export computed series from DEF, CDEF and XPORT items.
    Xport {
        /// Start of the window.
        #[arg(long, default_value = "-1h", allow_hyphen_values = true)]
        start: String,

        /// End of the window.
        #[arg(long, default_value = "now", allow_hyphen_values = true)]
        end: String,

        /// Resolution in seconds.
        #[arg(long, default_value = "300")]
        step: u64,

        /// Upper bound on returned rows.
        #[arg(long)]
        max_rows: Option<u32>,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        /// `DEF:`, `CDEF:` and `XPORT:` items.
        #[arg(required = true)]
        items: Vec<String>,
    },

    /// Render a graph to a file.
    Graph {
        /// Image file to write.
        output: String,

        /// Start of the window.
        #[arg(long, default_value = "-1d", allow_hyphen_values = true)]
        start: String,

        /// End of the window.
        #[arg(long, default_value = "now", allow_hyphen_values = true)]
        end: String,

        /// Graph title.
        #[arg(long)]
        title: Option<String>,

        /// Plot width in pixels.
        #[arg(long, default_value = "400")]
        width: u32,

        /// Plot height in pixels.
        #[arg(long, default_value = "100")]
        height: u32,

        /// Graph items (`DEF:`, `LINE1:`, `PRINT:`, ...), passed through.
        #[arg(required = true)]
        items: Vec<String>,
    },
}

/// Output format for info, fetch and xport results.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// Pretty-printed JSON.
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(feature = "native")]
fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    commands::run(rrdbind::Native, cli)
}

#[cfg(not(feature = "native"))]
fn execute(_cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    Err("built without librrd support; rebuild with `--features native`".into())
}

/// Parses a time as unix seconds, `now`, or an offset from now such as
/// `-1h`, `-30m` or `+10s`.
fn parse_time(s: &str, now: i64) -> Result<i64, Box<dyn std::error::Error>> {
    let s = s.trim();
    if s == "now" {
        return Ok(now);
    }
    let shifted = if let Some(offset) = s.strip_prefix('-') {
        now.checked_sub(parse_duration(offset)?)
    } else if let Some(offset) = s.strip_prefix('+') {
        now.checked_add(parse_duration(offset)?)
    } else {
        return Ok(s.parse::<i64>()?);
    };
    shifted.ok_or_else(|| format!("time out of range: '{s}'").into())
}

/// Parses a duration string like "1h", "30m", "7d" into seconds.
fn parse_duration(s: &str) -> Result<i64, Box<dyn std::error::Error>> {
    let s = s.trim();
    let unit = s.chars().next_back().ok_or("Empty duration string")?;
    let num_str = s.strip_suffix(unit).unwrap_or_default();

    let scale: i64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        'w' => 604_800,
        _ => return Err(format!("Unknown duration unit: '{unit}'. Use s, m, h, d or w.").into()),
    };
    let num: i64 = num_str.parse()?;

    num.checked_mul(scale)
        .ok_or_else(|| format!("duration out of range: '{s}'").into())
}

/// Current time in unix seconds.
fn now() -> i64 {
    rrdbind::args::unix_seconds(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90s").unwrap(), 90);
        assert_eq!(parse_duration("30m").unwrap(), 1800);
        assert_eq!(parse_duration("1h").unwrap(), 3600);
        assert_eq!(parse_duration("7d").unwrap(), 604_800);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5y").is_err());
        assert!(parse_duration("h").is_err());
    }

    #[test]
    fn test_bad_durations_are_errors() {
        assert!(parse_duration("5é").is_err());
        assert!(parse_duration("é").is_err());
        assert!(parse_duration("9999999999999999w").is_err());
        assert!(parse_duration(&format!("{}s", i64::MAX)).is_ok());
        assert!(parse_time("-5é", NOW).is_err());
        assert!(parse_time(&format!("-{}s", i64::MAX), -10).is_err());
        assert!(parse_time(&format!("+{}s", i64::MAX), NOW).is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("now", NOW).unwrap(), NOW);
        assert_eq!(parse_time("-1h", NOW).unwrap(), NOW - 3600);
        assert_eq!(parse_time("+10s", NOW).unwrap(), NOW + 10);
        assert_eq!(parse_time("1699990000", NOW).unwrap(), 1_699_990_000);
        assert!(parse_time("yesterday", NOW).is_err());
    }

    #[test]
    fn test_cli_parses_global_daemon() {
        let cli = Cli::try_parse_from([
            "rrdbind",
            "fetch",
            "load.rrd",
            "--daemon",
            "unix:/run/rrdcached.sock",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.daemon.as_deref(), Some("unix:/run/rrdcached.sock"));
        assert!(matches!(
            cli.command,
            Commands::Fetch {
                format: OutputFormat::Json,
                step: 1,
                ..
            }
        ));
    }
}
