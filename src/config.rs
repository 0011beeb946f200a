use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::{AppError, Result};

/// Default printer device node (first USB line printer).
pub const PRINTER_DEVICE: &str = "/dev/usb/lp0";

/// Seconds between polls when the previous iteration succeeded.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Backoff after iterations with transient failures, in seconds.
/// The index advances per consecutive failed iteration and resets on success.
pub const ERROR_BACKOFF_SECS: &[u64] = &[5, 10, 30, 60];

/// Per-request timeout for the contest API.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Path suffix appended to the base location for the REST API.
pub const API_PATH: &str = "api/v4";

pub const USER_AGENT: &str = concat!("balloon-notifier/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Contest REST API (`<location>/api/v4`).
    Api,
    /// Direct queries against a SQLite copy of the contest database
    /// (`<location>` is a `sqlite:` URL). MySQL/MariaDB servers are not supported.
    Database,
}

/// Send out a printed ticket for each new balloon.
#[derive(Debug, Parser)]
#[command(name = "balloons")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Base of the contest system without the `/api` suffix and without a
    /// trailing slash (e.g. https://example.org/domjudge), or a `sqlite:` URL
    /// when `--source database` is used (SQLite only).
    pub location: String,

    /// Where balloon events are read from.
    #[arg(long, env = "BALLOON_SOURCE", value_enum, default_value = "api")]
    pub source: SourceKind,

    /// Printer device file; `-` prints to stdout.
    #[arg(long, env = "PRINTER_DEVICE", default_value = PRINTER_DEVICE)]
    pub printer: String,

    /// Seconds to wait between polls.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,

    /// Keep handing out balloons for submissions after the scoreboard freeze
    /// (database source only; the API applies its own setting).
    #[arg(long, env = "SHOW_BALLOONS_POSTFREEZE")]
    pub show_postfreeze: bool,

    /// API user; falls back to the netrc file when unset.
    #[arg(long, env = "BALLOON_API_USER")]
    pub api_user: Option<String>,

    /// API password.
    #[arg(long, env = "BALLOON_API_PASSWORD", hide_env_values = true)]
    pub api_password: Option<String>,

    /// Netrc file holding API credentials (default: ~/.netrc).
    #[arg(long, env = "NETRC")]
    pub netrc: Option<PathBuf>,

    /// Log verbosity or filter directive.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Serve /health and /stats/latency on this port.
    #[arg(long, env = "STATUS_PORT")]
    pub status_port: Option<u16>,
}

/// Where printed tickets go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterTarget {
    Device(PathBuf),
    Stdout,
}

impl std::fmt::Display for PrinterTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrinterTarget::Device(path) => write!(f, "{}", path.display()),
            PrinterTarget::Stdout => f.write_str("stdout"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceKind,
    /// Base URL of the REST API including the `/api/v4` suffix (API source).
    pub api_url: String,
    /// Database URL (database source).
    pub database_url: String,
    pub printer: PrinterTarget,
    pub poll_interval: Duration,
    pub show_postfreeze: bool,
    pub credentials: Credentials,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub status_port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
    pub netrc: Option<PathBuf>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let location = cli.location.trim().trim_end_matches('/').to_string();
        if location.is_empty() {
            return Err(AppError::Config("LOCATION must not be empty".to_string()));
        }
        if cli.poll_interval_secs == 0 {
            return Err(AppError::Config(
                "POLL_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }
        if cli.source == SourceKind::Api
            && !(location.starts_with("http://") || location.starts_with("https://"))
        {
            return Err(AppError::Config(format!(
                "API location must be an http(s) URL, got {location}"
            )));
        }
        if cli.source == SourceKind::Database && !location.starts_with("sqlite:") {
            return Err(AppError::Config(format!(
                "database source supports SQLite only (sqlite: URL), got {location}"
            )));
        }
        if cli.api_password.is_some() && cli.api_user.is_none() {
            return Err(AppError::Config(
                "BALLOON_API_PASSWORD requires BALLOON_API_USER".to_string(),
            ));
        }

        let printer = match cli.printer.trim() {
            "" => return Err(AppError::Config("PRINTER_DEVICE must not be empty".to_string())),
            "-" => PrinterTarget::Stdout,
            path => PrinterTarget::Device(PathBuf::from(path)),
        };

        let netrc = cli.netrc.or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".netrc"))
        });

        Ok(Self {
            source: cli.source,
            api_url: format!("{location}/{API_PATH}"),
            database_url: location,
            printer,
            poll_interval: Duration::from_secs(cli.poll_interval_secs),
            show_postfreeze: cli.show_postfreeze,
            credentials: Credentials {
                user: cli.api_user,
                password: cli.api_password,
                netrc,
            },
            log_level: cli.log_level,
            log_file: cli.log_file,
            status_port: cli.status_port,
        })
    }
}
