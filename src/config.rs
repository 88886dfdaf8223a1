//! Server and agent configuration
//!
//! Command-line flags are parsed with clap in the binaries and merged here
//! with environment overrides. The environment wins over the flag value,
//! matching the original flag/env precedence.

use std::env;

use clap::Parser;
use tracing::warn;

const ADDRESS: &str = "ADDRESS";
const STORE_INTERVAL: &str = "STORE_INTERVAL";
const FILE_STORAGE_PATH: &str = "FILE_STORAGE_PATH";
const RESTORE: &str = "RESTORE";
const DATABASE_DSN: &str = "DATABASE_DSN";
const AUDIT_FILE: &str = "AUDIT_FILE";
const AUDIT_URL: &str = "AUDIT_URL";
const REPORT_INTERVAL: &str = "REPORT_INTERVAL";
const POLL_INTERVAL: &str = "POLL_INTERVAL";

/// Command-line flags for the hub server
#[derive(Debug, Clone, Parser)]
pub struct ServerArgs {
    /// Address and port to run the server on
    #[arg(short, long, default_value = ":8080")]
    pub address: String,

    /// Snapshot interval in seconds (0 = write-through, negative = disabled)
    #[arg(short = 'i', long, default_value_t = 30)]
    pub store_interval: i64,

    /// File storage / snapshot path
    #[arg(short = 'f', long)]
    pub file_storage_path: Option<String>,

    /// Restore metrics from the snapshot file on startup
    #[arg(short, long, default_value_t = false)]
    pub restore: bool,

    /// Database DSN (path to the SQLite database file)
    #[arg(short = 'd', long)]
    pub database_dsn: Option<String>,

    /// File to append audit events to
    #[arg(long)]
    pub audit_file: Option<String>,

    /// URL to POST audit events to
    #[arg(long)]
    pub audit_url: Option<String>,
}

/// Resolved server configuration (flags + environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub address: String,
    pub store_interval: i64,
    pub file_storage_path: Option<String>,
    pub restore: bool,
    pub database_dsn: Option<String>,
    pub audit_file: Option<String>,
    pub audit_url: Option<String>,
}

impl Config {
    pub fn from_args(args: ServerArgs) -> Self {
        Self {
            address: env_string(ADDRESS).unwrap_or(args.address),
            store_interval: env_parsed(STORE_INTERVAL).unwrap_or(args.store_interval),
            file_storage_path: env_string(FILE_STORAGE_PATH).or(args.file_storage_path),
            restore: env_parsed(RESTORE).unwrap_or(args.restore),
            database_dsn: env_string(DATABASE_DSN).or(args.database_dsn),
            audit_file: env_string(AUDIT_FILE).or(args.audit_file),
            audit_url: env_string(AUDIT_URL).or(args.audit_url),
        }
    }

    /// Bind address for the listener; a bare `:port` binds all interfaces.
    pub fn bind_address(&self) -> String {
        if self.address.starts_with(':') {
            format!("0.0.0.0{}", self.address)
        } else {
            self.address.clone()
        }
    }
}

/// Command-line flags for the push agent
#[derive(Debug, Clone, Parser)]
pub struct AgentArgs {
    /// Address of the hub server
    #[arg(short, long, default_value = "localhost:8080")]
    pub address: String,

    /// Seconds between pushes to the hub
    #[arg(short, long, default_value_t = 10)]
    pub report_interval: u64,

    /// Seconds between host statistic polls
    #[arg(short, long, default_value_t = 2)]
    pub poll_interval: u64,
}

/// Resolved agent configuration (flags + environment)
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub address: String,
    pub report_interval: u64,
    pub poll_interval: u64,
}

impl AgentConfig {
    pub fn from_args(args: AgentArgs) -> Self {
        Self {
            address: env_string(ADDRESS).unwrap_or(args.address),
            report_interval: env_parsed(REPORT_INTERVAL).unwrap_or(args.report_interval),
            poll_interval: env_parsed(POLL_INTERVAL).unwrap_or(args.poll_interval),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring unparsable {key}={raw}");
            None
        }
    }
}
