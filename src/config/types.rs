// Configuration types module
// Defines all configuration-related data structures

use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main configuration structure, validated once at startup and never mutated
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server identity, built from command-line flags
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Canonical absolute path of the shared directory
    pub root_directory: PathBuf,
    /// Host or address as given on the command line
    pub bind_address: String,
    pub port: u16,
    pub scheme: Scheme,
    /// `bind_address:port` after name resolution
    pub socket_addr: SocketAddr,
}

/// Scheme advertised in the listening URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational settings layered from defaults, an optional file and the environment
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Minimum severity written by the logger
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Tokio worker threads; CPU count when unset
    #[serde(default)]
    pub workers: Option<usize>,
    pub keep_alive: bool,
    /// Seconds allowed for a client to send request headers
    pub header_read_timeout: u64,
    /// Cap on simultaneously open connections
    #[serde(default)]
    pub max_connections: Option<usize>,
    /// Listen backlog
    pub backlog: i32,
}
