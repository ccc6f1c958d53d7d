//! Runtime settings read from environment variables.
//!
//! # Environment Variables
//!
//! - `PWD_FILTER_RULES_PATH`: rules file (default `./opfrules.properties`)
//! - `PWD_FILTER_DICT_PATH`: banned-password word list (default `./opfdict.txt`)
//! - `PWD_FILTER_LISTEN`: loopback listen address (default `127.0.0.1:5995`)
//! - `PWD_FILTER_MAX_CONNECTIONS`: concurrent connection ceiling (default 256)
//! - `PWD_FILTER_IO_TIMEOUT_SECS`: per-read/write deadline (default 10)

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const RULES_PATH_ENV: &str = "PWD_FILTER_RULES_PATH";
pub const DICT_PATH_ENV: &str = "PWD_FILTER_DICT_PATH";
pub const LISTEN_ENV: &str = "PWD_FILTER_LISTEN";
pub const MAX_CONNECTIONS_ENV: &str = "PWD_FILTER_MAX_CONNECTIONS";
pub const IO_TIMEOUT_ENV: &str = "PWD_FILTER_IO_TIMEOUT_SECS";

pub const DEFAULT_PORT: u16 = 5995;
pub const ACCEPT_BACKLOG: u32 = 64;
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Returns the rules file path.
///
/// Priority:
/// 1. Environment variable `PWD_FILTER_RULES_PATH`
/// 2. Default path `./opfrules.properties`
pub fn get_rules_path() -> PathBuf {
    std::env::var(RULES_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./opfrules.properties"))
}

/// Returns the dictionary file path.
///
/// Priority:
/// 1. Environment variable `PWD_FILTER_DICT_PATH`
/// 2. Default path `./opfdict.txt`
pub fn get_dictionary_path() -> PathBuf {
    std::env::var(DICT_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./opfdict.txt"))
}

/// Request server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Must be a loopback address.
    pub listen: SocketAddr,
    pub backlog: u32,
    /// Connections served at once; further clients wait in the backlog.
    pub max_connections: usize,
    /// Deadline for each line read and for the response write.
    pub io_timeout: Duration,
    pub max_line_length: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            backlog: ACCEPT_BACKLOG,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            io_timeout: DEFAULT_IO_TIMEOUT,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ServerSettings {
    /// Builds settings from the environment. Unparsable values are logged
    /// and replaced by their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen: env_or(LISTEN_ENV, defaults.listen),
            max_connections: env_or(MAX_CONNECTIONS_ENV, defaults.max_connections).max(1),
            io_timeout: Duration::from_secs(
                env_or(IO_TIMEOUT_ENV, defaults.io_timeout.as_secs()).max(1),
            ),
            ..defaults
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value {:?} for {}, using default {}", raw, key, default);
            default
        }),
        Err(_) => default,
    }
}
