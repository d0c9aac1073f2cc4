//! Process configuration.
//!
//! There is no external config source: no flags, no environment variables,
//! no config file. Every value comes from [`Config::default`]. Logging
//! verbosity is the one exception, see [`crate::telemetry`].

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_FILE: &str = "db.json";

#[derive(Clone, Debug)]
pub struct Config {
    /// Listen address. `0.0.0.0:3000`.
    pub addr: SocketAddr,
    /// The JSON document backing the API. `db.json`, relative to the
    /// working directory.
    pub data_file: PathBuf,
    /// Installs the write guard in the default middleware bundle. Off.
    pub read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            read_only: false,
        }
    }
}
