//! Unified error type.

use std::net::SocketAddr;
use std::path::PathBuf;

/// The error type returned by jsongate's fallible operations.
///
/// Application-level outcomes (401, 404, 409, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: opening or persisting the data file, binding to a
/// port or accepting a connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path}: document root must be a JSON object")]
    InvalidDocument { path: PathBuf },

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}
