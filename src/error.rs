//! Crate-level error types.

use std::fmt;

/// Errors produced by the stipple crate.
#[derive(Debug)]
pub enum Error {
    /// Failed to load a Gaussian point-cloud file.
    ModelLoad(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a worker thread.
    ThreadSpawn(std::io::Error),
    /// Work was submitted to a pool that has shut down.
    PoolShutdown,
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoad(msg) => {
                write!(f, "model load error: {msg}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::PoolShutdown => {
                write!(f, "worker pool has shut down")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
