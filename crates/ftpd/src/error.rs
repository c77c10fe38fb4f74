//! Error type for the FTP server core.
//!
//! Filesystem failures encountered while servicing a command are caught at
//! the handler boundary and turned into the appropriate `5xx` reply line —
//! they never reach here. This type only covers failures that abort a
//! session or the server outright: transport errors and lifecycle misuse.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// `init` was called while the server was already running.
    AlreadyInitialized,
    /// `fini`, or an operation requiring a running server, was called
    /// before `init` or after `fini`.
    NotInitialized,
    /// All 16 custom command slots are occupied.
    CustomCommandTableFull,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "{e}"),
            Error::AlreadyInitialized => write!(f, "server is already initialized"),
            Error::NotInitialized => write!(f, "server is not initialized"),
            Error::CustomCommandTableFull => write!(f, "custom command table is full"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
