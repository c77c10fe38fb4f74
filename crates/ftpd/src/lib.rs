#![forbid(unsafe_code)]
//! Async FTP server library for Rust, built for the PS4 homebrew FTP
//! daemon's command set.
//!
//! # Overview
//!
//! This crate provides a tokio-based FTP server engine that is generic
//! over a pluggable filesystem backend. It never touches a real inode
//! directly: every read, write, and directory operation goes through the
//! [`fs::Filesystem`] trait, so the same engine can serve a real directory
//! tree, a sandboxed view of one, or an entirely virtual namespace.
//!
//! # Getting Started
//!
//! To stand up a server, you need to:
//!
//! 1. Implement [`fs::Filesystem`] for your backend (or reuse `ftpd-fs`'s
//!    `tokio::fs`-backed implementation as a starting point).
//! 2. Build a [`context::ServerContext`] around it.
//! 3. Optionally register extension verbs in a
//!    [`dispatch::CustomCommandTable`].
//! 4. Call [`server::Server::init`] with a bind address, and
//!    [`server::Server::fini`] to shut down.
//!
//! # Protocol Details
//!
//! The control channel is a CRLF-terminated line protocol (`USER`, `PASS`,
//! `CWD`, `RETR`, ...); data transfer happens on a second, per-session
//! socket opened in either Active (`PORT`) or Passive (`PASV`) mode. See
//! [`data`] for that channel's lifecycle and [`command`] for the full verb
//! set.
//!
//! # Error Handling
//!
//! Filesystem failures encountered while servicing a command are caught at
//! the handler boundary in [`command`] and turned into the matching `5xx`
//! reply line; they never surface as a Rust [`error::Error`]. That type
//! only covers transport failures and lifecycle misuse (`init`/`fini`
//! called out of order, the custom command table overflowing).
//!
//! # Feature Flags
//!
//! This crate uses workspace dependencies and requires `tokio` with
//! `full` features for the async runtime, `async-trait` for the
//! [`fs::Filesystem`] and [`dispatch::CustomCommand`] traits, and `chrono`
//! for listing timestamps.
//!
//! # Safety
//!
//! This crate forbids unsafe code (`#![forbid(unsafe_code)]`) and relies
//! on Rust's type system for memory safety.
pub mod command;
pub mod context;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod fs;
pub mod listing;
pub mod path;
pub mod server;
pub mod session;

pub use crate::context::ServerContext;
pub use crate::dispatch::{CustomCommand, CustomCommandTable};
pub use crate::error::{Error, Result};
pub use crate::fs::Filesystem;
pub use crate::server::Server;
pub use crate::session::Session;
