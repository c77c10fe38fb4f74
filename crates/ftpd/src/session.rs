//! Client Session (spec §4.6).
//!
//! Per-connection state plus the control-socket line framing. Grounded on
//! `rs9p::srv::dispatch`'s per-connection task shape, generalized from
//! 9P's length-delimited binary framing to FTP's CRLF line framing
//! (`tokio_util::codec::{Framed, LinesCodec}` paired with
//! `futures::SinkExt`, the same pairing `srv.rs` uses with
//! `LengthDelimitedCodec`).

use std::net::SocketAddr;

use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use crate::data::DataChannel;

/// The control socket, framed as CRLF-terminated lines.
pub type Control = Framed<TcpStream, LinesCodec>;

/// Per-connection state (spec §3 "Session state").
pub struct Session {
    /// Assigned at accept time; stable for the session's life, not
    /// guaranteed globally unique across fini/init cycles (spec §9).
    pub num: u64,
    pub peer_addr: SocketAddr,
    /// Always absolute, normalized to `/` or `/a/b` (no trailing slash
    /// except the root) — invariant 4.
    pub cwd: String,
    /// Staging path captured by RNFR, consumed by RNTO — invariant 5.
    pub rename_from: Option<String>,
    /// REST offset for the next RETR, or "append" signal (non-zero) for
    /// the next STOR/APPE. `-1` is APPE's sentinel for append-without-offset.
    pub restore_point: i64,
    pub data: DataChannel,
}

impl Session {
    pub fn new(num: u64, peer_addr: SocketAddr) -> Self {
        Session {
            num,
            peer_addr,
            cwd: "/".to_string(),
            rename_from: None,
            restore_point: 0,
            data: DataChannel::new(),
        }
    }
}

/// Send one CRLF-terminated control reply line.
///
/// `LinesCodec::encode` only appends the trailing `\n`; we append the `\r`
/// ourselves so every reply ends in exactly `\r\n`, matching the FTPS4_EOL
/// macro in the source.
pub async fn reply(ctrl: &mut Control, line: &str) -> std::io::Result<()> {
    ctrl.send(format!("{line}\r"))
        .await
        .map_err(std::io::Error::other)
}
