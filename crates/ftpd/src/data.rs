//! Data Channel (spec §4.3).
//!
//! Opens, uses and tears down the auxiliary transfer socket in either
//! Active (PORT) or Passive (PASV) mode. Grounded on the accept/connect
//! shape of `rs9p::srv::srv_async_tcp` (`tokio::net::{TcpListener,
//! TcpStream}`), generalized to the two-mode duality of
//! `ps4_ftp.cpp`'s `client_open_data_connection`.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataMode {
    None,
    Active,
    Passive,
}

/// Parse a PORT argument `h1,h2,h3,h4,p1,p2` into the peer address.
///
/// Port reconstruction is `p2 + 256*p1` — the opposite byte-significance
/// order from what PASV emits (spec §6, §9); preserved verbatim.
pub fn parse_port_arg(arg: &str) -> Option<SocketAddr> {
    let parts: Vec<&str> = arg.trim().split(',').collect();
    if parts.len() != 6 {
        return None;
    }
    let mut b = [0u8; 6];
    for (slot, part) in b.iter_mut().zip(parts.iter()) {
        *slot = part.trim().parse::<u8>().ok()?;
    }
    let port = b[5] as u16 + 256 * b[4] as u16;
    Some(SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(b[0], b[1], b[2], b[3])),
        port,
    ))
}

/// Auxiliary transfer socket, in whichever mode the last PORT/PASV set.
pub struct DataChannel {
    mode: DataMode,
    active_peer: Option<SocketAddr>,
    active_stream: Option<TcpStream>,
    passive_listener: Option<TcpListener>,
    passive_stream: Option<TcpStream>,
}

impl DataChannel {
    pub fn new() -> Self {
        DataChannel {
            mode: DataMode::None,
            active_peer: None,
            active_stream: None,
            passive_listener: None,
            passive_stream: None,
        }
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    /// PORT: record the peer to connect to once a transfer actually starts.
    pub fn set_active(&mut self, peer: SocketAddr) {
        self.reset_fields();
        self.active_peer = Some(peer);
        self.mode = DataMode::Active;
    }

    /// PASV: bind an ephemeral listening port and return the `227` reply
    /// text (without the leading `227 ...` literal — callers format that).
    ///
    /// `advertised_addr`'s four octets are emitted low-index first, the
    /// same order they were supplied in (spec §9, Open Question 2) — not
    /// reordered to network byte order, since that would change the wire
    /// bytes real clients have been validated against.
    pub async fn set_passive(&mut self, advertised_addr: [u8; 4]) -> io::Result<(u8, u8, u8, u8, u8, u8)> {
        self.reset_fields();
        let listener = TcpListener::bind(("0.0.0.0", 0)).await?;
        let port = listener.local_addr()?.port();
        self.passive_listener = Some(listener);
        self.mode = DataMode::Passive;

        let p1 = (port & 0xFF) as u8;
        let p2 = ((port >> 8) & 0xFF) as u8;
        Ok((
            advertised_addr[0],
            advertised_addr[1],
            advertised_addr[2],
            advertised_addr[3],
            p1,
            p2,
        ))
    }

    /// Open the transfer connection just-in-time, before a data-bearing
    /// command streams bytes: connect out in Active mode, accept once in
    /// Passive mode.
    pub async fn open(&mut self) -> io::Result<()> {
        match self.mode {
            DataMode::Active => {
                let peer = self
                    .active_peer
                    .ok_or_else(|| io::Error::other("active data channel has no peer"))?;
                self.active_stream = Some(TcpStream::connect(peer).await?);
            }
            DataMode::Passive => {
                let listener = self
                    .passive_listener
                    .as_ref()
                    .ok_or_else(|| io::Error::other("passive data channel has no listener"))?;
                let (stream, _) = listener.accept().await?;
                self.passive_stream = Some(stream);
            }
            DataMode::None => {}
        }
        Ok(())
    }

    /// The live transfer socket, once [`open`](Self::open) has succeeded.
    pub fn stream(&mut self) -> Option<&mut TcpStream> {
        match self.mode {
            DataMode::Active => self.active_stream.as_mut(),
            DataMode::Passive => self.passive_stream.as_mut(),
            DataMode::None => None,
        }
    }

    /// Always closes the primary data socket; additionally closes the
    /// accepted passive socket in Passive mode, then resets to `None`.
    pub fn close(&mut self) {
        self.reset_fields();
        self.mode = DataMode::None;
    }

    fn reset_fields(&mut self) {
        self.active_peer = None;
        self.active_stream = None;
        self.passive_listener = None;
        self.passive_stream = None;
    }
}

impl Default for DataChannel {
    fn default() -> Self {
        Self::new()
    }
}
