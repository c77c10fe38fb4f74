//! Server Loop & Session Registry (spec §4.7), Lifecycle (spec §4.8).
//!
//! Grounded on `rs9p::srv::srv_async_unix`'s accept-loop shape: a
//! `tokio::select!` between "a new connection arrived" and "shutdown was
//! requested", generalized from that function's single in-process
//! `AtomicBool` into an explicit registry of running sessions so shutdown
//! can wait for every in-flight transfer to actually finish, not merely
//! stop accepting new ones.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::StreamExt;
use log::{error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec};

use crate::context::ServerContext;
use crate::dispatch::{self, CustomCommandTable};
use crate::error::{Error, Result};
use crate::fs::Filesystem;
use crate::session::Session;

/// Registry of running sessions plus the listener's shutdown switch.
///
/// One `Server` corresponds to one `init`/`fini` cycle (spec §4.8): `fini`
/// aborts every registered session's task, then joins them all, mirroring
/// `srv_async_unix`'s SIGTERM/SIGINT handler but driven explicitly instead
/// of by a process signal, since a library has no business installing
/// signal handlers on the caller's behalf.
pub struct Server<F: Filesystem + 'static> {
    ctx: Arc<ServerContext<F>>,
    custom: Arc<CustomCommandTable<F>>,
    sessions: Mutex<HashMap<u64, JoinHandle<()>>>,
    next_session_num: AtomicU64,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    /// Lets `init` hand the accept loop an owned `Arc<Self>` without
    /// requiring every caller to juggle `Arc::clone` at the call site.
    self_weak: Weak<Self>,
}

impl<F: Filesystem + 'static> Server<F> {
    pub fn new(ctx: ServerContext<F>, custom: CustomCommandTable<F>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Server {
            ctx: Arc::new(ctx),
            custom: Arc::new(custom),
            sessions: Mutex::new(HashMap::new()),
            next_session_num: AtomicU64::new(0),
            accept_task: Mutex::new(None),
            self_weak: weak.clone(),
        })
    }

    /// Bind `bind_addr` and start accepting connections in the background.
    ///
    /// Returns [`Error::AlreadyInitialized`] if a listener is already
    /// running on this `Server` — `init` is not reentrant, matching the
    /// source's single global `ftps4_server_run` flag.
    ///
    /// Returns the address actually bound, which matters when `bind_addr`
    /// asks for an ephemeral port (`:0`).
    pub async fn init(&self, bind_addr: &str) -> Result<std::net::SocketAddr> {
        let mut slot = self.accept_task.lock().await;
        if slot.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let listener = TcpListener::bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("listening on {local_addr}");

        let server = self
            .self_weak
            .upgrade()
            .expect("server is alive for the duration of this call");
        *slot = Some(tokio::spawn(async move {
            Self::accept_loop(server, listener).await;
        }));

        Ok(local_addr)
    }

    async fn accept_loop(server: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!("accepted connection from {peer}");
                    Self::spawn_session(&server, stream, peer).await;
                }
                Err(e) => {
                    error!("accept failed: {e}");
                    break;
                }
            }
        }
    }

    async fn spawn_session(server: &Arc<Self>, stream: TcpStream, peer: std::net::SocketAddr) {
        // Preserved quirk (spec §9, Open Question 1): the session counter
        // advances by two per accepted connection, not one, so session
        // numbers are never contiguous. `fetch_add(2, ..)` reproduces the
        // observable numbering without literally double-calling an
        // increment function.
        let num = server.next_session_num.fetch_add(2, Ordering::SeqCst);

        let ctx = Arc::clone(&server.ctx);
        let custom = Arc::clone(&server.custom);
        let server_for_task = Arc::clone(server);

        let handle = tokio::spawn(async move {
            let mut ctrl = Framed::new(stream, LinesCodec::new());
            let mut session = Session::new(num, peer);

            if crate::session::reply(&mut ctrl, "220 FTPS4 Server ready.").await.is_err() {
                server_for_task.sessions.lock().await.remove(&num);
                return;
            }

            while let Some(line) = ctrl.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("session {num}: control read error: {e}");
                        break;
                    }
                };

                let mut parts = line.trim_end().splitn(2, ' ');
                let verb = match parts.next() {
                    Some(v) if !v.is_empty() => v,
                    _ => continue,
                };
                let arg = parts.next();

                // Exact match, matching dispatch's own case-sensitive lookup
                // (spec §4.5) — a lowercase "quit" is simply unrecognized,
                // not a quit request.
                let quitting = verb == "QUIT";

                // Historical throttle preserved for compatibility with
                // clients sensitive to back-to-back response pacing
                // (spec §4.6 step 2; source: `sceKernelUsleep(1 * 1000)`).
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;

                if let Err(e) =
                    dispatch::dispatch(&mut session, &ctx, &custom, &mut ctrl, verb, arg).await
                {
                    warn!("session {num}: {e}");
                    break;
                }

                if quitting {
                    break;
                }
            }

            info!("session {num}: closed");
            server_for_task.sessions.lock().await.remove(&num);
        });

        server.sessions.lock().await.insert(num, handle);
    }

    /// Stop accepting new connections, abort every registered session and
    /// wait for them all to unwind.
    ///
    /// Aborting rather than signalling a graceful per-session stop mirrors
    /// the source's use of `sceNetSocketAbort` on every client socket at
    /// shutdown: in-flight transfers are cut, not drained.
    pub async fn fini(&self) -> Result<()> {
        let accept_task = self.accept_task.lock().await.take();
        match accept_task {
            Some(handle) => handle.abort(),
            None => return Err(Error::NotInitialized),
        }

        let handles: Vec<JoinHandle<()>> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().map(|(_, h)| h).collect()
        };

        for handle in handles {
            handle.abort();
            let _ = handle.await;
        }

        info!("server shutdown complete");
        Ok(())
    }

    pub fn context(&self) -> &ServerContext<F> {
        &self.ctx
    }
}
