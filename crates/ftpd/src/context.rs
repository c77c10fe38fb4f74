//! Server-wide state shared by every session (spec §3 "Server state").

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::fs::Filesystem;

/// Default transfer buffer size: 4 MiB (spec §3).
pub const DEFAULT_FILE_BUF_SIZE: usize = 4 * 1024 * 1024;

/// Process-wide state handed to every session: the filesystem backend, the
/// address advertised in PASV replies, and the adjustable transfer buffer
/// size.
pub struct ServerContext<F: Filesystem> {
    pub fs: F,
    /// IPv4 address announced in PASV replies, stored in the order it was
    /// supplied (spec §9, Open Question 2).
    pub advertised_addr: [u8; 4],
    file_buf_size: AtomicUsize,
}

impl<F: Filesystem> ServerContext<F> {
    pub fn new(fs: F, advertised_addr: [u8; 4]) -> Self {
        ServerContext {
            fs,
            advertised_addr,
            file_buf_size: AtomicUsize::new(DEFAULT_FILE_BUF_SIZE),
        }
    }

    pub fn file_buf_size(&self) -> usize {
        self.file_buf_size.load(Ordering::Relaxed)
    }

    /// Adjustable before or during operation (spec §3).
    pub fn set_file_buf_size(&self, size: usize) {
        self.file_buf_size.store(size, Ordering::Relaxed);
    }
}
