//! The "Syscall Abstractions" narrow interface (spec §1, §6).
//!
//! The protocol engine never touches a real file or directory directly —
//! every filesystem side effect goes through this trait. This mirrors how
//! the teacher library never touches a real inode either: `rs9p::srv`
//! defines `Filesystem` and leaves a concrete implementation (`unpfs`) to
//! a separate crate. Here, `crates/ftpd-fs` plays the role `unpfs` plays
//! there.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite};

/// The type of a directory entry, used to pick the listing type character
/// and the execute-slot rendering (spec §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Other,
}

/// Metadata about one filesystem entry, enough to render a LIST line or
/// answer SIZE/CWD validation. Always `lstat`-like: never follows a
/// trailing symlink, so a symlink reports as `Symlink`, not its target's
/// kind.
#[derive(Clone, Debug)]
pub struct Metadata {
    pub kind: EntryKind,
    /// Low 9 permission bits (rwxrwxrwx), as in `st_mode & 0o777`.
    pub mode: u32,
    pub len: u64,
    pub ctime: DateTime<Utc>,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// One entry returned from a directory listing.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub metadata: Metadata,
}

/// Syscall façade consumed by the protocol engine. Paths are always
/// absolute, normalized strings produced by [`crate::path`] — this trait
/// never sees a relative path or a `..` component.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Open file handle type; must support read, write and seek since a
    /// single type backs RETR (read+seek for REST), STOR/APPE (write).
    type File: AsyncRead + AsyncWrite + AsyncSeek + Unpin + Send;

    /// `lstat`-equivalent: metadata without following a trailing symlink.
    async fn metadata(&self, path: &str) -> io::Result<Metadata>;

    /// List a directory's immediate children with their metadata.
    async fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    /// Read a symlink's target. Returns `None` for an empty target or a
    /// non-symlink path, matching the spec's "non-empty path" condition
    /// for whether LIST appends ` -> target`.
    async fn read_link(&self, path: &str) -> io::Result<Option<String>>;

    /// Open a file for reading (RETR).
    async fn open_read(&self, path: &str) -> io::Result<Self::File>;

    /// Open a file for writing (STOR/APPE). `append` selects append-mode
    /// (REST/APPE resume) versus create+truncate.
    async fn open_write(&self, path: &str, append: bool) -> io::Result<Self::File>;

    async fn create_dir(&self, path: &str) -> io::Result<()>;
    async fn remove_dir(&self, path: &str) -> io::Result<()>;
    async fn remove_file(&self, path: &str) -> io::Result<()>;
    async fn rename(&self, from: &str, to: &str) -> io::Result<()>;
}
