//! Concrete [`Filesystem`] backed by `tokio::fs`, serving a real directory
//! tree rooted at one path on disk.
//!
//! Grounded method-for-method on `unpfs`'s `Filesystem` impl: `rgetattr` on
//! `fs::symlink_metadata`, `rreaddir` on `ReadDirStream`, `rreadlink` on
//! `fs::read_link`, `rmkdir`/`runlinkat`/`rrenameat` on their direct
//! `tokio::fs` counterparts. Where `unpfs` drops to `nix::fcntl::open` for
//! raw POSIX flag control, this implementation has no such requirement —
//! FTP's STOR/APPE only ever need create+truncate or create+append, both
//! expressible directly through `tokio::fs::OpenOptions`.

use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio_stream::{wrappers::ReadDirStream, StreamExt};

use ftpd::fs::{DirEntry, EntryKind, Filesystem, Metadata};

/// Serves `root` (and nothing outside it, via [`Self::full_path`]'s
/// leading-slash stripping) as the FTP namespace's `/`.
#[derive(Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new(root: PathBuf) -> Self {
        LocalFs { root }
    }

    /// Map an FTP-absolute path (always starting with `/`, per
    /// [`ftpd::path`]) onto a real filesystem path under `root`.
    fn full_path(&self, ftp_path: &str) -> PathBuf {
        let relative = ftp_path.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

fn entry_kind(file_type: std::fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_file() {
        EntryKind::Regular
    } else if file_type.is_block_device() {
        EntryKind::BlockDevice
    } else if file_type.is_char_device() {
        EntryKind::CharDevice
    } else if file_type.is_fifo() {
        EntryKind::Fifo
    } else if file_type.is_socket() {
        EntryKind::Socket
    } else {
        EntryKind::Other
    }
}

fn metadata_from(std_meta: &std::fs::Metadata) -> Metadata {
    let ctime = DateTime::<Utc>::from_timestamp(std_meta.ctime(), std_meta.ctime_nsec() as u32)
        .unwrap_or_else(|| DateTime::<Utc>::from(std::time::SystemTime::UNIX_EPOCH));

    Metadata {
        kind: entry_kind(std_meta.file_type()),
        mode: std_meta.permissions().mode() & 0o777,
        len: std_meta.len(),
        ctime,
    }
}

#[async_trait]
impl Filesystem for LocalFs {
    type File = fs::File;

    async fn metadata(&self, path: &str) -> std::io::Result<Metadata> {
        let meta = fs::symlink_metadata(self.full_path(path)).await?;
        Ok(metadata_from(&meta))
    }

    async fn read_dir(&self, path: &str) -> std::io::Result<Vec<DirEntry>> {
        let mut entries = ReadDirStream::new(fs::read_dir(self.full_path(path)).await?);
        let mut out = Vec::new();
        while let Some(entry) = entries.next().await {
            let entry = entry?;
            let meta = entry.metadata().await?;
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                metadata: metadata_from(&meta),
            });
        }
        Ok(out)
    }

    async fn read_link(&self, path: &str) -> std::io::Result<Option<String>> {
        match fs::read_link(self.full_path(path)).await {
            Ok(target) => {
                let target = target.to_string_lossy().into_owned();
                Ok(if target.is_empty() { None } else { Some(target) })
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn open_read(&self, path: &str) -> std::io::Result<Self::File> {
        fs::File::open(self.full_path(path)).await
    }

    async fn open_write(&self, path: &str, append: bool) -> std::io::Result<Self::File> {
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(self.full_path(path))
            .await
    }

    async fn create_dir(&self, path: &str) -> std::io::Result<()> {
        fs::create_dir(self.full_path(path)).await
    }

    async fn remove_dir(&self, path: &str) -> std::io::Result<()> {
        fs::remove_dir(self.full_path(path)).await
    }

    async fn remove_file(&self, path: &str) -> std::io::Result<()> {
        fs::remove_file(self.full_path(path)).await
    }

    async fn rename(&self, from: &str, to: &str) -> std::io::Result<()> {
        fs::rename(self.full_path(from), self.full_path(to)).await
    }
}
