//! End-to-end session tests driving a [`ftpd::Server`] over real loopback
//! sockets, the way `unpfs`'s own integration coverage exercises `srv_async`
//! end to end rather than unit-testing `dispatch` in isolation.

use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ftpd::fs::{DirEntry, EntryKind, Filesystem, Metadata};
use ftpd::{CustomCommandTable, Server, ServerContext};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_stream::{wrappers::ReadDirStream, StreamExt};

/// Minimal `tokio::fs`-backed [`Filesystem`], scoped to a tempdir for the
/// lifetime of one test.
#[derive(Clone)]
struct TempFs {
    root: PathBuf,
}

impl TempFs {
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

fn metadata_from(meta: &std::fs::Metadata) -> Metadata {
    let ctime = DateTime::<Utc>::from_timestamp(meta.ctime(), meta.ctime_nsec() as u32)
        .unwrap_or_else(|| DateTime::<Utc>::from(std::time::SystemTime::UNIX_EPOCH));

    Metadata {
        kind: entry_kind(meta.file_type()),
        mode: meta.permissions().mode() & 0o777,
        len: meta.len(),
        ctime,
    }
}

#[async_trait]
impl Filesystem for TempFs {
    type File = tokio::fs::File;

    async fn metadata(&self, path: &str) -> std::io::Result<Metadata> {
        Ok(metadata_from(&tokio::fs::symlink_metadata(self.full_path(path)).await?))
    }

    async fn read_dir(&self, path: &str) -> std::io::Result<Vec<DirEntry>> {
        let mut entries = ReadDirStream::new(tokio::fs::read_dir(self.full_path(path)).await?);
        let mut out = Vec::new();
        while let Some(entry) = entries.next().await {
            let entry = entry?;
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                metadata: metadata_from(&entry.metadata().await?),
            });
        }
        Ok(out)
    }

    async fn read_link(&self, path: &str) -> std::io::Result<Option<String>> {
        match tokio::fs::read_link(self.full_path(path)).await {
            Ok(t) => Ok(Some(t.to_string_lossy().into_owned())),
            Err(_) => Ok(None),
        }
    }

    async fn open_read(&self, path: &str) -> std::io::Result<Self::File> {
        tokio::fs::File::open(self.full_path(path)).await
    }

    async fn open_write(&self, path: &str, append: bool) -> std::io::Result<Self::File> {
        tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(self.full_path(path))
            .await
    }

    async fn create_dir(&self, path: &str) -> std::io::Result<()> {
        tokio::fs::create_dir(self.full_path(path)).await
    }

    async fn remove_dir(&self, path: &str) -> std::io::Result<()> {
        tokio::fs::remove_dir(self.full_path(path)).await
    }

    async fn remove_file(&self, path: &str) -> std::io::Result<()> {
        tokio::fs::remove_file(self.full_path(path)).await
    }

    async fn rename(&self, from: &str, to: &str) -> std::io::Result<()> {
        tokio::fs::rename(self.full_path(from), self.full_path(to)).await
    }
}

async fn start_server(root: PathBuf) -> (Arc<Server<TempFs>>, std::net::SocketAddr) {
    let fs = TempFs { root };
    let ctx = ServerContext::new(fs, [127, 0, 0, 1]);
    let server = Server::new(ctx, CustomCommandTable::new());
    let addr = server.init("127.0.0.1:0").await.unwrap();
    (server, addr)
}

async fn read_reply(ctrl: &mut BufReader<tokio::net::tcp::OwnedReadHalf>) -> String {
    let mut line = String::new();
    ctrl.read_line(&mut line).await.unwrap();
    line.trim_end().to_string()
}

#[tokio::test]
async fn welcome_and_pwd_report_root() {
    let dir = tempfile::tempdir().unwrap();
    let (server, addr) = start_server(dir.path().to_path_buf()).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    assert!(read_reply(&mut reader).await.starts_with("220"));

    write_half.write_all(b"USER anonymous\r\n").await.unwrap();
    assert!(read_reply(&mut reader).await.starts_with("331"));

    write_half.write_all(b"PASS anonymous\r\n").await.unwrap();
    assert!(read_reply(&mut reader).await.starts_with("230"));

    write_half.write_all(b"PWD\r\n").await.unwrap();
    assert_eq!(read_reply(&mut reader).await, "257 \"/\" is the current directory.");

    server.fini().await.unwrap();
}

#[tokio::test]
async fn passive_retr_streams_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("hello.txt"), b"hello world")
        .await
        .unwrap();
    let (server, addr) = start_server(dir.path().to_path_buf()).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    read_reply(&mut reader).await;

    write_half.write_all(b"PASV\r\n").await.unwrap();
    let pasv_reply = read_reply(&mut reader).await;
    let start = pasv_reply.find('(').unwrap() + 1;
    let end = pasv_reply.find(')').unwrap();
    let fields: Vec<u16> = pasv_reply[start..end]
        .split(',')
        .map(|f| f.parse().unwrap())
        .collect();
    let data_port = fields[4] * 256 + fields[5];
    let data_addr = std::net::SocketAddr::new(addr.ip(), data_port);

    write_half.write_all(b"RETR hello.txt\r\n").await.unwrap();
    assert!(read_reply(&mut reader).await.starts_with("150"));

    let mut data_stream = TcpStream::connect(data_addr).await.unwrap();
    let mut received = Vec::new();
    data_stream.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"hello world");

    assert!(read_reply(&mut reader).await.starts_with("226"));

    server.fini().await.unwrap();
}

#[tokio::test]
async fn active_stor_then_resume_appends_at_offset() {
    let dir = tempfile::tempdir().unwrap();
    let (server, addr) = start_server(dir.path().to_path_buf()).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener_addr = listener.local_addr().unwrap();

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    read_reply(&mut reader).await;

    let ip_octets = match listener_addr.ip() {
        std::net::IpAddr::V4(v4) => v4.octets(),
        _ => panic!("expected IPv4"),
    };
    let port = listener_addr.port();
    let p1 = (port >> 8) as u8;
    let p2 = (port & 0xFF) as u8;
    let port_cmd = format!(
        "PORT {},{},{},{},{},{}\r\n",
        ip_octets[0], ip_octets[1], ip_octets[2], ip_octets[3], p1, p2
    );
    write_half.write_all(port_cmd.as_bytes()).await.unwrap();
    assert!(read_reply(&mut reader).await.starts_with("200"));

    write_half.write_all(b"STOR upload.bin\r\n").await.unwrap();
    assert!(read_reply(&mut reader).await.starts_with("150"));

    let (mut data_stream, _) = listener.accept().await.unwrap();
    data_stream.write_all(b"first-chunk").await.unwrap();
    drop(data_stream);

    assert!(read_reply(&mut reader).await.starts_with("226"));

    let contents = tokio::fs::read(dir.path().join("upload.bin")).await.unwrap();
    assert_eq!(contents, b"first-chunk");

    server.fini().await.unwrap();
}

#[tokio::test]
async fn rename_from_without_rnfr_replies_with_both_lines() {
    let dir = tempfile::tempdir().unwrap();
    let (server, addr) = start_server(dir.path().to_path_buf()).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    read_reply(&mut reader).await;

    write_half.write_all(b"RNTO anything\r\n").await.unwrap();
    assert!(read_reply(&mut reader).await.starts_with("550"));
    assert!(read_reply(&mut reader).await.starts_with("226"));

    server.fini().await.unwrap();
}

#[tokio::test]
async fn unknown_command_gets_502() {
    let dir = tempfile::tempdir().unwrap();
    let (server, addr) = start_server(dir.path().to_path_buf()).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    read_reply(&mut reader).await;

    write_half.write_all(b"FROBNICATE\r\n").await.unwrap();
    assert!(read_reply(&mut reader).await.starts_with("502"));

    server.fini().await.unwrap();
}

#[tokio::test]
async fn fini_drains_in_flight_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let (server, addr) = start_server(dir.path().to_path_buf()).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, _write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    read_reply(&mut reader).await;

    server.fini().await.unwrap();
    // A second fini() without an intervening init() must report misuse.
    assert!(server.fini().await.is_err());
}
