//! Command Handlers (spec §4.4).
//!
//! One function per recognized FTP verb, implementing the response
//! contracts in `spec.md` §4.4, cross-checked byte-for-byte against
//! `ps4_ftp.cpp`'s `cmd_*_func` family.

use std::io;

use log::{info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt, AsyncSeekExt, SeekFrom};

use crate::context::ServerContext;
use crate::data::parse_port_arg;
use crate::fs::Filesystem;
use crate::listing;
use crate::path;
use crate::session::{reply, Control, Session};

/// Resolve a command argument against the session's cwd, as
/// `gen_ftp_fullpath` does in the source: every verb below that needs a
/// target path sends `500 Syntax error, command unrecognized.` and aborts
/// the handler if no argument was supplied.
async fn resolve_or_syntax_error(
    session: &Session,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<Option<String>> {
    match arg.map(str::trim).filter(|a| !a.is_empty()) {
        Some(a) => Ok(Some(path::resolve(&session.cwd, a))),
        None => {
            reply(ctrl, "500 Syntax error, command unrecognized.").await?;
            Ok(None)
        }
    }
}

pub async fn noop(ctrl: &mut Control) -> io::Result<()> {
    reply(ctrl, "200 No operation ;)").await
}

pub async fn user(ctrl: &mut Control) -> io::Result<()> {
    reply(ctrl, "331 Username OK, need password b0ss.").await
}

pub async fn pass(ctrl: &mut Control) -> io::Result<()> {
    reply(ctrl, "230 User logged in!").await
}

pub async fn quit(ctrl: &mut Control) -> io::Result<()> {
    reply(ctrl, "221 Goodbye senpai :'(").await
}

pub async fn syst(ctrl: &mut Control) -> io::Result<()> {
    reply(ctrl, "215 UNIX Type: L8").await
}

pub async fn feat(ctrl: &mut Control) -> io::Result<()> {
    reply(ctrl, "211-extensions").await?;
    reply(ctrl, "REST STREAM").await?;
    reply(ctrl, "211 end").await
}

pub async fn type_(ctrl: &mut Control, arg: Option<&str>) -> io::Result<()> {
    let first = arg.and_then(|a| a.trim_start().chars().next());
    match first {
        Some('A') | Some('I') => reply(ctrl, "200 Okay").await,
        _ => reply(ctrl, "504 Error: bad parameters?").await,
    }
}

pub async fn pwd(session: &Session, ctrl: &mut Control) -> io::Result<()> {
    reply(
        ctrl,
        &format!("257 \"{}\" is the current directory.", session.cwd),
    )
    .await
}

pub async fn cwd<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let arg = match arg.map(str::trim).filter(|a| !a.is_empty()) {
        Some(a) => a,
        None => {
            return reply(ctrl, "500 Syntax error, command unrecognized.").await;
        }
    };

    let target = if arg == ".." {
        path::dir_up(&session.cwd)
    } else {
        path::resolve(&session.cwd, arg)
    };

    if path::validate_cwd(&ctx.fs, &target).await {
        session.cwd = target;
        reply(ctrl, "250 Requested file action okay, completed.").await
    } else {
        reply(ctrl, "550 Invalid directory.").await
    }
}

pub async fn cdup(session: &mut Session, ctrl: &mut Control) -> io::Result<()> {
    session.cwd = path::dir_up(&session.cwd);
    reply(ctrl, "200 Command okay.").await
}

pub async fn pasv<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
) -> io::Result<()> {
    let (a, b, c, d, p1, p2) = session.data.set_passive(ctx.advertised_addr).await?;
    reply(
        ctrl,
        &format!("227 Entering Passive Mode ({a},{b},{c},{d},{p1},{p2})"),
    )
    .await
}

pub async fn port(session: &mut Session, ctrl: &mut Control, arg: Option<&str>) -> io::Result<()> {
    match arg.and_then(parse_port_arg) {
        Some(peer) => {
            session.data.set_active(peer);
            reply(ctrl, "200 PORT command successful!").await
        }
        None => reply(ctrl, "500 Syntax error").await,
    }
}

pub async fn list<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let target = match arg.map(str::trim).filter(|a| !a.is_empty()) {
        Some(a) => path::resolve(&session.cwd, a),
        None => session.cwd.clone(),
    };

    let entries = match ctx.fs.read_dir(&target).await {
        Ok(entries) => entries,
        Err(_) => return reply(ctrl, "550 Invalid directory.").await,
    };

    reply(ctrl, "150 Opening ASCII mode data transfer for LIST.").await?;
    session.data.open().await?;

    let now = chrono::Utc::now();
    for entry in &entries {
        let link = if entry.metadata.kind == crate::fs::EntryKind::Symlink {
            let full = path::resolve(&target, &entry.name);
            ctx.fs.read_link(&full).await.ok().flatten()
        } else {
            None
        };

        let line = listing::format_entry(&entry.name, &entry.metadata, link.as_deref(), now);
        if let Some(stream) = session.data.stream() {
            stream.write_all(line.as_bytes()).await?;
        }
    }

    session.data.close();
    reply(ctrl, "226 Transfer complete.").await
}

pub async fn retr<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let Some(path) = resolve_or_syntax_error(session, ctrl, arg).await? else {
        return Ok(());
    };

    let mut file = match ctx.fs.open_read(&path).await {
        Ok(f) => f,
        Err(_) => return reply(ctrl, "550 File not found.").await,
    };

    // Negative REST offsets are not validated by the source either; seeking
    // before byte 0 has no Rust equivalent (`SeekFrom::Start` is unsigned),
    // so we clamp to 0 rather than fail the transfer outright.
    let offset = session.restore_point.max(0) as u64;
    file.seek(SeekFrom::Start(offset)).await?;
    session.restore_point = 0;

    reply(ctrl, "150 Opening Image mode data transfer.").await?;
    session.data.open().await?;

    // No "550 Could not allocate memory." fallback here: an allocation
    // failure in safe Rust aborts the process rather than yielding a
    // `Result` this handler could turn into a reply line.
    let buf_size = ctx.file_buf_size();
    let mut buf = vec![0u8; buf_size];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if let Some(stream) = session.data.stream() {
            stream.write_all(&buf[..n]).await?;
        }
    }

    reply(ctrl, "226 Transfer completed.").await?;
    session.data.close();
    Ok(())
}

async fn store<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let Some(path) = resolve_or_syntax_error(session, ctrl, arg).await? else {
        return Ok(());
    };

    let append = session.restore_point != 0;
    let mut file = match ctx.fs.open_write(&path, append).await {
        Ok(f) => f,
        Err(_) => return reply(ctrl, "550 File not found.").await,
    };

    reply(ctrl, "150 Opening Image mode data transfer.").await?;
    session.data.open().await?;

    let buf_size = ctx.file_buf_size();
    let mut buf = vec![0u8; buf_size];
    let mut aborted = false;
    loop {
        let n = match session.data.stream() {
            Some(stream) => stream.read(&mut buf).await,
            None => Ok(0),
        };
        match n {
            Ok(0) => break,
            Ok(n) => {
                if let Err(e) = file.write_all(&buf[..n]).await {
                    warn!("session {}: write failed during STOR: {e}", session.num);
                    aborted = true;
                    break;
                }
            }
            Err(e) => {
                warn!("session {}: recv failed during STOR: {e}", session.num);
                aborted = true;
                break;
            }
        }
    }

    session.restore_point = 0;
    drop(file);

    if aborted {
        let _ = ctx.fs.remove_file(&path).await;
        reply(ctrl, "426 Connection closed; transfer aborted.").await?;
    } else {
        reply(ctrl, "226 Transfer completed.").await?;
    }

    session.data.close();
    Ok(())
}

pub async fn stor<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    store(session, ctx, ctrl, arg).await
}

pub async fn appe<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    // Sentinel: only its non-zeroness matters for the open-mode decision.
    session.restore_point = -1;
    store(session, ctx, ctrl, arg).await
}

pub async fn dele<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let Some(path) = resolve_or_syntax_error(session, ctrl, arg).await? else {
        return Ok(());
    };

    match ctx.fs.remove_file(&path).await {
        Ok(()) => reply(ctrl, "226 File deleted.").await,
        Err(_) => reply(ctrl, "550 Could not delete the file.").await,
    }
}

pub async fn rmd<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let Some(path) = resolve_or_syntax_error(session, ctrl, arg).await? else {
        return Ok(());
    };

    match ctx.fs.remove_dir(&path).await {
        Ok(()) => reply(ctrl, "226 Directory deleted.").await,
        Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
            reply(ctrl, "550 Directory is not empty.").await
        }
        Err(_) => reply(ctrl, "550 Could not delete the directory.").await,
    }
}

pub async fn mkd<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let Some(path) = resolve_or_syntax_error(session, ctrl, arg).await? else {
        return Ok(());
    };

    match ctx.fs.create_dir(&path).await {
        Ok(()) => reply(ctrl, "226 Directory created.").await,
        Err(_) => reply(ctrl, "550 Could not create the directory.").await,
    }
}

pub async fn rnfr<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let Some(path) = resolve_or_syntax_error(session, ctrl, arg).await? else {
        return Ok(());
    };

    if ctx.fs.metadata(&path).await.is_err() {
        return reply(ctrl, "550 The file doesn't exist.").await;
    }

    session.rename_from = Some(path);
    reply(ctrl, "350 I need the destination name b0ss.").await
}

pub async fn rnto<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let Some(to) = resolve_or_syntax_error(session, ctrl, arg).await? else {
        return Ok(());
    };

    // `rename_from` is consumed here regardless of outcome — invariant 5:
    // its prior content is never consulted again after this point.
    let from = session.rename_from.take();

    // Preserved quirk (spec §9, Open Question 4): a failed rename still
    // emits the success line afterward, producing two replies to one
    // command.
    let failed = match from {
        Some(from) => ctx.fs.rename(&from, &to).await.is_err(),
        None => true,
    };

    if failed {
        reply(ctrl, "550 Error renaming the file.").await?;
    }
    reply(ctrl, "226 Rename completed.").await
}

pub async fn size<F: Filesystem>(
    session: &mut Session,
    ctx: &ServerContext<F>,
    ctrl: &mut Control,
    arg: Option<&str>,
) -> io::Result<()> {
    let Some(path) = resolve_or_syntax_error(session, ctrl, arg).await? else {
        return Ok(());
    };

    match ctx.fs.metadata(&path).await {
        Ok(meta) => reply(ctrl, &format!("213: {}", meta.len)).await,
        Err(_) => reply(ctrl, "550 The file doesn't exist.").await,
    }
}

pub async fn rest(session: &mut Session, ctrl: &mut Control, arg: Option<&str>) -> io::Result<()> {
    if let Some(n) = arg.and_then(|a| a.trim().parse::<i64>().ok()) {
        session.restore_point = n;
    }
    reply(ctrl, &format!("350 Resuming at {}", session.restore_point)).await
}

pub async fn unimplemented(ctrl: &mut Control) -> io::Result<()> {
    reply(ctrl, "502 Sorry, command not implemented. :(").await
}

/// Logged once per accepted connection and once per verb dispatched, the
/// closest Rust equivalent to the source's `info`-stream transcript.
pub fn log_command(session_num: u64, verb: &str, arg: Option<&str>) {
    info!("\t{session_num}> {verb} {}", arg.unwrap_or(""));
}
