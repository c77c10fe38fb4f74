//! Listing Formatter (spec §4.2).
//!
//! Renders one directory entry into the `ls -l`-like line FTP clients
//! expect, bit-compatible with `ps4_ftp.cpp`'s `gen_list_format`.

use crate::fs::{EntryKind, Metadata};
use chrono::{DateTime, Datelike, Timelike, Utc};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn type_char(kind: EntryKind) -> char {
    match kind {
        EntryKind::Regular => '-',
        EntryKind::Directory => 'd',
        EntryKind::Symlink => 'l',
        EntryKind::BlockDevice => 'b',
        EntryKind::CharDevice => 'c',
        EntryKind::Fifo => 'p',
        EntryKind::Socket => 's',
        EntryKind::Other => ' ',
    }
}

fn exec_char(mode: u32, exec_bit: u32, is_dir: bool) -> char {
    if mode & exec_bit != 0 {
        if is_dir { 's' } else { 'x' }
    } else if is_dir {
        'S'
    } else {
        '-'
    }
}

fn perm_triplet(mode: u32, read_bit: u32, write_bit: u32, exec_bit: u32, is_dir: bool) -> [char; 3] {
    [
        if mode & read_bit != 0 { 'r' } else { '-' },
        if mode & write_bit != 0 { 'w' } else { '-' },
        exec_char(mode, exec_bit, is_dir),
    ]
}

/// Render one directory entry as a CRLF-terminated listing line.
pub fn format_entry(
    name: &str,
    meta: &Metadata,
    link: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let is_dir = meta.is_dir();
    let user = perm_triplet(meta.mode, 0o400, 0o200, 0o100, is_dir);
    let group = perm_triplet(meta.mode, 0o040, 0o020, 0o010, is_dir);
    let other = perm_triplet(meta.mode, 0o004, 0o002, 0o001, is_dir);

    let yt = if meta.ctime.year() == now.year() {
        format!("{:02}:{:02}", meta.ctime.hour(), meta.ctime.minute())
    } else {
        format!("{:04}", meta.ctime.year())
    };

    let month = MONTHS[(meta.ctime.month0() % 12) as usize];

    let mut line = format!(
        "{}{}{}{}{}{}{}{}{}{} 1 ps4 ps4 {} {} {:2} {} {}",
        type_char(meta.kind),
        user[0],
        user[1],
        user[2],
        group[0],
        group[1],
        group[2],
        other[0],
        other[1],
        other[2],
        meta.len,
        month,
        meta.ctime.day(),
        yt,
        name,
    );

    if meta.kind == EntryKind::Symlink {
        if let Some(target) = link {
            if !target.is_empty() {
                line.push_str(" -> ");
                line.push_str(target);
            }
        }
    }

    line.push_str("\r\n");
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(kind: EntryKind, mode: u32, len: u64, ctime: DateTime<Utc>) -> Metadata {
        Metadata {
            kind,
            mode,
            len,
            ctime,
        }
    }

    #[test]
    fn regular_file_current_year_uses_clock_time() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let ctime = Utc.with_ymd_and_hms(2026, 3, 5, 9, 30, 0).unwrap();
        let m = meta(EntryKind::Regular, 0o644, 5, ctime);
        let line = format_entry("a", &m, None, now);
        assert_eq!(line, "-rw-r--r-- 1 ps4 ps4 5 Mar  5 09:30 a\r\n");
    }

    #[test]
    fn directory_exec_bit_renders_as_sticky_style() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let ctime = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let m = meta(EntryKind::Directory, 0o755, 0, ctime);
        let line = format_entry("dir", &m, None, now);
        assert_eq!(line, "drwxr-xr-x 1 ps4 ps4 0 Jan  1 2020 dir\r\n");
    }

    #[test]
    fn symlink_appends_target_only_when_nonempty() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let ctime = now;
        let m = meta(EntryKind::Symlink, 0o777, 0, ctime);
        let with_target = format_entry("link", &m, Some("/real"), now);
        assert!(with_target.ends_with("link -> /real\r\n"));

        let without_target = format_entry("link", &m, Some(""), now);
        assert!(without_target.ends_with("link\r\n"));
        assert!(!without_target.contains("->"));
    }
}
