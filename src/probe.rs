//! Filesystem metadata probes backing the leaf expression terms.
//!
//! The `empty`, `exists`, `since`, and `type` terms read live metadata at
//! evaluation time. Access goes through the [`FsProbe`] trait so evaluation
//! can be exercised against fakes; [`LiveProbe`] is the `std::fs`-backed
//! production implementation.

use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use thiserror::Error;

/// Errors from metadata probes.
///
/// A missing path is distinct from other I/O failures: `exists` and the
/// error-trigger routing in dispatch care about the difference.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("metadata read failed for {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl ProbeError {
    fn from_io(path: &Path, e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            ProbeError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ProbeError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    }
}

/// Metadata snapshot used by the `empty` and `since` terms.
///
/// Timestamps are seconds since the Unix epoch, fractional so filesystems
/// with sub-second resolution still order correctly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileStat {
    pub size: u64,
    pub mtime: f64,
    pub ctime: f64,
    pub atime: f64,
}

/// On-disk entry kind, one per `type` letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// `b` - block special file.
    BlockDevice,
    /// `c` - character special file.
    CharDevice,
    /// `d` - directory.
    Directory,
    /// `f` - regular file.
    File,
    /// `p` - named pipe (FIFO).
    Fifo,
    /// `l` - symbolic link.
    Symlink,
    /// `s` - socket.
    Socket,
    /// Anything the platform reports that has no `type` letter.
    Unknown,
}

/// Metadata access needed by leaf terms.
pub trait FsProbe: Send + Sync {
    /// Stat the path, following symlinks.
    fn stat(&self, path: &Path) -> Result<FileStat, ProbeError>;

    /// Classify the path without following the final symlink.
    fn lstat(&self, path: &Path) -> Result<EntryKind, ProbeError>;

    /// Whether the path currently exists. Never fails; an unreadable path
    /// reports false.
    fn exists(&self, path: &Path) -> bool;
}

/// Production probe over `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveProbe;

impl FsProbe for LiveProbe {
    fn stat(&self, path: &Path) -> Result<FileStat, ProbeError> {
        let meta = std::fs::metadata(path).map_err(|e| ProbeError::from_io(path, e))?;
        Ok(FileStat {
            size: meta.len(),
            mtime: system_time_secs(meta.modified().ok()),
            ctime: ctime_secs(&meta),
            atime: system_time_secs(meta.accessed().ok()),
        })
    }

    fn lstat(&self, path: &Path) -> Result<EntryKind, ProbeError> {
        let meta = std::fs::symlink_metadata(path).map_err(|e| ProbeError::from_io(path, e))?;
        Ok(entry_kind(&meta.file_type()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn system_time_secs(t: Option<std::time::SystemTime>) -> f64 {
    t.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(unix)]
fn ctime_secs(meta: &std::fs::Metadata) -> f64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime() as f64 + meta.ctime_nsec() as f64 / 1e9
}

#[cfg(not(unix))]
fn ctime_secs(meta: &std::fs::Metadata) -> f64 {
    // No inode change time off unix; mtime is the closest analogue.
    system_time_secs(meta.modified().ok())
}

#[cfg(unix)]
fn entry_kind(ft: &std::fs::FileType) -> EntryKind {
    use std::os::unix::fs::FileTypeExt;
    if ft.is_symlink() {
        EntryKind::Symlink
    } else if ft.is_dir() {
        EntryKind::Directory
    } else if ft.is_file() {
        EntryKind::File
    } else if ft.is_block_device() {
        EntryKind::BlockDevice
    } else if ft.is_char_device() {
        EntryKind::CharDevice
    } else if ft.is_fifo() {
        EntryKind::Fifo
    } else if ft.is_socket() {
        EntryKind::Socket
    } else {
        EntryKind::Unknown
    }
}

#[cfg(not(unix))]
fn entry_kind(ft: &std::fs::FileType) -> EntryKind {
    if ft.is_symlink() {
        EntryKind::Symlink
    } else if ft.is_dir() {
        EntryKind::Directory
    } else if ft.is_file() {
        EntryKind::File
    } else {
        EntryKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_stat_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.txt");
        fs::write(&file, "hello").unwrap();

        let stat = LiveProbe.stat(&file).unwrap();
        assert_eq!(stat.size, 5);
        assert!(stat.mtime > 0.0);
    }

    #[test]
    fn test_stat_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        match LiveProbe.stat(&missing) {
            Err(ProbeError::NotFound { path }) => assert_eq!(path, missing),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_lstat_classifies_file_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "").unwrap();

        assert_eq!(LiveProbe.lstat(&file).unwrap(), EntryKind::File);
        assert_eq!(LiveProbe.lstat(dir.path()).unwrap(), EntryKind::Directory);
    }

    #[cfg(unix)]
    #[test]
    fn test_lstat_does_not_follow_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        fs::write(&target, "x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(LiveProbe.lstat(&link).unwrap(), EntryKind::Symlink);
    }

    #[test]
    fn test_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LiveProbe.exists(dir.path()));
        assert!(!LiveProbe.exists(&dir.path().join("absent")));
    }
}
