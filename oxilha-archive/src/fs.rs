//! Platform side effects behind a trait.
//!
//! Extraction needs a handful of filesystem primitives: create a file
//! carrying ownership and mode, make a directory, create a symlink, and
//! apply metadata after the fact. They are collected in the [`Filesystem`]
//! trait so the reader logic can be tested against an in-memory
//! implementation; [`LocalFs`] is the real one.

use filetime::FileTime;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Difference between the Windows FILETIME epoch (1601) and the Unix
/// epoch (1970), in seconds.
const FILETIME_EPOCH_OFFSET: u64 = 11_644_473_600;
/// FILETIME ticks per second (100ns units).
const FILETIME_TICKS: u64 = 10_000_000;

/// What a path currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Nothing exists at the path.
    Missing,
    /// A regular file.
    File,
    /// A directory.
    Dir,
    /// Something else (device, socket, dangling symlink, ...).
    Other,
}

/// Filesystem operations the extractor depends on.
pub trait Filesystem {
    /// Create (or truncate) a file, applying ownership and permissions
    /// when given. Ownership failures are not fatal; permissions are
    /// applied at creation.
    fn create_file(
        &mut self,
        path: &str,
        uid_gid: Option<(u32, u32)>,
        perms: Option<u32>,
    ) -> io::Result<Box<dyn Write>>;

    /// Create a directory with the given mode.
    fn mkdir(&mut self, path: &str, perms: u32) -> io::Result<()>;

    /// What currently exists at `path`.
    fn path_kind(&self, path: &str) -> PathKind;

    /// Create a symbolic link at `path` pointing to `target`.
    fn symlink(&mut self, target: &str, path: &str) -> io::Result<()>;

    /// Change the permission bits of `path`.
    fn chmod(&mut self, path: &str, perms: u32) -> io::Result<()>;

    /// Change the ownership of `path`.
    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> io::Result<()>;

    /// Set the modification time of `path`, in Unix epoch seconds.
    fn set_timestamp(&mut self, path: &str, unix_secs: u64) -> io::Result<()>;

    /// Set timestamps from a Windows FILETIME triple.
    fn set_windows_timestamps(
        &mut self,
        path: &str,
        creation: u64,
        modification: u64,
        access: u64,
    ) -> io::Result<()> {
        // Creation and access times have no portable representation here;
        // the modification time is what listing tools show.
        let _ = (creation, access);
        match filetime_to_unix(modification) {
            Some(secs) => self.set_timestamp(path, secs),
            None => Ok(()),
        }
    }
}

/// Convert a FILETIME value to Unix epoch seconds, if it is in range.
pub fn filetime_to_unix(filetime: u64) -> Option<u64> {
    (filetime / FILETIME_TICKS).checked_sub(FILETIME_EPOCH_OFFSET)
}

/// The process-local filesystem.
#[derive(Debug, Default)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn create_file(
        &mut self,
        path: &str,
        uid_gid: Option<(u32, u32)>,
        perms: Option<u32>,
    ) -> io::Result<Box<dyn Write>> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        if let Some(mode) = perms {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = perms;

        let file = options.open(path)?;

        #[cfg(unix)]
        if let Some((uid, gid)) = uid_gid {
            // Only root may change ownership; failure is routine.
            if let Err(err) = std::os::unix::fs::chown(path, Some(uid), Some(gid)) {
                log::warn!("cannot set ownership of {}: {}", path, err);
            }
        }
        #[cfg(not(unix))]
        let _ = uid_gid;

        Ok(Box::new(file))
    }

    fn mkdir(&mut self, path: &str, perms: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new().mode(perms).create(path)
        }
        #[cfg(not(unix))]
        {
            let _ = perms;
            fs::create_dir(path)
        }
    }

    fn path_kind(&self, path: &str) -> PathKind {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => PathKind::Dir,
            Ok(meta) if meta.is_file() => PathKind::File,
            Ok(_) => PathKind::Other,
            Err(_) => PathKind::Missing,
        }
    }

    fn symlink(&mut self, target: &str, path: &str) -> io::Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(target, path)
        }
        #[cfg(not(unix))]
        {
            let _ = (target, path);
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "symlinks are not supported on this platform",
            ))
        }
    }

    fn chmod(&mut self, path: &str, perms: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(perms))
        }
        #[cfg(not(unix))]
        {
            let _ = (path, perms);
            Ok(())
        }
    }

    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::chown(path, Some(uid), Some(gid))
        }
        #[cfg(not(unix))]
        {
            let _ = (path, uid, gid);
            Ok(())
        }
    }

    fn set_timestamp(&mut self, path: &str, unix_secs: u64) -> io::Result<()> {
        let time = FileTime::from_unix_time(unix_secs as i64, 0);
        filetime::set_file_mtime(Path::new(path), time)
    }
}
