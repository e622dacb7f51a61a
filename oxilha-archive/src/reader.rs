//! The archive reader: iteration, verification, extraction.
//!
//! `LhaReader` walks the members of an archive and decodes them on demand.
//! Directory handling is the subtle part: a directory's timestamps and
//! permissions must be applied *after* its contents have been written, or
//! writing the children would disturb them (and a read-only directory
//! could not be filled at all). Extracted directories are therefore pushed
//! on a stack and re-yielded later as "fake" entries, at a point chosen by
//! the configured [`DirPolicy`]; extracting a fake entry applies the
//! deferred metadata.

use crate::basic::BasicReader;
use crate::decoder::{Decoder, ProgressCallback};
use crate::fs::{Filesystem, LocalFs, PathKind};
use crate::macbinary::MacBinaryFilter;
use log::warn;
use oxilha_core::error::{OxilhaError, Result};
use oxilha_core::header::{FileHeader, FileHeaderRef, OsType};
use std::io::{Read, Write};
use std::rc::Rc;

/// When deferred directory metadata is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirPolicy {
    /// Apply metadata as soon as the directory is created. Wrong results
    /// for read-only directories, but never defers anything.
    Plain,
    /// Re-yield a directory once the input moves past its subtree. For
    /// the usual depth-first archive ordering this applies metadata right
    /// after the directory's contents.
    #[default]
    EndOfDir,
    /// Retain every directory until the input is exhausted, then flush
    /// the stack in LIFO order.
    EndOfFile,
}

/// What the reader currently stands on.
enum CurrFile {
    /// Before the first `next_file` call.
    Start,
    /// A real entry from the input stream.
    Normal(FileHeaderRef),
    /// A directory re-yielded from the deferred stack.
    FakeDir(FileHeaderRef),
    /// Input exhausted and stack drained.
    Eof,
}

/// The decode pipeline of the current member, possibly wrapped in the
/// MacBinary filter.
enum ActiveDecoder {
    Raw(Decoder),
    MacBinary(MacBinaryFilter),
}

impl ActiveDecoder {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        match self {
            Self::Raw(decoder) => decoder.read(buf),
            Self::MacBinary(filter) => filter.read(buf),
        }
    }

    /// The raw decoder, which length/CRC verification runs against.
    fn inner(&self) -> &Decoder {
        match self {
            Self::Raw(decoder) => decoder,
            Self::MacBinary(filter) => filter.inner(),
        }
    }
}

/// Streaming reader over an LHA/LZH archive.
///
/// ```no_run
/// use oxilha_archive::LhaReader;
/// use std::fs::File;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut reader = LhaReader::new(File::open("archive.lzh")?);
/// while let Some(header) = reader.next_file()? {
///     println!("{}", header);
///     reader.extract(None, None)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct LhaReader<R: Read> {
    basic: BasicReader<R>,
    curr: CurrFile,
    decoder: Option<ActiveDecoder>,
    /// Directories awaiting metadata. A stack under `EndOfDir`, a LIFO
    /// list under `EndOfFile`.
    dir_stack: Vec<FileHeaderRef>,
    dir_policy: DirPolicy,
}

impl<R: Read> LhaReader<R> {
    /// Create a reader over an archive byte stream.
    pub fn new(stream: R) -> Self {
        Self {
            basic: BasicReader::new(stream),
            curr: CurrFile::Start,
            decoder: None,
            dir_stack: Vec::new(),
            dir_policy: DirPolicy::default(),
        }
    }

    /// Set the directory metadata policy.
    pub fn set_dir_policy(&mut self, policy: DirPolicy) {
        self.dir_policy = policy;
    }

    /// Advance to the next entry.
    ///
    /// Yields real entries in input order, interleaved with fake
    /// directory entries according to the policy. Returns `Ok(None)` once
    /// the input and the deferred stack are both exhausted.
    pub fn next_file(&mut self) -> Result<Option<FileHeaderRef>> {
        // Whatever was being decoded is finished with.
        self.decoder = None;

        // Eof is only entered with an empty stack, so there is nothing
        // left to do.
        if matches!(self.curr, CurrFile::Eof) {
            return Ok(None);
        }

        // Advance the input, unless fake directories are still owed; a
        // previously yielded fake entry is released by the state change
        // below.
        if matches!(self.curr, CurrFile::Start | CurrFile::Normal(_)) {
            self.basic.next_file()?;
        }

        if self.end_of_top_dir() {
            if let Some(header) = self.dir_stack.pop() {
                self.curr = CurrFile::FakeDir(Rc::clone(&header));
                return Ok(Some(header));
            }
        }

        match self.basic.curr_file() {
            Some(header) => {
                let header = Rc::clone(header);
                self.curr = CurrFile::Normal(Rc::clone(&header));
                Ok(Some(header))
            }
            None => {
                self.curr = CurrFile::Eof;
                Ok(None)
            }
        }
    }

    /// Whether the directory on top of the stack should be popped before
    /// looking at the next input entry.
    fn end_of_top_dir(&self) -> bool {
        let Some(top) = self.dir_stack.last() else {
            return false;
        };

        // Once the input ends, all that remains is draining the stack.
        let Some(input) = self.basic.curr_file() else {
            return true;
        };

        match self.dir_policy {
            // Plain never pushes, so this arm is a defensive default.
            DirPolicy::Plain => true,
            DirPolicy::EndOfFile => false,
            DirPolicy::EndOfDir => {
                let top_path = top.path.as_deref().unwrap_or("");
                match input.path.as_deref() {
                    Some(path) => !path.starts_with(top_path),
                    None => true,
                }
            }
        }
    }

    /// Read decoded bytes of the current entry. The decoder is created on
    /// the first call. Returns 0 at end of stream.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.decoder.is_none() {
            self.open_decoder(None)?;
        }
        match self.decoder.as_mut() {
            Some(decoder) => Ok(decoder.read(buf)),
            None => Err(OxilhaError::NoCurrentFile),
        }
    }

    /// Decode the current entry, discarding the output, and verify its
    /// length and CRC. Directories trivially pass.
    pub fn check(&mut self, progress: Option<ProgressCallback>) -> Result<()> {
        let is_dir = match &self.curr {
            CurrFile::Normal(header) => header.is_dir(),
            _ => return Err(OxilhaError::NoCurrentFile),
        };
        if is_dir {
            return Ok(());
        }

        self.decoder = None;
        self.open_decoder(progress)?;
        self.do_decode(None)
    }

    /// Extract the current entry to the local filesystem.
    ///
    /// `path` overrides the destination; by default the entry's own path
    /// is used, relative to the working directory.
    pub fn extract(&mut self, path: Option<&str>, progress: Option<ProgressCallback>) -> Result<()> {
        let mut fs = LocalFs;
        self.extract_to(&mut fs, path, progress)
    }

    /// Extract the current entry through an explicit [`Filesystem`].
    pub fn extract_to(
        &mut self,
        fs: &mut dyn Filesystem,
        path: Option<&str>,
        progress: Option<ProgressCallback>,
    ) -> Result<()> {
        match &self.curr {
            CurrFile::Normal(header) => {
                let header = Rc::clone(header);
                if header.is_symlink() {
                    extract_symlink(fs, &header, path)
                } else if header.is_dir() {
                    self.extract_directory(fs, &header, path)
                } else {
                    self.extract_file(fs, &header, path, progress)
                }
            }
            CurrFile::FakeDir(header) => {
                let header = Rc::clone(header);
                let path = resolve_path(&header, path);
                set_directory_metadata(fs, &header, &path)
            }
            CurrFile::Start | CurrFile::Eof => Err(OxilhaError::NoCurrentFile),
        }
    }

    /// Create the directory, then either apply metadata now (Plain) or
    /// defer it via the stack.
    fn extract_directory(
        &mut self,
        fs: &mut dyn Filesystem,
        header: &FileHeaderRef,
        path: Option<&str>,
    ) -> Result<()> {
        let path = resolve_path(header, path);

        // With permissions to apply later, create the directory minimally
        // accessible; otherwise leave it to the umask.
        let mode = if header.has_unix_perms() { 0o700 } else { 0o777 };

        if let Err(err) = fs.mkdir(&path, mode) {
            // The directory may already exist, which is not an error.
            if fs.path_kind(&path) != PathKind::Dir {
                return Err(err.into());
            }
        }

        match self.dir_policy {
            DirPolicy::Plain => {
                if let Err(err) = set_directory_metadata(fs, header, &path) {
                    warn!("cannot set metadata on {}: {}", path, err);
                }
            }
            DirPolicy::EndOfDir | DirPolicy::EndOfFile => {
                self.dir_stack.push(Rc::clone(header));
            }
        }
        Ok(())
    }

    /// Decode the current member into a newly created file.
    fn extract_file(
        &mut self,
        fs: &mut dyn Filesystem,
        header: &FileHeaderRef,
        path: Option<&str>,
        progress: Option<ProgressCallback>,
    ) -> Result<()> {
        let path = resolve_path(header, path);

        // If the decoder cannot be created there is no point touching the
        // filesystem.
        self.decoder = None;
        self.open_decoder(progress)?;

        let uid_gid = match (header.unix_uid, header.unix_gid) {
            (Some(uid), Some(gid)) => Some((u32::from(uid), u32::from(gid))),
            _ => None,
        };
        let perms = header.unix_perms.map(u32::from);

        let mut file = fs.create_file(&path, uid_gid, perms)?;
        let result = self.do_decode(Some(&mut *file));
        drop(file);

        if result.is_ok() {
            set_timestamps(fs, header, &path);
        }
        result
    }

    /// Build the decode pipeline for the current (normal) entry.
    fn open_decoder(&mut self, progress: Option<ProgressCallback>) -> Result<()> {
        let os_type = match &self.curr {
            CurrFile::Normal(header) => header.os_type,
            _ => return Err(OxilhaError::NoCurrentFile),
        };

        let mut inner = self.basic.decode()?;
        if let Some(callback) = progress {
            inner.monitor(callback);
        }

        // MacLHA members carry a MacBinary block in front of the file
        // body; strip it while keeping verification on the raw stream.
        self.decoder = Some(if os_type == OsType::MacOs {
            ActiveDecoder::MacBinary(MacBinaryFilter::new(inner))
        } else {
            ActiveDecoder::Raw(inner)
        });
        Ok(())
    }

    /// Pump the decoder to the end of the stream and verify length and
    /// CRC against the header.
    fn do_decode(&mut self, mut output: Option<&mut dyn Write>) -> Result<()> {
        let decoder = self.decoder.as_mut().ok_or(OxilhaError::NoCurrentFile)?;

        let mut buf = [0u8; 64];
        loop {
            let n = decoder.read(&mut buf);
            if n == 0 {
                break;
            }
            if let Some(out) = output.as_mut() {
                out.write_all(&buf[..n])?;
            }
        }

        let header = match &self.curr {
            CurrFile::Normal(header) => header,
            _ => return Err(OxilhaError::NoCurrentFile),
        };
        let inner = decoder.inner();
        if inner.length() != header.length {
            return Err(OxilhaError::length_mismatch(header.length, inner.length()));
        }
        if inner.crc() != header.crc {
            return Err(OxilhaError::crc_mismatch(header.crc, inner.crc()));
        }
        Ok(())
    }
}

/// The extraction destination: an explicit override or the entry's path.
fn resolve_path(header: &FileHeader, path: Option<&str>) -> String {
    match path {
        Some(path) => path.to_string(),
        None => header.full_path(),
    }
}

fn extract_symlink(fs: &mut dyn Filesystem, header: &FileHeader, path: Option<&str>) -> Result<()> {
    let path = resolve_path(header, path);
    let Some(target) = header.symlink_target.as_deref() else {
        return Err(OxilhaError::NoCurrentFile);
    };
    fs.symlink(target, &path)?;
    // Timestamps of the link itself are left as created.
    Ok(())
}

/// Apply deferred directory metadata: timestamps, then ownership (best
/// effort), then permissions (fatal on failure).
fn set_directory_metadata(
    fs: &mut dyn Filesystem,
    header: &FileHeader,
    path: &str,
) -> Result<()> {
    set_timestamps(fs, header, path);

    if let (Some(uid), Some(gid)) = (header.unix_uid, header.unix_gid) {
        // Only root can change ownership; continue without it.
        if let Err(err) = fs.chown(path, u32::from(uid), u32::from(gid)) {
            warn!("cannot set ownership of {}: {}", path, err);
        }
    }

    if let Some(perms) = header.unix_perms {
        fs.chmod(path, u32::from(perms))?;
    }
    Ok(())
}

/// Best-effort timestamp application.
fn set_timestamps(fs: &mut dyn Filesystem, header: &FileHeader, path: &str) {
    let result = match (
        header.win_creation_time,
        header.win_modification_time,
        header.win_access_time,
    ) {
        (Some(creation), Some(modification), Some(access)) => {
            fs.set_windows_timestamps(path, creation, modification, access)
        }
        _ if header.timestamp != 0 => fs.set_timestamp(path, header.timestamp),
        _ => Ok(()),
    };
    if let Err(err) = result {
        warn!("cannot set timestamps on {}: {}", path, err);
    }
}
