//! Archive member metadata.
//!
//! This module defines the `FileHeader` struct describing a single member of
//! an LHA/LZH archive, along with the origin OS tag. Headers are produced by
//! the container parser; the reader and extractor only consume the fields
//! here.

use std::fmt;
use std::rc::Rc;

/// Compression method tag marking a directory entry (no data follows).
pub const COMPRESS_TYPE_DIR: &str = "-lhd-";

/// A header can be held by the iterator, the caller, and the deferred
/// directory stack at the same time.
pub type FileHeaderRef = Rc<FileHeader>;

/// Operating system the archive member was created on.
///
/// Stored as a single byte in level 1 and later headers. Only
/// [`OsType::MacOs`] changes reader behavior (MacBinary stripping); the
/// rest are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    /// MS-DOS ('M').
    Msdos,
    /// Windows 95 ('w').
    Win95,
    /// Windows NT ('W').
    WinNt,
    /// Unix ('U').
    Unix,
    /// OS/2 ('2').
    Os2,
    /// Classic MacOS ('m'), produced by MacLHA.
    MacOs,
    /// Amiga ('A').
    Amiga,
    /// Atari ('a').
    Atari,
    /// Java LHA ('J').
    Java,
    /// Anything else, including the absent tag of level 0 headers.
    Unknown(u8),
}

impl OsType {
    /// Decode the OS identifier byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'M' => Self::Msdos,
            b'w' => Self::Win95,
            b'W' => Self::WinNt,
            b'U' => Self::Unix,
            b'2' => Self::Os2,
            b'm' => Self::MacOs,
            b'A' => Self::Amiga,
            b'a' => Self::Atari,
            b'J' => Self::Java,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Msdos => "MS-DOS",
            Self::Win95 => "Windows 95",
            Self::WinNt => "Windows NT",
            Self::Unix => "Unix",
            Self::Os2 => "OS/2",
            Self::MacOs => "MacOS",
            Self::Amiga => "Amiga",
            Self::Atari => "Atari",
            Self::Java => "Java",
            Self::Unknown(_) => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Metadata for a single archive member.
///
/// `path` and `filename` are kept separate: `path` is the directory prefix
/// (always ending in `/` when present), `filename` the leaf name. Directory
/// entries carry only a `path`; regular files always have a `filename`.
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// Directory prefix, ending in `/`, or `None` for top-level entries.
    pub path: Option<String>,
    /// Leaf file name; `None` for pure directory entries.
    pub filename: Option<String>,
    /// 5-byte ASCII compression method tag, e.g. `-lh5-`.
    pub compress_method: String,
    /// Size of the compressed data following the header.
    pub compressed_length: u64,
    /// Uncompressed size of the member.
    pub length: u64,
    /// Expected CRC-16 of the uncompressed data.
    pub crc: u16,
    /// Operating system the member was created on.
    pub os_type: OsType,
    /// Header level (0 to 3).
    pub level: u8,
    /// Symbolic link target; `Some` means the entry is a symlink.
    pub symlink_target: Option<String>,
    /// Modification time as Unix epoch seconds, or 0 if absent.
    pub timestamp: u64,
    /// Unix user id, when the archive recorded one.
    pub unix_uid: Option<u16>,
    /// Unix group id, when the archive recorded one.
    pub unix_gid: Option<u16>,
    /// Unix permission bits, when the archive recorded them.
    pub unix_perms: Option<u16>,
    /// Windows creation time (FILETIME), when recorded.
    pub win_creation_time: Option<u64>,
    /// Windows modification time (FILETIME), when recorded.
    pub win_modification_time: Option<u64>,
    /// Windows access time (FILETIME), when recorded.
    pub win_access_time: Option<u64>,
}

impl FileHeader {
    /// Whether this entry is a directory marker.
    pub fn is_dir(&self) -> bool {
        self.compress_method == COMPRESS_TYPE_DIR && self.symlink_target.is_none()
    }

    /// Whether this entry is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.symlink_target.is_some()
    }

    /// Whether the header carries Unix uid/gid fields.
    pub fn has_unix_uid_gid(&self) -> bool {
        self.unix_uid.is_some() && self.unix_gid.is_some()
    }

    /// Whether the header carries Unix permission bits.
    pub fn has_unix_perms(&self) -> bool {
        self.unix_perms.is_some()
    }

    /// Whether the header carries the Windows timestamp triple.
    pub fn has_windows_timestamps(&self) -> bool {
        self.win_creation_time.is_some()
            && self.win_modification_time.is_some()
            && self.win_access_time.is_some()
    }

    /// The full path of the entry: directory prefix plus leaf name.
    pub fn full_path(&self) -> String {
        let mut result = String::new();
        if let Some(path) = &self.path {
            result.push_str(path);
        }
        if let Some(filename) = &self.filename {
            result.push_str(filename);
        }
        result
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            path: None,
            filename: None,
            compress_method: String::new(),
            compressed_length: 0,
            length: 0,
            crc: 0,
            os_type: OsType::Unknown(0),
            level: 0,
            symlink_target: None,
            timestamp: 0,
            unix_uid: None,
            unix_gid: None,
            unix_perms: None,
            win_creation_time: None,
            win_modification_time: None,
            win_access_time: None,
        }
    }
}

impl fmt::Display for FileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_char = if self.is_symlink() {
            'l'
        } else if self.is_dir() {
            'd'
        } else {
            '-'
        };
        let path = self.full_path();
        let path = if path.is_empty() {
            "<unnamed>"
        } else {
            path.as_str()
        };
        write!(
            f,
            "{}{:>10} {:>10} {} {}",
            type_char, self.length, self.compressed_length, self.compress_method, path
        )
    }
}
