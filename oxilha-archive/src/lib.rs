//! # OxiLHA Archive
//!
//! Streaming reader for LHA/LZH archives.
//!
//! The crate parses member headers (levels 0 to 3), decodes member data
//! through the codecs in `oxilha-lzhuf`, verifies lengths and CRCs, and
//! extracts files, directories and symlinks with their recorded metadata.
//! Input is a plain `Read`: no seeking, no random access; members are
//! visited strictly in archive order.
//!
//! Directory metadata is applied through a deferral policy: see
//! [`DirPolicy`] and [`LhaReader`].
//!
//! ## Example
//!
//! ```no_run
//! use oxilha_archive::{DirPolicy, LhaReader};
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = LhaReader::new(File::open("archive.lzh")?);
//! reader.set_dir_policy(DirPolicy::EndOfDir);
//!
//! while let Some(header) = reader.next_file()? {
//!     println!("extracting {}", header.full_path());
//!     reader.extract(None, None)?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod basic;
pub mod decoder;
pub mod fs;
pub mod header;
pub mod macbinary;
pub mod reader;

// Re-exports
pub use basic::BasicReader;
pub use decoder::{Decoder, ProgressCallback};
pub use fs::{Filesystem, LocalFs, PathKind};
pub use macbinary::MacBinaryFilter;
pub use reader::{DirPolicy, LhaReader};

pub use oxilha_core::header::{FileHeader, FileHeaderRef, OsType};
