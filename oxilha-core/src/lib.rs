//! # OxiLHA Core
//!
//! Core components for the OxiLHA archive library.
//!
//! This crate provides the fundamental building blocks for reading LHA/LZH
//! archives:
//!
//! - [`bitstream`]: MSB-first bit-level I/O for the Huffman-coded stream
//! - [`ringbuffer`]: sliding history window for LZSS decompression
//! - [`crc`]: the CRC-16 checksum LHA verifies members with
//! - [`header`]: archive member metadata
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! OxiLHA is a layered stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L4: CLI (oxilha-cli)                                    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L3: Container (oxilha-archive)                          │
//! │     header parsing, reader state machine, extraction    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec (oxilha-lzhuf)                                │
//! │     LZSS + Huffman decoders for -lh4- .. -lh7-          │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Primitives (this crate)                             │
//! │     BitReader, HistoryBuffer, Crc16, FileHeader         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxilha_core::bitstream::BitReader;
//! use oxilha_core::crc::Crc16;
//! use std::io::Cursor;
//!
//! let data = vec![0xAB, 0xCD];
//! let mut reader = BitReader::new(Cursor::new(data));
//! assert_eq!(reader.read_bits(12).unwrap(), 0xABC);
//!
//! assert_eq!(Crc16::compute(b"123456789"), 0xBB3D);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod crc;
pub mod error;
pub mod header;
pub mod ringbuffer;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use crc::Crc16;
pub use error::{OxilhaError, Result};
pub use header::{FileHeader, FileHeaderRef, OsType};
pub use ringbuffer::HistoryBuffer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::crc::Crc16;
    pub use crate::error::{OxilhaError, Result};
    pub use crate::header::{FileHeader, FileHeaderRef, OsType};
    pub use crate::ringbuffer::HistoryBuffer;
}
