//! # OxiLHA LZHuf
//!
//! Decoders for the LZSS + Huffman compression methods of the LHA/LZH
//! archive family.
//!
//! The interesting work is the LH-new decoder shared by `-lh4-`, `-lh5-`,
//! `-lh6-` and `-lh7-`: per-block canonical Huffman tables (a temp table
//! that encodes the main code table, plus an offset table) driving literal
//! and copy commands against a sliding history window. Stored members
//! (`-lh0-`, `-lhd-`) pass through unchanged.
//!
//! Decoding is pull-based: a codec reads compressed bytes from its input
//! on demand and each [`Codec::read`] call produces the next run of
//! decoded bytes.
//!
//! ## Example
//!
//! ```no_run
//! use oxilha_lzhuf::codec;
//! use std::fs::File;
//!
//! let spec = codec::for_method("-lh5-").expect("known method");
//! let input = File::open("member.bin").unwrap();
//! let mut decoder = spec.open(Box::new(input));
//!
//! let mut buf = vec![0u8; spec.max_read];
//! while let Ok(n) = decoder.read(&mut buf) {
//!     if n == 0 {
//!         break;
//!     }
//!     // use buf[..n]
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod lznew;
pub mod methods;
pub mod null;
pub mod tree;

// Re-exports
pub use codec::{Codec, CodecInput, CodecSpec};
pub use lznew::LhNewDecoder;
pub use methods::LzhMethod;
pub use null::NullDecoder;
pub use tree::HuffmanTree;
