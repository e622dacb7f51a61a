//! Passthrough codec for stored members.
//!
//! `-lh0-` members are stored without compression, and `-lhd-` directory
//! markers carry no data at all. Both decode by copying input to output.

use crate::codec::Codec;
use oxilha_core::error::Result;
use std::io::Read;

/// Codec that passes input through unchanged.
pub struct NullDecoder<R: Read> {
    input: R,
}

impl<R: Read> NullDecoder<R> {
    /// Create a passthrough decoder over `input`.
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: Read> Codec for NullDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.input.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
