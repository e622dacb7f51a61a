//! Low-level member iteration.
//!
//! `BasicReader` walks the archive member by member: parse a header, hand
//! out the compressed bytes on demand, skip whatever the caller did not
//! consume. It knows nothing about directory policies or extraction; the
//! full reader builds on top of it.

use crate::decoder::Decoder;
use crate::header::read_header;
use oxilha_core::error::{OxilhaError, Result};
use oxilha_core::header::FileHeaderRef;
use oxilha_lzhuf::codec;
use std::io::{Cursor, Read};
use std::rc::Rc;

/// Sequential reader over the members of an archive stream.
pub struct BasicReader<R: Read> {
    stream: R,
    curr: Option<FileHeaderRef>,
    /// Compressed bytes of the current member not yet consumed.
    remaining: u64,
}

impl<R: Read> BasicReader<R> {
    /// Create a reader over an archive byte stream.
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            curr: None,
            remaining: 0,
        }
    }

    /// The header most recently returned by [`BasicReader::next_file`].
    pub fn curr_file(&self) -> Option<&FileHeaderRef> {
        self.curr.as_ref()
    }

    /// Advance to the next member, skipping any unread data of the
    /// current one.
    pub fn next_file(&mut self) -> Result<Option<FileHeaderRef>> {
        self.skip_unread()?;
        self.curr = read_header(&mut self.stream)?.map(Rc::new);
        self.remaining = self
            .curr
            .as_ref()
            .map(|h| h.compressed_length)
            .unwrap_or(0);
        Ok(self.curr.clone())
    }

    /// Open a decode pipeline over the current member's compressed data.
    ///
    /// The member's bytes are drained from the archive stream here, so
    /// this can be called at most once per member.
    pub fn decode(&mut self) -> Result<Decoder> {
        let header = self.curr.as_ref().ok_or(OxilhaError::NoCurrentFile)?;
        let spec = codec::for_method(&header.compress_method)
            .ok_or_else(|| OxilhaError::unsupported_method(&header.compress_method))?;

        let mut data = vec![0u8; self.remaining as usize];
        self.stream.read_exact(&mut data)?;
        self.remaining = 0;

        Ok(Decoder::new(
            spec,
            Box::new(Cursor::new(data)),
            header.length,
        ))
    }

    fn skip_unread(&mut self) -> Result<()> {
        if self.remaining == 0 {
            return Ok(());
        }
        let copied = std::io::copy(
            &mut (&mut self.stream).take(self.remaining),
            &mut std::io::sink(),
        )?;
        if copied != self.remaining {
            return Err(OxilhaError::unexpected_eof((self.remaining - copied) as usize));
        }
        self.remaining = 0;
        Ok(())
    }
}
