//! Decoder for the "new-style" LHA compression methods.
//!
//! Used by `-lh4-`, `-lh5-`, `-lh6-` and `-lh7-` (LHA v2 onwards). The
//! stream is a sequence of blocks; each block carries a 16-bit command
//! count followed by three Huffman code tables:
//!
//! 1. a *temp* table, used only to encode the second table,
//! 2. the *code* table, whose symbols are literals (0-255) or copy
//!    lengths (256-509),
//! 3. the *offset* table, whose symbols are the bit lengths of the raw
//!    window offsets that follow copy commands.
//!
//! One decoded command produces either a single literal byte or a copy of
//! up to 256 bytes out of the history window.

use crate::codec::Codec;
use crate::methods::LzhMethod;
use crate::tree::HuffmanTree;
use oxilha_core::bitstream::BitReader;
use oxilha_core::error::{OxilhaError, Result};
use oxilha_core::ringbuffer::HistoryBuffer;
use std::io::Read;

/// Number of command codes: 256 literal byte values plus 254 copy lengths.
pub const NUM_CODES: usize = 510;

/// Number of possible codes in the temp table.
const MAX_TEMP_CODES: usize = 20;

/// Shortest copy a command can encode.
const COPY_THRESHOLD: usize = 3;

/// Streaming decoder for one LH-new compressed member.
pub struct LhNewDecoder<R: Read> {
    /// Input bit stream.
    bits: BitReader<R>,
    /// History window for position-based copies.
    ring: HistoryBuffer,
    /// Commands remaining before a new block header must be read.
    block_remaining: usize,
    /// Tree for command codes.
    code_tree: HuffmanTree,
    /// Tree that encodes the code-table lengths.
    temp_tree: HuffmanTree,
    /// Tree for offset bit lengths.
    offset_tree: HuffmanTree,
    /// log2 of the window size.
    history_bits: u8,
    /// Width of the offset-table count field.
    offset_bits: u8,
}

impl<R: Read> LhNewDecoder<R> {
    /// Create a decoder for `method` reading compressed bytes from `input`.
    pub fn new(method: LzhMethod, input: R) -> Self {
        Self {
            bits: BitReader::new(input),
            ring: HistoryBuffer::new(method.window_size()),
            block_remaining: 0,
            code_tree: HuffmanTree::new(NUM_CODES),
            temp_tree: HuffmanTree::new(MAX_TEMP_CODES),
            offset_tree: HuffmanTree::new(MAX_TEMP_CODES),
            history_bits: method.history_bits(),
            offset_bits: method.offset_bits(),
        }
    }

    /// Read a code length: a 3-bit value, where 7 is extended by a unary
    /// run of 1-bits.
    fn read_length_value(&mut self) -> Result<u8> {
        let mut len = self.bits.read_bits(3)? as u8;
        if len == 7 {
            while self.bits.read_bit()? {
                len = len.saturating_add(1);
            }
        }
        Ok(len)
    }

    /// Read the temp table that encodes the code-table lengths.
    fn read_temp_table(&mut self) -> Result<()> {
        let n = self.bits.read_bits(5)? as usize;

        // n=0 means a single zero-length code; every input decodes to the
        // same symbol.
        if n == 0 {
            let code = self.bits.read_bits(5)? as u16;
            self.temp_tree.set_single(code);
            return Ok(());
        }

        let n = n.min(MAX_TEMP_CODES);
        let mut lengths = [0u8; MAX_TEMP_CODES];
        let mut i = 0;

        while i < n {
            lengths[i] = self.read_length_value()?;
            i += 1;

            // After the first three lengths, a 2-bit field skips over up
            // to a further three entries.
            if i == 3 {
                let skip = self.bits.read_bits(2)? as usize;
                for _ in 0..skip {
                    if i < MAX_TEMP_CODES {
                        lengths[i] = 0;
                    }
                    i += 1;
                }
            }
        }

        self.temp_tree.build(&lengths[..n]);
        Ok(())
    }

    /// Number of code-table entries a skip symbol (0-2) stands for.
    fn read_skip_count(&mut self, skip_range: u16) -> Result<usize> {
        Ok(match skip_range {
            // skiprange=0 => 1 code
            0 => 1,
            // skiprange=1 => 3-18 codes
            1 => self.bits.read_bits(4)? as usize + 3,
            // skiprange=2 => 20+ codes
            _ => self.bits.read_bits(9)? as usize + 20,
        })
    }

    /// Read the command code table, encoded via the temp table.
    fn read_code_table(&mut self) -> Result<()> {
        let n = self.bits.read_bits(9)? as usize;

        if n == 0 {
            let code = self.bits.read_bits(9)? as u16;
            self.code_tree.set_single(code);
            return Ok(());
        }

        let n = n.min(NUM_CODES);
        let mut lengths = [0u8; NUM_CODES];
        let mut i = 0;

        while i < n {
            let code = self.temp_tree.decode(&mut self.bits)?;

            // Symbols 0-2 skip a run of unused codes; anything higher is a
            // length biased by two.
            if code <= 2 {
                let skip_count = self.read_skip_count(code)?;
                for _ in 0..skip_count {
                    if i >= n {
                        break;
                    }
                    lengths[i] = 0;
                    i += 1;
                }
            } else {
                lengths[i] = (code - 2) as u8;
                i += 1;
            }
        }

        self.code_tree.build(&lengths[..n]);
        Ok(())
    }

    /// Read the offset table.
    fn read_offset_table(&mut self) -> Result<()> {
        let n = self.bits.read_bits(self.offset_bits)? as usize;

        if n == 0 {
            let code = self.bits.read_bits(self.offset_bits)? as u16;
            self.offset_tree.set_single(code);
            return Ok(());
        }

        let n = n.min(usize::from(self.history_bits));
        let mut lengths = [0u8; MAX_TEMP_CODES];
        for length in lengths.iter_mut().take(n) {
            *length = self.read_length_value()?;
        }

        self.offset_tree.build(&lengths[..n]);
        Ok(())
    }

    /// Read a block header: command count and the three code tables.
    fn start_new_block(&mut self) -> Result<()> {
        self.block_remaining = self.bits.read_bits(16)? as usize;
        self.read_temp_table()?;
        self.read_code_table()?;
        self.read_offset_table()?;
        Ok(())
    }

    /// Read a window offset. The decoded symbol is the bit length of the
    /// offset:
    ///
    /// ```text
    ///   bits = 0  ->         0
    ///   bits = 1  ->         1
    ///   bits = 2  ->        1x
    ///   bits = 3  ->       1xx
    /// ```
    fn read_offset_code(&mut self) -> Result<usize> {
        let bits = self.offset_tree.decode(&mut self.bits)?;

        match bits {
            0 => Ok(0),
            1 => Ok(1),
            b if b <= u16::from(self.history_bits) => {
                let low = self.bits.read_bits(b as u8 - 1)? as usize;
                Ok((1usize << (b - 1)) + low)
            }
            b => Err(OxilhaError::corrupted(format!(
                "offset bit length {} exceeds the window",
                b
            ))),
        }
    }
}

impl<R: Read> Codec for LhNewDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < self.ring.capacity() {
            return Err(OxilhaError::buffer_too_small(
                self.ring.capacity(),
                buf.len(),
            ));
        }

        while self.block_remaining == 0 {
            self.start_new_block()?;
        }
        self.block_remaining -= 1;

        let code = self.code_tree.decode(&mut self.bits)?;

        if code < 256 {
            buf[0] = code as u8;
            self.ring.push(code as u8);
            Ok(1)
        } else if usize::from(code) < NUM_CODES {
            let length = usize::from(code) - 256 + COPY_THRESHOLD;
            let offset = self.read_offset_code()?;
            self.ring.copy_from_history(offset, &mut buf[..length]);
            Ok(length)
        } else {
            Err(OxilhaError::corrupted(format!(
                "command code {} out of range",
                code
            )))
        }
    }
}
