//! Decode pipeline for one archive member.
//!
//! `Decoder` drives a codec, buffers its output so callers can read with
//! any buffer size, and maintains the running uncompressed length and
//! CRC-16 that verification compares against the header after the stream
//! ends. It also owns the progress callback, invoked once per decoded
//! block (a codec-defined fraction of the window).

use oxilha_core::crc::Crc16;
use oxilha_lzhuf::codec::{Codec, CodecInput, CodecSpec};

/// Progress callback: `(blocks_done, total_blocks)`.
pub type ProgressCallback = Box<dyn FnMut(u64, u64)>;

/// Streaming decoder for the current member.
pub struct Decoder {
    codec: Box<dyn Codec>,
    /// Output staging buffer, sized to the codec's largest single read.
    outbuf: Vec<u8>,
    outbuf_pos: usize,
    outbuf_len: usize,
    /// Set once the codec reports end of stream or fails.
    finished: bool,
    crc: Crc16,
    /// Total decoded bytes so far.
    length: u64,
    /// Uncompressed length the header promises.
    expected_length: u64,
    block_size: u64,
    total_blocks: u64,
    blocks_done: u64,
    progress: Option<ProgressCallback>,
}

impl Decoder {
    /// Create a decoder for a member using the given codec record.
    pub fn new(spec: &CodecSpec, input: CodecInput, expected_length: u64) -> Self {
        Self {
            codec: spec.open(input),
            outbuf: vec![0u8; spec.max_read],
            outbuf_pos: 0,
            outbuf_len: 0,
            finished: false,
            crc: Crc16::new(),
            length: 0,
            expected_length,
            block_size: spec.block_size,
            total_blocks: expected_length.div_ceil(spec.block_size),
            blocks_done: 0,
            progress: None,
        }
    }

    /// Install a progress callback. It is invoked immediately with zero
    /// progress, then once per completed block.
    pub fn monitor(&mut self, mut callback: ProgressCallback) {
        callback(0, self.total_blocks);
        self.progress = Some(callback);
    }

    /// Read decoded bytes into `buf`.
    ///
    /// Returns 0 at the end of the stream, including the truncated-stream
    /// case; validity is decided by comparing [`Decoder::length`] and
    /// [`Decoder::crc`] against the header afterwards.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        if self.outbuf_pos == self.outbuf_len {
            if self.finished {
                return 0;
            }
            match self.codec.read(&mut self.outbuf) {
                Ok(0) => {
                    self.finish();
                    return 0;
                }
                Ok(n) => {
                    self.outbuf_pos = 0;
                    self.outbuf_len = n;
                    self.crc.update(&self.outbuf[..n]);
                    self.length += n as u64;
                    self.update_progress();
                }
                Err(_) => {
                    // Truncated or corrupt stream. The length check below
                    // the pipeline reports the failure.
                    self.finish();
                    return 0;
                }
            }
        }

        let count = buf.len().min(self.outbuf_len - self.outbuf_pos);
        buf[..count].copy_from_slice(&self.outbuf[self.outbuf_pos..self.outbuf_pos + count]);
        self.outbuf_pos += count;
        count
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(callback) = self.progress.as_mut() {
            callback(self.total_blocks, self.total_blocks);
        }
    }

    fn update_progress(&mut self) {
        let done = (self.length / self.block_size).min(self.total_blocks);
        if done > self.blocks_done {
            self.blocks_done = done;
            if let Some(callback) = self.progress.as_mut() {
                callback(done, self.total_blocks);
            }
        }
    }

    /// Total decoded length so far.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Uncompressed length the header declared.
    pub fn expected_length(&self) -> u64 {
        self.expected_length
    }

    /// Running CRC-16 of the decoded output.
    pub fn crc(&self) -> u16 {
        self.crc.value()
    }
}
