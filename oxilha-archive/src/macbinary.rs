//! MacBinary header stripping.
//!
//! Archives produced by MacLHA compress the file together with a leading
//! 128-byte MacBinary block holding MacOS metadata (file name, type and
//! creator codes, fork lengths). When a member's origin OS is MacOS, the
//! reader routes its decoder through this filter: a valid MacBinary block
//! is consumed and only the data fork is exposed. Length and CRC checks
//! always run against the unfiltered decoder underneath, so verification
//! covers the complete raw stream.

use crate::decoder::Decoder;
use log::debug;

/// Size of a MacBinary header block.
const HEADER_LEN: usize = 128;

/// Fork data is padded up to a multiple of this.
const CHUNK: u64 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Still collecting the candidate header block.
    Probe,
    /// Valid header seen; serving the data fork.
    Strip { remaining: u64 },
    /// Data fork served; consuming the rest of the raw stream.
    Drain,
    /// No valid header; serving the buffered block, then everything else.
    Pass,
}

/// Decoder filter that strips a MacBinary header from the decoded stream.
pub struct MacBinaryFilter {
    inner: Decoder,
    buffered: Vec<u8>,
    buffered_pos: usize,
    phase: Phase,
}

impl MacBinaryFilter {
    /// Wrap a member decoder.
    pub fn new(inner: Decoder) -> Self {
        Self {
            inner,
            buffered: Vec::with_capacity(HEADER_LEN),
            buffered_pos: 0,
            phase: Phase::Probe,
        }
    }

    /// The decoder under the filter, for length/CRC verification.
    pub fn inner(&self) -> &Decoder {
        &self.inner
    }

    /// Read filtered bytes. Same contract as [`Decoder::read`].
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        if self.phase == Phase::Probe {
            self.probe();
        }

        // Serve buffered header bytes first in passthrough mode.
        if self.phase == Phase::Pass && self.buffered_pos < self.buffered.len() {
            let count = buf.len().min(self.buffered.len() - self.buffered_pos);
            buf[..count]
                .copy_from_slice(&self.buffered[self.buffered_pos..self.buffered_pos + count]);
            self.buffered_pos += count;
            return count;
        }

        loop {
            match self.phase {
                Phase::Strip { remaining } => {
                    if remaining == 0 {
                        self.phase = Phase::Drain;
                        continue;
                    }
                    let want = buf.len().min(remaining as usize);
                    let n = self.inner.read(&mut buf[..want]);
                    if n == 0 {
                        self.phase = Phase::Drain;
                        continue;
                    }
                    self.phase = Phase::Strip {
                        remaining: remaining - n as u64,
                    };
                    return n;
                }
                Phase::Drain => {
                    // Consume the padding and resource fork so the inner
                    // decoder sees the whole raw stream.
                    self.drain();
                    return 0;
                }
                Phase::Pass => return self.inner.read(buf),
                Phase::Probe => unreachable!(),
            }
        }
    }

    /// Collect the first 128 decoded bytes and decide whether they are a
    /// MacBinary block.
    fn probe(&mut self) {
        let mut chunk = [0u8; HEADER_LEN];
        while self.buffered.len() < HEADER_LEN {
            let want = HEADER_LEN - self.buffered.len();
            let n = self.inner.read(&mut chunk[..want]);
            if n == 0 {
                break;
            }
            self.buffered.extend_from_slice(&chunk[..n]);
        }

        if self.buffered.len() == HEADER_LEN {
            if let Some(data_len) = validate(&self.buffered, self.inner.expected_length()) {
                debug!("MacBinary header detected, data fork {} bytes", data_len);
                self.buffered.clear();
                self.phase = Phase::Strip {
                    remaining: data_len,
                };
                return;
            }
        }

        self.phase = Phase::Pass;
    }

    fn drain(&mut self) {
        let mut sink = [0u8; 512];
        while self.inner.read(&mut sink) > 0 {}
    }
}

/// Check whether `block` is a plausible MacBinary header for a raw stream
/// of `raw_length` bytes, returning the data fork length if so.
fn validate(block: &[u8], raw_length: u64) -> Option<u64> {
    // Fixed zero bytes of the MacBinary I layout.
    if block[0] != 0 || block[74] != 0 || block[82] != 0 {
        return None;
    }

    let name_len = usize::from(block[1]);
    if !(1..=63).contains(&name_len) {
        return None;
    }

    let data_len = u64::from(u32::from_be_bytes([
        block[83], block[84], block[85], block[86],
    ]));
    let resource_len = u64::from(u32::from_be_bytes([
        block[87], block[88], block[89], block[90],
    ]));

    // The raw stream is the header plus both forks, each padded to a
    // 128-byte boundary.
    let expected = HEADER_LEN as u64 + pad(data_len) + pad(resource_len);
    if expected != raw_length {
        return None;
    }

    Some(data_len)
}

fn pad(len: u64) -> u64 {
    len.div_ceil(CHUNK) * CHUNK
}
