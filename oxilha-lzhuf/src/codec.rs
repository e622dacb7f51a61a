//! Codec trait and the method registry.
//!
//! Each compression method is described by an immutable [`CodecSpec`]
//! record: a constructor, the output buffer size a single `read` call may
//! need, and the progress block granularity. The archive reader consumes
//! only this contract, so new decoders plug in without touching it.

use crate::lznew::LhNewDecoder;
use crate::methods::LzhMethod;
use crate::null::NullDecoder;
use oxilha_core::error::Result;
use std::io::Read;

/// Byte source for a codec: the compressed bytes of one archive member.
pub type CodecInput = Box<dyn Read>;

/// A streaming decoder for one compressed member.
///
/// `read` decodes the next run of output. `Ok(0)` signals a clean end of
/// the stream; an error means the stream was truncated or corrupt. The
/// caller must supply a buffer of at least the codec's declared
/// [`CodecSpec::max_read`] bytes.
pub trait Codec {
    /// Decode the next run of output into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reset per-frame state. Codecs without frame structure keep the
    /// default no-op.
    fn reset(&mut self) {}
}

/// Immutable description of one compression method.
pub struct CodecSpec {
    /// The 5-byte method tag, e.g. `-lh5-`.
    pub tag: &'static str,
    /// Constructor for the decoder.
    new: fn(CodecInput) -> Box<dyn Codec>,
    /// Output buffer size a single `read` call requires.
    pub max_read: usize,
    /// Progress callback granularity, in decoded bytes.
    pub block_size: u64,
}

impl CodecSpec {
    /// Instantiate the decoder over a member's compressed bytes.
    pub fn open(&self, input: CodecInput) -> Box<dyn Codec> {
        (self.new)(input)
    }
}

fn new_null(input: CodecInput) -> Box<dyn Codec> {
    Box::new(NullDecoder::new(input))
}

fn new_lh4(input: CodecInput) -> Box<dyn Codec> {
    Box::new(LhNewDecoder::new(LzhMethod::Lh4, input))
}

fn new_lh5(input: CodecInput) -> Box<dyn Codec> {
    Box::new(LhNewDecoder::new(LzhMethod::Lh5, input))
}

fn new_lh6(input: CodecInput) -> Box<dyn Codec> {
    Box::new(LhNewDecoder::new(LzhMethod::Lh6, input))
}

fn new_lh7(input: CodecInput) -> Box<dyn Codec> {
    Box::new(LhNewDecoder::new(LzhMethod::Lh7, input))
}

/// The registry. Directory markers decode through the null codec so that
/// reading a directory member simply yields no bytes.
static CODECS: &[CodecSpec] = &[
    CodecSpec {
        tag: "-lh0-",
        new: new_null,
        max_read: 4096,
        block_size: 4096,
    },
    CodecSpec {
        tag: "-lhd-",
        new: new_null,
        max_read: 4096,
        block_size: 4096,
    },
    CodecSpec {
        tag: "-lh4-",
        new: new_lh4,
        max_read: 4096,
        block_size: 1024,
    },
    CodecSpec {
        tag: "-lh5-",
        new: new_lh5,
        max_read: 8192,
        block_size: 4096,
    },
    CodecSpec {
        tag: "-lh6-",
        new: new_lh6,
        max_read: 32768,
        block_size: 16384,
    },
    CodecSpec {
        tag: "-lh7-",
        new: new_lh7,
        max_read: 65536,
        block_size: 32768,
    },
];

/// Look up the codec record for a method tag.
pub fn for_method(tag: &str) -> Option<&'static CodecSpec> {
    CODECS.iter().find(|spec| spec.tag == tag)
}
