//! Error types for OxiLHA operations.
//!
//! This module provides a single error type covering all failure modes of
//! archive reading and decompression: I/O errors, malformed headers,
//! truncated bit streams, and verification failures.

use std::io;
use thiserror::Error;

/// The main error type for OxiLHA operations.
#[derive(Debug, Error)]
pub enum OxilhaError {
    /// I/O error from the underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unsupported compression method.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The 5-byte compression method identifier.
        method: String,
    },

    /// CRC checksum mismatch after decoding a member.
    #[error("CRC mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    CrcMismatch {
        /// Expected CRC-16 value from the file header.
        expected: u16,
        /// CRC-16 computed over the decoded output.
        computed: u16,
    },

    /// Decoded length does not match the header value.
    #[error("Length mismatch: expected {expected} bytes, decoded {actual}")]
    LengthMismatch {
        /// Uncompressed length from the file header.
        expected: u64,
        /// Number of bytes actually decoded.
        actual: u64,
    },

    /// Invalid header format.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Corrupted data in the compressed stream.
    #[error("Corrupted data: {message}")]
    CorruptedData {
        /// Description of the corruption.
        message: String,
    },

    /// Unexpected end of the input stream.
    #[error("Unexpected end of stream: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },

    /// Buffer too small for operation.
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// Operation requires a current file but the reader has none.
    #[error("No current file to operate on")]
    NoCurrentFile,
}

/// Result type alias for OxiLHA operations.
pub type Result<T> = std::result::Result<T, OxilhaError>;

impl OxilhaError {
    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create a CRC mismatch error.
    pub fn crc_mismatch(expected: u16, computed: u16) -> Self {
        Self::CrcMismatch { expected, computed }
    }

    /// Create a length mismatch error.
    pub fn length_mismatch(expected: u64, actual: u64) -> Self {
        Self::LengthMismatch { expected, actual }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::CorruptedData {
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create a buffer too small error.
    pub fn buffer_too_small(needed: usize, available: usize) -> Self {
        Self::BufferTooSmall { needed, available }
    }
}
