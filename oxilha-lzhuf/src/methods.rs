//! Compression method parameters.
//!
//! The "new-style" LHA methods share one decoder parametrized by window
//! size and by the width of the offset-table count field. Stored members
//! (`-lh0-`, `-lhd-`) bypass this module entirely.

use std::fmt;

/// An LHA compression method handled by the LH-new decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzhMethod {
    /// lh4: 4 KB window.
    Lh4,
    /// lh5: 8 KB window (the common case).
    Lh5,
    /// lh6: 32 KB window.
    Lh6,
    /// lh7: 64 KB window.
    Lh7,
}

impl LzhMethod {
    /// Parse a method from its 5-byte tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "-lh4-" => Some(Self::Lh4),
            "-lh5-" => Some(Self::Lh5),
            "-lh6-" => Some(Self::Lh6),
            "-lh7-" => Some(Self::Lh7),
            _ => None,
        }
    }

    /// The method tag as it appears in archive headers.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Lh4 => "-lh4-",
            Self::Lh5 => "-lh5-",
            Self::Lh6 => "-lh6-",
            Self::Lh7 => "-lh7-",
        }
    }

    /// Number of bits in a window position.
    pub fn history_bits(&self) -> u8 {
        match self {
            Self::Lh4 => 12,
            Self::Lh5 => 13,
            Self::Lh6 => 15,
            Self::Lh7 => 16,
        }
    }

    /// Width of the offset-table count field in the block header.
    pub fn offset_bits(&self) -> u8 {
        match self {
            Self::Lh4 | Self::Lh5 => 4,
            Self::Lh6 | Self::Lh7 => 5,
        }
    }

    /// Sliding window size in bytes.
    pub fn window_size(&self) -> usize {
        1 << self.history_bits()
    }
}

impl fmt::Display for LzhMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}
