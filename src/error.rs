/// Errors raised while transcoding between MF and BF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The first header bytes match neither recognized magic.
    /// `magic` holds the bytes read so far (zero-filled), `consumed` how
    /// many stream bytes were taken including the offending one.
    #[error("invalid magic 0x{:02x}{:02x}{:02x}{:02x} after {} byte(s)", .magic[0], .magic[1], .magic[2], .magic[3], .consumed)]
    InvalidMagic { magic: [u8; 4], consumed: usize },

    /// A jump marker without a partner. `offset` is the byte offset of the
    /// unmatched marker inside the MF buffer.
    #[error("unbalanced brackets at byte offset {offset}")]
    UnbalancedBrackets { offset: usize },

    /// A jump target past 2^32-1; the marker sits at `offset`.
    #[error("jump address overflows 32 bits at byte offset {offset}")]
    AddressOverflow { offset: usize },

    /// Memory size outside `1..2^32`.
    #[error("invalid memory size {0}")]
    InvalidMemorySize(u64),

    /// A header slice shorter than 8 bytes.
    #[error("truncated header: {len} byte(s)")]
    TruncatedHeader { len: usize },
}

pub type Result<T> = core::result::Result<T, Error>;
