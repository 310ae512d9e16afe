use thiserror::Error;

/// Everything that can go wrong while framing or unframing a stream.
///
/// Every failure is returned to the caller; nothing is retried internally.
/// After a checksum or decode failure any bytes already written to the
/// caller's destination buffer are indeterminate.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The 7 header bytes are not one of the 16 catalogued descriptors.
    #[error("invalid frame descriptor")]
    InvalidDescriptor,

    #[error("block checksum mismatch: stored {expected:08x}, computed {actual:08x}")]
    BlockChecksumMismatch { expected: u32, actual: u32 },

    #[error("content checksum mismatch: stored {expected:08x}, computed {actual:08x}")]
    ContentChecksumMismatch { expected: u32, actual: u32 },

    /// The block decompressor rejected the payload as malformed, truncated,
    /// or larger than the destination.
    #[error("block decompression failed: {0}")]
    DecompressionFailed(String),

    /// Output would not fit in the supplied destination. Compressors report
    /// this when the compressed form exceeds the capacity they were given;
    /// the block codec then stores the block raw.
    #[error("destination too small: need {needed} bytes, have {available}")]
    DestinationTooSmall { needed: usize, available: usize },

    #[error("block of {len} bytes exceeds the frame block size {block_size}")]
    BlockTooLarge { len: usize, block_size: usize },

    #[error("truncated input: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// A zero length field was handed to the block decoder.
    #[error("end mark where a block was expected")]
    UnexpectedEndMark,

    /// The session already wrote or consumed its terminator.
    #[error("session already finished")]
    SessionFinished,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
