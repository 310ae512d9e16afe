use crate::error::Result;

/// Seam to the external block-compression primitive.
///
/// A `BlockCompressor`:
/// - Is created once per session and owned exclusively by it; whatever working
///   state it keeps is reused for every block and never shared.
/// - Compresses each block independently. No history crosses a block
///   boundary, which is what makes the frame's blocks independently decodable.
/// - Never writes past the end of `dest`. When the compressed form would not
///   fit it returns [`FrameError::DestinationTooSmall`], which the block codec
///   answers by storing the block raw.
///
/// [`FrameError::DestinationTooSmall`]: crate::FrameError::DestinationTooSmall
pub trait BlockCompressor: Send {
    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;

    /// Worst-case compressed size of `len` input bytes.
    fn compress_bound(&self, len: usize) -> usize;

    /// Compress `src` into `dest`, returning the compressed length.
    ///
    /// Implementations should reuse state held in `self` instead of allocating
    /// per call. Backends whose library manages that state itself may not be
    /// able to: the `lz4` crate's HC path allocates inside liblz4 on every call.
    fn compress(&mut self, src: &[u8], dest: &mut [u8]) -> Result<usize>;
}

/// Seam to the external block decompressor.
///
/// Stateless: one call decodes one block. Implementations must be bounded by
/// `dest.len()` and fail with [`FrameError::DecompressionFailed`] on malformed,
/// truncated, or overflowing input rather than panic.
///
/// [`FrameError::DecompressionFailed`]: crate::FrameError::DecompressionFailed
pub trait BlockDecompressor: Send + Sync {
    fn decompress(&self, src: &[u8], dest: &mut [u8]) -> Result<usize>;
}

impl<T: BlockCompressor + ?Sized> BlockCompressor for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn compress_bound(&self, len: usize) -> usize {
        (**self).compress_bound(len)
    }

    fn compress(&mut self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        (**self).compress(src, dest)
    }
}

impl<T: BlockDecompressor + ?Sized> BlockDecompressor for &T {
    fn decompress(&self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        (**self).decompress(src, dest)
    }
}
